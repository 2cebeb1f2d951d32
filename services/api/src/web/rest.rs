//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::content_task::{self, ProcessOutcome};
use crate::web::dto::*;
use crate::web::state::{ActiveQuiz, AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use coursewise_core::domain::{
    Course, Difficulty, Language, SummaryStyle, ICON_MAX_BYTES,
};
use coursewise_core::ports::PortError;
use coursewise_core::quiz::QuizSession;
use coursewise_core::views;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::error;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        process_content_handler,
        generate_style_handler,
        list_history_handler,
        get_history_handler,
        delete_history_handler,
        start_quiz_handler,
        end_quiz_handler,
        get_quiz_state_handler,
        select_option_handler,
        submit_answer_handler,
        next_question_handler,
        prev_question_handler,
        evaluate_answer_handler,
        list_mistakes_handler,
        remove_mistake_handler,
        get_profile_handler,
        update_profile_handler,
        create_course_handler,
        delete_course_handler,
        get_settings_handler,
        update_settings_handler,
    ),
    components(
        schemas(
            ProcessContentRequest, StyleRequest, StyleResponse, HistoryItemDto,
            QuestionBankDto, QuestionDto, UserAnswerDto, ItemCountsDto,
            StartQuizRequest, SelectOptionRequest, QuizStateDto,
            SubmitAnswerResponse, EvaluationResponse, MistakesResponse,
            DifficultyCountDto, ProfileDto, QuizStatsDto, CourseDto,
            UpdateProfileRequest, CreateCourseRequest, SettingsDto,
            UpdateSettingsRequest,
        )
    ),
    tags(
        (name = "Coursewise API", description = "API endpoints for course-note summarization and quiz practice.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

type RestError = (StatusCode, String);

/// Maps a port error onto an HTTP status, logging server-side faults.
fn port_error(e: PortError) -> RestError {
    match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        PortError::MissingCredential => (StatusCode::BAD_REQUEST, e.to_string()),
        PortError::InvalidResponse(_) => {
            error!("Upstream generation produced an invalid response: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
        PortError::Unexpected(_) => {
            error!("Unexpected port error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn bad_request(message: impl Into<String>) -> RestError {
    (StatusCode::BAD_REQUEST, message.into())
}

//=========================================================================================
// Content Processing Handlers
//=========================================================================================

/// Process one content submission: generate summaries (and optionally
/// quizzes) and persist the result into history.
#[utoipa::path(
    post,
    path = "/content",
    request_body = ProcessContentRequest,
    responses(
        (status = 201, description = "Content processed and stored", body = HistoryItemDto),
        (status = 400, description = "Empty content or invalid parameters"),
        (status = 409, description = "Superseded by a newer submission"),
        (status = 502, description = "Generation produced an invalid response")
    )
)]
pub async fn process_content_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ProcessContentRequest>,
) -> Result<impl IntoResponse, RestError> {
    if request.text.trim().is_empty() {
        return Err(bad_request("Content must not be empty"));
    }
    let language = Language::from_str(&request.language).map_err(bad_request)?;

    // File the item under the default course when none was chosen.
    let course_id = match request.course_id {
        Some(id) => Some(id),
        None => Some(
            app_state
                .profile
                .ensure_default_course()
                .await
                .map_err(port_error)?
                .id,
        ),
    };

    let outcome = content_task::process_content(
        app_state,
        request.text,
        request.generate_quiz,
        language,
        course_id,
    )
    .await
    .map_err(port_error)?;

    match outcome {
        ProcessOutcome::Completed(item) => {
            Ok((StatusCode::CREATED, Json(HistoryItemDto::from_domain(&item))))
        }
        ProcessOutcome::Superseded => Err((
            StatusCode::CONFLICT,
            "Superseded by a newer submission".to_string(),
        )),
    }
}

/// Fetch one summary style for a stored item, generating it on a cache miss.
#[utoipa::path(
    post,
    path = "/history/{id}/style",
    request_body = StyleRequest,
    responses(
        (status = 200, description = "Summary text for the style", body = StyleResponse),
        (status = 404, description = "History item not found")
    ),
    params(("id" = Uuid, Path, description = "History item id"))
)]
pub async fn generate_style_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<StyleRequest>,
) -> Result<Json<StyleResponse>, RestError> {
    let style = SummaryStyle::from_str(&request.style).map_err(bad_request)?;
    let (content, cached) = content_task::generate_style(app_state, id, style)
        .await
        .map_err(port_error)?;
    Ok(Json(StyleResponse {
        style: style.to_string(),
        content,
        cached,
    }))
}

//=========================================================================================
// History Handlers
//=========================================================================================

#[derive(Deserialize, utoipa::IntoParams)]
pub struct HistoryQuery {
    /// Restrict to one course.
    pub course_id: Option<Uuid>,
    /// Restrict to items created in the last 7 days.
    pub recent: Option<bool>,
    /// Free-text search over titles and question text.
    pub q: Option<String>,
}

/// List history items, newest first, with optional filters.
#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    responses((status = 200, description = "Matching history items", body = [HistoryItemDto]))
)]
pub async fn list_history_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryItemDto>>, RestError> {
    let mut items = app_state.history.list().await.map_err(port_error)?;

    if let Some(course_id) = query.course_id {
        items = views::filter_by_course(&items, Some(course_id))
            .into_iter()
            .cloned()
            .collect();
    }
    if query.recent.unwrap_or(false) {
        items = views::filter_recent(&items, chrono::Utc::now())
            .into_iter()
            .cloned()
            .collect();
    }
    if let Some(q) = query.q.as_deref() {
        items = views::search(&items, q).into_iter().cloned().collect();
    }

    Ok(Json(items.iter().map(HistoryItemDto::from_domain).collect()))
}

/// Fetch one history item.
#[utoipa::path(
    get,
    path = "/history/{id}",
    responses(
        (status = 200, description = "The history item", body = HistoryItemDto),
        (status = 404, description = "History item not found")
    ),
    params(("id" = Uuid, Path, description = "History item id"))
)]
pub async fn get_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryItemDto>, RestError> {
    let item = app_state.history.get(id).await.map_err(port_error)?;
    Ok(Json(HistoryItemDto::from_domain(&item)))
}

/// Delete one history item.
#[utoipa::path(
    delete,
    path = "/history/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "History item not found")
    ),
    params(("id" = Uuid, Path, description = "History item id"))
)]
pub async fn delete_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RestError> {
    app_state.history.delete(id).await.map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Quiz Session Handlers
//=========================================================================================

/// Start a quiz session over a stored item's questions, seeded with any
/// previously recorded answers.
#[utoipa::path(
    post,
    path = "/quiz/sessions",
    request_body = StartQuizRequest,
    responses(
        (status = 201, description = "Session started", body = QuizStateDto),
        (status = 400, description = "Item has no questions for the request"),
        (status = 404, description = "History item not found")
    )
)]
pub async fn start_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, RestError> {
    let item = app_state
        .history
        .get(request.history_item_id)
        .await
        .map_err(port_error)?;
    let bank = item
        .questions
        .as_ref()
        .ok_or_else(|| bad_request("History item has no generated questions"))?;

    let questions = match request.difficulty.as_deref() {
        Some(raw) => {
            let difficulty = Difficulty::from_str(raw).map_err(bad_request)?;
            bank.for_difficulty(difficulty).to_vec()
        }
        None => bank.all(),
    };

    // Seed only answers that belong to this question set.
    let question_ids: Vec<u32> = questions.iter().map(|q| q.id).collect();
    let seeds = item
        .user_answers
        .iter()
        .filter(|a| question_ids.contains(&a.question_id))
        .cloned()
        .collect();

    let session = QuizSession::new(questions, item.course_id, seeds)
        .map_err(|e| bad_request(e.to_string()))?;
    let language = item.language.unwrap_or(Language::English);

    let session_id = Uuid::new_v4();
    let state_dto = QuizStateDto::from_session(session_id, &session);
    let mut sessions = app_state.quiz_sessions.lock().await;
    // At most one live session per history item; restarting replaces it.
    sessions.retain(|_, active| active.history_item_id != item.id);
    sessions.insert(
        session_id,
        ActiveQuiz {
            session,
            history_item_id: item.id,
            language,
        },
    );
    Ok((StatusCode::CREATED, Json(state_dto)))
}

/// End a quiz session, releasing its registry entry. Recorded answers are
/// already persisted on the history item and survive this.
#[utoipa::path(
    delete,
    path = "/quiz/sessions/{id}",
    responses(
        (status = 204, description = "Session ended"),
        (status = 404, description = "Session not found")
    ),
    params(("id" = Uuid, Path, description = "Quiz session id"))
)]
pub async fn end_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RestError> {
    app_state
        .quiz_sessions
        .lock()
        .await
        .remove(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("quiz session {}", id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch the current state of a quiz session.
#[utoipa::path(
    get,
    path = "/quiz/sessions/{id}",
    responses(
        (status = 200, description = "Current session state", body = QuizStateDto),
        (status = 404, description = "Session not found")
    ),
    params(("id" = Uuid, Path, description = "Quiz session id"))
)]
pub async fn get_quiz_state_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizStateDto>, RestError> {
    let sessions = app_state.quiz_sessions.lock().await;
    let active = sessions
        .get(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("quiz session {}", id)))?;
    Ok(Json(QuizStateDto::from_session(id, &active.session)))
}

/// Select an option on the current question.
#[utoipa::path(
    post,
    path = "/quiz/sessions/{id}/select",
    request_body = SelectOptionRequest,
    responses(
        (status = 200, description = "Updated session state", body = QuizStateDto),
        (status = 400, description = "Invalid transition"),
        (status = 404, description = "Session not found")
    ),
    params(("id" = Uuid, Path, description = "Quiz session id"))
)]
pub async fn select_option_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectOptionRequest>,
) -> Result<Json<QuizStateDto>, RestError> {
    let mut sessions = app_state.quiz_sessions.lock().await;
    let active = sessions
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("quiz session {}", id)))?;
    active
        .session
        .select_option(request.option_index)
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(QuizStateDto::from_session(id, &active.session)))
}

/// Submit the pending selection. A wrong answer is upserted into the
/// mistake collection; the answer is recorded on the history item and the
/// profile's aggregate stats are recomputed from the full history.
#[utoipa::path(
    post,
    path = "/quiz/sessions/{id}/submit",
    responses(
        (status = 200, description = "The recorded answer", body = SubmitAnswerResponse),
        (status = 400, description = "No pending selection, or already answered"),
        (status = 404, description = "Session not found")
    ),
    params(("id" = Uuid, Path, description = "Quiz session id"))
)]
pub async fn submit_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmitAnswerResponse>, RestError> {
    let (submission, history_item_id) = {
        let mut sessions = app_state.quiz_sessions.lock().await;
        let active = sessions
            .get_mut(&id)
            .ok_or((StatusCode::NOT_FOUND, format!("quiz session {}", id)))?;
        let submission = active
            .session
            .submit_answer()
            .map_err(|e| bad_request(e.to_string()))?;
        (submission, active.history_item_id)
    };

    if submission.record_mistake {
        app_state
            .mistakes
            .upsert(submission.answer.clone())
            .await
            .map_err(port_error)?;
    }
    app_state
        .history
        .record_answer(history_item_id, submission.answer.clone())
        .await
        .map_err(port_error)?;

    // Full-history recomputation keeps the profile stats consistent with
    // whatever answers survive in history.
    let history = app_state.history.list().await.map_err(port_error)?;
    let mut profile = app_state.profile.load().await.map_err(port_error)?;
    profile.quiz_stats = views::recompute_quiz_stats(&history);
    app_state
        .profile
        .save(profile)
        .await
        .map_err(port_error)?;

    Ok(Json(SubmitAnswerResponse {
        answer: UserAnswerDto::from_domain(&submission.answer),
        recorded_mistake: submission.record_mistake,
    }))
}

/// Move to the next question (a no-op on the last question).
#[utoipa::path(
    post,
    path = "/quiz/sessions/{id}/next",
    responses(
        (status = 200, description = "Updated session state", body = QuizStateDto),
        (status = 404, description = "Session not found")
    ),
    params(("id" = Uuid, Path, description = "Quiz session id"))
)]
pub async fn next_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizStateDto>, RestError> {
    let mut sessions = app_state.quiz_sessions.lock().await;
    let active = sessions
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("quiz session {}", id)))?;
    active.session.next_question();
    Ok(Json(QuizStateDto::from_session(id, &active.session)))
}

/// Move to the previous question (a no-op on the first question).
#[utoipa::path(
    post,
    path = "/quiz/sessions/{id}/prev",
    responses(
        (status = 200, description = "Updated session state", body = QuizStateDto),
        (status = 404, description = "Session not found")
    ),
    params(("id" = Uuid, Path, description = "Quiz session id"))
)]
pub async fn prev_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizStateDto>, RestError> {
    let mut sessions = app_state.quiz_sessions.lock().await;
    let active = sessions
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, format!("quiz session {}", id)))?;
    active.session.prev_question();
    Ok(Json(QuizStateDto::from_session(id, &active.session)))
}

/// Ask the model why the submitted answer was wrong. The generated text is
/// for display only; the stored explanation is never replaced.
#[utoipa::path(
    post,
    path = "/quiz/sessions/{id}/evaluation",
    responses(
        (status = 200, description = "Generated explanation", body = EvaluationResponse),
        (status = 400, description = "Current question is not an incorrect answer"),
        (status = 404, description = "Session not found")
    ),
    params(("id" = Uuid, Path, description = "Quiz session id"))
)]
pub async fn evaluate_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationResponse>, RestError> {
    let (question, selected_option, language) = {
        let sessions = app_state.quiz_sessions.lock().await;
        let active = sessions
            .get(&id)
            .ok_or((StatusCode::NOT_FOUND, format!("quiz session {}", id)))?;
        let answer = match active.session.current_answer() {
            Some(a) if !a.is_correct => a,
            _ => {
                return Err(bad_request(
                    "An explanation can only be requested for an incorrect answer",
                ))
            }
        };
        (
            active.session.current_question().clone(),
            answer.selected_option,
            active.language,
        )
    };

    let explanation = app_state
        .quiz_service
        .evaluate_answer(&question, selected_option, language)
        .await
        .map_err(port_error)?;
    Ok(Json(EvaluationResponse { explanation }))
}

//=========================================================================================
// Mistake Handlers
//=========================================================================================

/// List the mistake collection with per-difficulty counts.
#[utoipa::path(
    get,
    path = "/mistakes",
    responses((status = 200, description = "Mistake collection", body = MistakesResponse))
)]
pub async fn list_mistakes_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<MistakesResponse>, RestError> {
    let mistakes = app_state.mistakes.list().await.map_err(port_error)?;
    let counts = views::mistake_counts_by_difficulty(&mistakes)
        .into_iter()
        .map(|(difficulty, count)| DifficultyCountDto {
            difficulty: difficulty.to_string(),
            count,
        })
        .collect();
    Ok(Json(MistakesResponse {
        mistakes: mistakes.iter().map(UserAnswerDto::from_domain).collect(),
        counts_by_difficulty: counts,
    }))
}

/// Remove one mistake, e.g. after the user re-answers it correctly.
#[utoipa::path(
    delete,
    path = "/mistakes/{question_id}",
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "No mistake for that question")
    ),
    params(("question_id" = u32, Path, description = "Question id"))
)]
pub async fn remove_mistake_handler(
    State(app_state): State<Arc<AppState>>,
    Path(question_id): Path<u32>,
) -> Result<StatusCode, RestError> {
    app_state
        .mistakes
        .remove(question_id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Profile and Course Handlers
//=========================================================================================

/// Fetch the user profile with derived accuracy.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "The user profile", body = ProfileDto))
)]
pub async fn get_profile_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ProfileDto>, RestError> {
    let profile = app_state.profile.load().await.map_err(port_error)?;
    Ok(Json(ProfileDto::from_domain(&profile)))
}

/// Update the profile's user-editable fields.
#[utoipa::path(
    put,
    path = "/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated profile", body = ProfileDto))
)]
pub async fn update_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileDto>, RestError> {
    let mut profile = app_state.profile.load().await.map_err(port_error)?;
    if let Some(username) = request.username {
        if username.trim().is_empty() {
            return Err(bad_request("Username must not be empty"));
        }
        profile.username = username;
    }
    if let Some(email) = request.email {
        profile.email = if email.trim().is_empty() { None } else { Some(email) };
    }
    app_state
        .profile
        .save(profile.clone())
        .await
        .map_err(port_error)?;
    Ok(Json(ProfileDto::from_domain(&profile)))
}

/// Create a course.
#[utoipa::path(
    post,
    path = "/profile/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Created course", body = CourseDto),
        (status = 400, description = "Invalid name or oversized icon")
    )
)]
pub async fn create_course_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, RestError> {
    if request.name.trim().is_empty() {
        return Err(bad_request("Course name must not be empty"));
    }
    if let Some(icon) = &request.icon {
        if icon.len() > ICON_MAX_BYTES {
            return Err(bad_request("Course icon exceeds the 500KB limit"));
        }
    }

    let course = Course {
        id: Uuid::new_v4(),
        name: request.name,
        description: request.description,
        icon: request.icon,
        color: request.color.unwrap_or_else(|| "blue".to_string()),
        created_at: chrono::Utc::now(),
    };

    let mut profile = app_state.profile.load().await.map_err(port_error)?;
    profile.courses.push(course.clone());
    app_state
        .profile
        .save(profile)
        .await
        .map_err(port_error)?;
    Ok((StatusCode::CREATED, Json(CourseDto::from_domain(&course))))
}

/// Delete a course. The reserved default course cannot be deleted.
#[utoipa::path(
    delete,
    path = "/profile/courses/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "The default course cannot be deleted"),
        (status = 404, description = "Course not found")
    ),
    params(("id" = Uuid, Path, description = "Course id"))
)]
pub async fn delete_course_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RestError> {
    if id == Course::default_course().id {
        return Err(bad_request("The default course cannot be deleted"));
    }
    let mut profile = app_state.profile.load().await.map_err(port_error)?;
    let before = profile.courses.len();
    profile.courses.retain(|c| c.id != id);
    if profile.courses.len() == before {
        return Err((StatusCode::NOT_FOUND, format!("course {}", id)));
    }
    app_state
        .profile
        .save(profile)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Settings Handlers
//=========================================================================================

/// Fetch the generation settings (the credential is reported, never echoed).
#[utoipa::path(
    get,
    path = "/settings",
    responses((status = 200, description = "Current settings", body = SettingsDto))
)]
pub async fn get_settings_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SettingsDto>, RestError> {
    let settings = app_state.settings.load().await.map_err(port_error)?;
    Ok(Json(SettingsDto::from_domain(&settings)))
}

/// Update credential, model choice, and prompt template overrides.
#[utoipa::path(
    put,
    path = "/settings",
    request_body = UpdateSettingsRequest,
    responses((status = 200, description = "Updated settings", body = SettingsDto))
)]
pub async fn update_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsDto>, RestError> {
    let mut settings = app_state.settings.load().await.map_err(port_error)?;
    if let Some(api_key) = request.api_key {
        settings.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
    }
    if let Some(model) = request.model {
        settings.model = if model.trim().is_empty() { None } else { Some(model) };
    }
    if let Some(overrides) = request.prompt_overrides {
        settings.prompt_overrides = overrides;
    }
    app_state
        .settings
        .save(settings.clone())
        .await
        .map_err(port_error)?;
    Ok(Json(SettingsDto::from_domain(&settings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FileStoreAdapter;
    use crate::config::Config;
    use crate::web::state::GenerationRegistry;
    use async_trait::async_trait;
    use coursewise_core::domain::{
        CourseContent, HistoryItem, Question, QuestionBank, Summary,
    };
    use coursewise_core::ports::{
        PortResult, QuizGenerationService, SummaryGenerationService,
    };
    use std::collections::HashMap;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    struct NoopSummaryService;

    #[async_trait]
    impl SummaryGenerationService for NoopSummaryService {
        async fn generate_summary(
            &self,
            _content: &str,
            _style: SummaryStyle,
            _language: Language,
        ) -> PortResult<Summary> {
            Err(PortError::Unexpected("not wired in this test".to_string()))
        }
    }

    struct NoopQuizService;

    #[async_trait]
    impl QuizGenerationService for NoopQuizService {
        async fn generate_questions(
            &self,
            _content: &str,
            _difficulty: Difficulty,
            _count: usize,
            _language: Language,
        ) -> PortResult<Vec<Question>> {
            Err(PortError::Unexpected("not wired in this test".to_string()))
        }

        async fn evaluate_answer(
            &self,
            _question: &Question,
            _selected_option: usize,
            _language: Language,
        ) -> PortResult<String> {
            Err(PortError::Unexpected("not wired in this test".to_string()))
        }
    }

    async fn app_state(dir: &TempDir) -> Arc<AppState> {
        let store = Arc::new(FileStoreAdapter::new(dir.path()));
        store.init().await.unwrap();
        Arc::new(AppState {
            config: Arc::new(Config {
                bind_address: "127.0.0.1:0".parse().unwrap(),
                data_dir: "./unused".into(),
                log_level: tracing::Level::INFO,
                openai_api_key: None,
                summary_model: "test".to_string(),
                quiz_model: "test".to_string(),
                client_origin: "http://localhost:5173".to_string(),
            }),
            history: store.clone(),
            mistakes: store.clone(),
            profile: store.clone(),
            settings: store,
            summary_service: Arc::new(NoopSummaryService),
            quiz_service: Arc::new(NoopQuizService),
            quiz_sessions: Mutex::new(HashMap::new()),
            generations: GenerationRegistry::default(),
        })
    }

    fn question(id: u32) -> Question {
        Question {
            id,
            text: format!("q{}", id),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 0,
            difficulty: Difficulty::Easy,
            explanation: None,
        }
    }

    async fn seed_item_with_questions(state: &Arc<AppState>) -> HistoryItem {
        let content = CourseContent {
            raw_content: "notes with a quiz".to_string(),
            summary: None,
            all_styles: HashMap::new(),
            questions: Some(QuestionBank {
                easy: vec![question(1), question(2)],
                ..Default::default()
            }),
            language: Language::English,
        };
        state
            .history
            .upsert_by_content(HistoryItem::from_content(&content, None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn restarting_a_quiz_replaces_the_items_previous_session() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir).await;
        let item = seed_item_with_questions(&state).await;

        start_quiz_handler(
            State(state.clone()),
            Json(StartQuizRequest {
                history_item_id: item.id,
                difficulty: None,
            }),
        )
        .await
        .unwrap();
        let first_id = *state.quiz_sessions.lock().await.keys().next().unwrap();

        start_quiz_handler(
            State(state.clone()),
            Json(StartQuizRequest {
                history_item_id: item.id,
                difficulty: None,
            }),
        )
        .await
        .unwrap();

        // The registry holds exactly one session per item, not one per start.
        let sessions = state.quiz_sessions.lock().await;
        assert_eq!(sessions.len(), 1);
        assert!(!sessions.contains_key(&first_id));
    }

    #[tokio::test]
    async fn ending_a_session_releases_its_registry_entry() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir).await;
        let item = seed_item_with_questions(&state).await;

        start_quiz_handler(
            State(state.clone()),
            Json(StartQuizRequest {
                history_item_id: item.id,
                difficulty: None,
            }),
        )
        .await
        .unwrap();
        let session_id = *state.quiz_sessions.lock().await.keys().next().unwrap();

        let status = end_quiz_handler(State(state.clone()), Path(session_id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.quiz_sessions.lock().await.is_empty());

        let err = end_quiz_handler(State(state), Path(session_id))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
