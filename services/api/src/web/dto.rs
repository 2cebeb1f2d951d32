//! services/api/src/web/dto.rs
//!
//! Request and response payload structs for the REST API, with conversions
//! from the core domain types. The core stays serialization-free; this is
//! the only place its types meet serde.

use chrono::{DateTime, Utc};
use coursewise_core::domain::{
    Course, HistoryItem, Question, QuestionBank, QuizStats, Settings, UserAnswer, UserProfile,
};
use coursewise_core::quiz::QuizSession;
use coursewise_core::views;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "english".to_string()
}

//=========================================================================================
// Content Processing
//=========================================================================================

/// One content submission.
#[derive(Deserialize, ToSchema)]
pub struct ProcessContentRequest {
    /// The raw pasted or uploaded text.
    pub text: String,
    #[serde(default = "default_true")]
    pub generate_quiz: bool,
    /// One of: chinese, english, spanish, french.
    #[serde(default = "default_language")]
    pub language: String,
    /// Course to file the result under; the default course when omitted.
    pub course_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct StyleRequest {
    /// One of: casual, academic, basic.
    pub style: String,
}

#[derive(Serialize, ToSchema)]
pub struct StyleResponse {
    pub style: String,
    pub content: String,
    /// Whether the text came from the style cache (no remote call).
    pub cached: bool,
}

//=========================================================================================
// History
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct QuestionDto {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub difficulty: String,
    pub explanation: Option<String>,
}

impl QuestionDto {
    pub fn from_domain(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer,
            difficulty: q.difficulty.to_string(),
            explanation: q.explanation.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuestionBankDto {
    pub easy: Vec<QuestionDto>,
    pub medium: Vec<QuestionDto>,
    pub hard: Vec<QuestionDto>,
}

impl QuestionBankDto {
    pub fn from_domain(bank: &QuestionBank) -> Self {
        Self {
            easy: bank.easy.iter().map(QuestionDto::from_domain).collect(),
            medium: bank.medium.iter().map(QuestionDto::from_domain).collect(),
            hard: bank.hard.iter().map(QuestionDto::from_domain).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserAnswerDto {
    pub question_id: u32,
    pub selected_option: usize,
    pub is_correct: bool,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub difficulty: String,
    pub explanation: Option<String>,
    pub answered_at: DateTime<Utc>,
    pub course_id: Option<Uuid>,
}

impl UserAnswerDto {
    pub fn from_domain(a: &UserAnswer) -> Self {
        Self {
            question_id: a.question_id,
            selected_option: a.selected_option,
            is_correct: a.is_correct,
            question_text: a.question_text.clone(),
            options: a.options.clone(),
            correct_answer: a.correct_answer,
            difficulty: a.difficulty.to_string(),
            explanation: a.explanation.clone(),
            answered_at: a.answered_at,
            course_id: a.course_id,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ItemCountsDto {
    pub summaries: usize,
    pub questions: usize,
    pub answered: usize,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryItemDto {
    pub id: Uuid,
    pub title: String,
    pub raw_content: String,
    pub created_at: DateTime<Utc>,
    pub course_id: Option<Uuid>,
    pub language: Option<String>,
    /// style name -> summary markdown.
    pub summaries: HashMap<String, String>,
    pub questions: Option<QuestionBankDto>,
    pub user_answers: Vec<UserAnswerDto>,
    pub counts: ItemCountsDto,
}

impl HistoryItemDto {
    pub fn from_domain(item: &HistoryItem) -> Self {
        let counts = views::item_counts(item);
        Self {
            id: item.id,
            title: item.title.clone(),
            raw_content: item.raw_content.clone(),
            created_at: item.created_at,
            course_id: item.course_id,
            language: item.language.map(|l| l.to_string()),
            summaries: item
                .summaries
                .iter()
                .map(|(style, text)| (style.to_string(), text.clone()))
                .collect(),
            questions: item.questions.as_ref().map(QuestionBankDto::from_domain),
            user_answers: item
                .user_answers
                .iter()
                .map(UserAnswerDto::from_domain)
                .collect(),
            counts: ItemCountsDto {
                summaries: counts.summaries,
                questions: counts.questions,
                answered: counts.answered,
            },
        }
    }
}

//=========================================================================================
// Quiz Sessions
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StartQuizRequest {
    pub history_item_id: Uuid,
    /// Restrict the session to one difficulty; all questions when omitted.
    pub difficulty: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectOptionRequest {
    pub option_index: usize,
}

#[derive(Serialize, ToSchema)]
pub struct QuizStateDto {
    pub session_id: Uuid,
    pub current_index: usize,
    pub total_questions: usize,
    pub question: QuestionDto,
    pub pending_selection: Option<usize>,
    pub explanation_visible: bool,
    /// The recorded answer for the current question, if submitted.
    pub answer: Option<UserAnswerDto>,
    pub answered_count: usize,
}

impl QuizStateDto {
    pub fn from_session(session_id: Uuid, session: &QuizSession) -> Self {
        Self {
            session_id,
            current_index: session.current_index(),
            total_questions: session.len(),
            question: QuestionDto::from_domain(session.current_question()),
            pending_selection: session.pending_selection(),
            explanation_visible: session.explanation_visible(),
            answer: session.current_answer().map(UserAnswerDto::from_domain),
            answered_count: session.answers().len(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub answer: UserAnswerDto,
    pub recorded_mistake: bool,
}

#[derive(Serialize, ToSchema)]
pub struct EvaluationResponse {
    pub explanation: String,
}

//=========================================================================================
// Mistakes
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct DifficultyCountDto {
    pub difficulty: String,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct MistakesResponse {
    pub mistakes: Vec<UserAnswerDto>,
    pub counts_by_difficulty: Vec<DifficultyCountDto>,
}

//=========================================================================================
// Profile and Courses
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct QuizStatsDto {
    pub total_quizzes: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub accuracy_percent: f64,
}

impl QuizStatsDto {
    pub fn from_domain(stats: &QuizStats) -> Self {
        Self {
            total_quizzes: stats.total_quizzes,
            correct_answers: stats.correct_answers,
            total_questions: stats.total_questions,
            accuracy_percent: views::accuracy_percent(stats),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CourseDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl CourseDto {
    pub fn from_domain(course: &Course) -> Self {
        Self {
            id: course.id,
            name: course.name.clone(),
            description: course.description.clone(),
            icon: course.icon.clone(),
            color: course.color.clone(),
            created_at: course.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProfileDto {
    pub username: String,
    pub email: Option<String>,
    pub quiz_stats: QuizStatsDto,
    pub courses: Vec<CourseDto>,
}

impl ProfileDto {
    pub fn from_domain(profile: &UserProfile) -> Self {
        Self {
            username: profile.username.clone(),
            email: profile.email.clone(),
            quiz_stats: QuizStatsDto::from_domain(&profile.quiz_stats),
            courses: profile.courses.iter().map(CourseDto::from_domain).collect(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub name: String,
    pub description: Option<String>,
    /// A data URI; rejected above 500KB.
    pub icon: Option<String>,
    pub color: Option<String>,
}

//=========================================================================================
// Settings
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SettingsDto {
    /// The stored key itself is never echoed back.
    pub has_api_key: bool,
    pub model: Option<String>,
    /// feature -> (style/difficulty or "default") -> template text.
    pub prompt_overrides: HashMap<String, HashMap<String, String>>,
}

impl SettingsDto {
    pub fn from_domain(settings: &Settings) -> Self {
        Self {
            has_api_key: settings
                .api_key
                .as_ref()
                .map(|k| !k.trim().is_empty())
                .unwrap_or(false),
            model: settings.model.clone(),
            prompt_overrides: settings.prompt_overrides.clone(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    /// A new credential; an empty string clears the stored one.
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub prompt_overrides: Option<HashMap<String, HashMap<String, String>>>,
}
