//! services/api/src/web/content_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! processing one content submission: fan out the generation calls, gather
//! the halves, assemble the aggregate, and persist it into history.

use crate::web::state::AppState;
use coursewise_core::{
    domain::{
        CourseContent, Difficulty, HistoryItem, Language, QuestionBank, Summary, SummaryStyle,
        DEFAULT_QUESTION_COUNT,
    },
    ports::{PortError, PortResult},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Represents the outcome of a `process_content` run.
/// This tells the caller what action to take next.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The submission was processed and persisted.
    Completed(HistoryItem),
    /// A newer submission superseded this one; its result was discarded.
    Superseded,
}

/// The main asynchronous task for processing one content submission.
///
/// The three summary styles are launched concurrently and joined as one
/// group; the three quiz difficulties form a second, independent group. One
/// group failing does not discard the other's result: the aggregate carries
/// whichever half succeeded, and an error is returned only when nothing
/// usable was produced.
pub async fn process_content(
    app_state: Arc<AppState>,
    raw_text: String,
    generate_quiz: bool,
    language: Language,
    course_id: Option<Uuid>,
) -> PortResult<ProcessOutcome> {
    let start_time = Instant::now();
    let ticket = app_state.generations.begin();
    info!("Content processing started (generation {}).", ticket.id);

    let summaries_fut = async {
        let calls = SummaryStyle::ALL.map(|style| {
            let service = app_state.summary_service.clone();
            let raw_text = raw_text.clone();
            async move { service.generate_summary(&raw_text, style, language).await }
        });
        futures::future::try_join_all(calls).await
    };

    let questions_fut = async {
        if !generate_quiz {
            return Ok(None);
        }
        let calls = Difficulty::ALL.map(|difficulty| {
            let service = app_state.quiz_service.clone();
            let raw_text = raw_text.clone();
            async move {
                service
                    .generate_questions(&raw_text, difficulty, DEFAULT_QUESTION_COUNT, language)
                    .await
            }
        });
        futures::future::try_join_all(calls).await.map(Some)
    };

    // Both groups run concurrently; a superseding submission aborts the wait.
    let (summaries_result, questions_result) = tokio::select! {
        results = async { tokio::join!(summaries_fut, questions_fut) } => results,
        _ = ticket.cancelled.cancelled() => {
            info!("Generation {} cancelled by a newer submission.", ticket.id);
            return Ok(ProcessOutcome::Superseded);
        }
    };

    let all_styles: HashMap<SummaryStyle, String> = match summaries_result {
        Ok(summaries) => summaries.into_iter().map(|s| (s.style, s.content)).collect(),
        Err(ref e) => {
            warn!("Summary generation failed for generation {}: {}", ticket.id, e);
            HashMap::new()
        }
    };

    let questions: Option<QuestionBank> = match questions_result {
        Ok(Some(banks)) => {
            let mut bank = QuestionBank::default();
            for (difficulty, generated) in Difficulty::ALL.into_iter().zip(banks) {
                match difficulty {
                    Difficulty::Easy => bank.easy = generated,
                    Difficulty::Medium => bank.medium = generated,
                    Difficulty::Hard => bank.hard = generated,
                }
            }
            Some(bank)
        }
        Ok(None) => None,
        Err(ref e) => {
            warn!("Quiz generation failed for generation {}: {}", ticket.id, e);
            None
        }
    };

    // Nothing usable came back from either half.
    if all_styles.is_empty() && questions.is_none() {
        return Err(PortError::Unexpected(
            "Generation failed: no summaries or questions were produced.".to_string(),
        ));
    }

    let summary = all_styles.get(&SummaryStyle::Casual).map(|text| Summary {
        content: text.clone(),
        style: SummaryStyle::Casual,
        language,
    });
    let content = CourseContent {
        raw_content: raw_text,
        summary,
        all_styles,
        questions,
        language,
    };

    // A late result must not clobber state written by a newer submission.
    if !app_state.generations.is_current(ticket.id) {
        info!("Generation {} finished stale; discarding result.", ticket.id);
        return Ok(ProcessOutcome::Superseded);
    }

    let item = app_state
        .history
        .upsert_by_content(HistoryItem::from_content(&content, course_id))
        .await?;

    info!(
        "Content processing for generation {} took {:?}.",
        ticket.id,
        start_time.elapsed()
    );
    Ok(ProcessOutcome::Completed(item))
}

/// Returns the summary text for one style of a stored history item, along
/// with whether it was served from the style cache. A cache hit issues no
/// remote call; a miss issues exactly one and caches the result additively.
pub async fn generate_style(
    app_state: Arc<AppState>,
    item_id: Uuid,
    style: SummaryStyle,
) -> PortResult<(String, bool)> {
    let item = app_state.history.get(item_id).await?;

    if let Some(cached) = item.summaries.get(&style) {
        return Ok((cached.clone(), true));
    }

    let language = item.language.unwrap_or(Language::English);
    let summary = app_state
        .summary_service
        .generate_summary(&item.raw_content, style, language)
        .await?;
    app_state
        .history
        .add_summary(item_id, style, &summary.content)
        .await?;

    Ok((summary.content, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FileStoreAdapter;
    use crate::config::Config;
    use crate::web::state::GenerationRegistry;
    use async_trait::async_trait;
    use coursewise_core::domain::Question;
    use coursewise_core::ports::{QuizGenerationService, SummaryGenerationService};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    /// A summary service that counts its calls and can be slowed down.
    struct FakeSummaryService {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    impl FakeSummaryService {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl SummaryGenerationService for FakeSummaryService {
        async fn generate_summary(
            &self,
            _content: &str,
            style: SummaryStyle,
            language: Language,
        ) -> PortResult<Summary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(PortError::Unexpected("summary backend down".to_string()));
            }
            Ok(Summary {
                content: format!("{} summary", style),
                style,
                language,
            })
        }
    }

    /// A quiz service that can fail with a validation error.
    struct FakeQuizService {
        fail: bool,
    }

    #[async_trait]
    impl QuizGenerationService for FakeQuizService {
        async fn generate_questions(
            &self,
            _content: &str,
            difficulty: Difficulty,
            count: usize,
            _language: Language,
        ) -> PortResult<Vec<Question>> {
            if self.fail {
                return Err(PortError::InvalidResponse(
                    "response contains no JSON array".to_string(),
                ));
            }
            Ok((0..count as u32)
                .map(|i| Question {
                    id: i + 1,
                    text: format!("{} question {}", difficulty, i + 1),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer: 0,
                    difficulty,
                    explanation: None,
                })
                .collect())
        }

        async fn evaluate_answer(
            &self,
            _question: &Question,
            _selected_option: usize,
            _language: Language,
        ) -> PortResult<String> {
            Ok("because the other option is right".to_string())
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            data_dir: "./unused".into(),
            log_level: tracing::Level::INFO,
            openai_api_key: None,
            summary_model: "test".to_string(),
            quiz_model: "test".to_string(),
            client_origin: "http://localhost:5173".to_string(),
        })
    }

    async fn app_state(
        dir: &TempDir,
        summary: FakeSummaryService,
        quiz: FakeQuizService,
    ) -> Arc<AppState> {
        let store = Arc::new(FileStoreAdapter::new(dir.path()));
        store.init().await.unwrap();
        Arc::new(AppState {
            config: test_config(),
            history: store.clone(),
            mistakes: store.clone(),
            profile: store.clone(),
            settings: store,
            summary_service: Arc::new(summary),
            quiz_service: Arc::new(quiz),
            quiz_sessions: Mutex::new(HashMap::new()),
            generations: GenerationRegistry::default(),
        })
    }

    #[tokio::test]
    async fn summary_only_submission_persists_one_item_without_questions() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir, FakeSummaryService::new(), FakeQuizService { fail: false })
            .await;

        let outcome = process_content(
            state.clone(),
            "Hello world course notes".to_string(),
            false,
            Language::Chinese,
            None,
        )
        .await
        .unwrap();

        let item = match outcome {
            ProcessOutcome::Completed(item) => item,
            other => panic!("expected Completed, got {:?}", other),
        };
        assert_eq!(item.title, "Hello world course notes");
        assert!(item.questions.is_none());
        assert_eq!(item.summaries.len(), 3);
        assert_eq!(state.history.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quiz_submission_fills_all_three_difficulties() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir, FakeSummaryService::new(), FakeQuizService { fail: false })
            .await;

        let outcome = process_content(
            state,
            "notes".to_string(),
            true,
            Language::English,
            None,
        )
        .await
        .unwrap();

        let item = match outcome {
            ProcessOutcome::Completed(item) => item,
            other => panic!("expected Completed, got {:?}", other),
        };
        let bank = item.questions.unwrap();
        assert_eq!(bank.easy.len(), DEFAULT_QUESTION_COUNT);
        assert_eq!(bank.medium.len(), DEFAULT_QUESTION_COUNT);
        assert_eq!(bank.hard.len(), DEFAULT_QUESTION_COUNT);
    }

    #[tokio::test]
    async fn failed_quiz_half_still_yields_summaries() {
        let dir = TempDir::new().unwrap();
        let state = app_state(&dir, FakeSummaryService::new(), FakeQuizService { fail: true })
            .await;

        let outcome = process_content(
            state,
            "notes".to_string(),
            true,
            Language::English,
            None,
        )
        .await
        .unwrap();

        let item = match outcome {
            ProcessOutcome::Completed(item) => item,
            other => panic!("expected Completed, got {:?}", other),
        };
        assert!(item.questions.is_none());
        assert_eq!(item.summaries.len(), 3);
    }

    #[tokio::test]
    async fn everything_failing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut summary = FakeSummaryService::new();
        summary.fail = true;
        let state = app_state(&dir, summary, FakeQuizService { fail: true }).await;

        let result = process_content(
            state.clone(),
            "notes".to_string(),
            true,
            Language::English,
            None,
        )
        .await;
        assert!(result.is_err());
        assert!(state.history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn superseded_submission_is_discarded() {
        let dir = TempDir::new().unwrap();
        let mut slow = FakeSummaryService::new();
        slow.delay = Duration::from_millis(100);
        let state = app_state(&dir, slow, FakeQuizService { fail: false }).await;

        let first = tokio::spawn(process_content(
            state.clone(),
            "first submission".to_string(),
            false,
            Language::English,
            None,
        ));
        // Give the first task time to register its generation before
        // superseding it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _second_ticket = state.generations.begin();

        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, ProcessOutcome::Superseded));
        assert!(state.history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cached_style_issues_no_remote_call() {
        let dir = TempDir::new().unwrap();
        let summary_service = FakeSummaryService::new();
        let calls = summary_service.calls.clone();
        let state = app_state(&dir, summary_service, FakeQuizService { fail: false }).await;

        let outcome = process_content(
            state.clone(),
            "notes".to_string(),
            false,
            Language::English,
            None,
        )
        .await
        .unwrap();
        let item = match outcome {
            ProcessOutcome::Completed(item) => item,
            other => panic!("expected Completed, got {:?}", other),
        };

        // All three styles were generated up front, so any style is a cache
        // hit and the call count stays at 3.
        let (text, cached) = generate_style(state.clone(), item.id, SummaryStyle::Academic)
            .await
            .unwrap();
        assert!(cached);
        assert_eq!(text, "academic summary");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Wipe the academic entry to force a miss, then re-request it.
        let mut stored = state.history.get(item.id).await.unwrap();
        stored.summaries.remove(&SummaryStyle::Academic);
        state.history.upsert_by_content(stored).await.unwrap();

        let (_, cached) = generate_style(state.clone(), item.id, SummaryStyle::Academic)
            .await
            .unwrap();
        assert!(!cached);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        // Now cached again: repeated requests issue no further calls.
        let (_, cached) = generate_style(state.clone(), item.id, SummaryStyle::Academic)
            .await
            .unwrap();
        assert!(cached);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
