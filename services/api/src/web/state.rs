//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the in-memory quiz session
//! registry.

use crate::config::Config;
use coursewise_core::domain::Language;
use coursewise_core::ports::{
    HistoryRepository, MistakeRepository, ProfileRepository, QuizGenerationService,
    SettingsRepository, SummaryGenerationService,
};
use coursewise_core::quiz::QuizSession;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub history: Arc<dyn HistoryRepository>,
    pub mistakes: Arc<dyn MistakeRepository>,
    pub profile: Arc<dyn ProfileRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub summary_service: Arc<dyn SummaryGenerationService>,
    pub quiz_service: Arc<dyn QuizGenerationService>,
    /// Active quiz sessions, keyed by session id.
    pub quiz_sessions: Mutex<HashMap<Uuid, ActiveQuiz>>,
    pub generations: GenerationRegistry,
}

/// One in-progress quiz, tied to the history item its questions came from.
pub struct ActiveQuiz {
    pub session: QuizSession,
    pub history_item_id: Uuid,
    /// Language of the source content, used for evaluation prompts.
    pub language: Language,
}

//=========================================================================================
// GenerationRegistry (Stale-Result Protection)
//=========================================================================================

/// Issues a monotonically increasing token per content orchestration and
/// tracks which token is current. A completed orchestration whose token is
/// no longer current discards its result instead of clobbering newer state;
/// the cancellation token lets an in-flight orchestration stop early.
#[derive(Default)]
pub struct GenerationRegistry {
    counter: AtomicU64,
    latest: StdMutex<Option<(u64, CancellationToken)>>,
}

/// Handle for one orchestration run.
pub struct GenerationTicket {
    pub id: u64,
    pub cancelled: CancellationToken,
}

impl GenerationRegistry {
    /// Starts a new generation, cancelling whichever one was current.
    pub fn begin(&self) -> GenerationTicket {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let mut latest = self.latest.lock().unwrap();
        if let Some((_, previous)) = latest.replace((id, token.clone())) {
            previous.cancel();
        }
        GenerationTicket {
            id,
            cancelled: token,
        }
    }

    /// Whether `id` is still the latest issued generation.
    pub fn is_current(&self, id: u64) -> bool {
        self.latest
            .lock()
            .unwrap()
            .as_ref()
            .map(|(latest_id, _)| *latest_id == id)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_generation_supersedes_and_cancels_the_older() {
        let registry = GenerationRegistry::default();
        let first = registry.begin();
        assert!(registry.is_current(first.id));

        let second = registry.begin();
        assert!(!registry.is_current(first.id));
        assert!(registry.is_current(second.id));
        assert!(first.cancelled.is_cancelled());
        assert!(!second.cancelled.is_cancelled());
    }
}
