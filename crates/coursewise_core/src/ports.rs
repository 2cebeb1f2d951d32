//! crates/coursewise_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like storage or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Course, Difficulty, HistoryItem, Language, Question, Settings, Summary, SummaryStyle,
    UserAnswer, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("API credential is not configured")]
    MissingCredential,
    /// The remote model produced output that failed shape validation.
    /// Carries the diagnostic detail instead of a generic "generation failed".
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Generation Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait SummaryGenerationService: Send + Sync {
    /// Generates a single summary of `content` in the given style and language.
    async fn generate_summary(
        &self,
        content: &str,
        style: SummaryStyle,
        language: Language,
    ) -> PortResult<Summary>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Generates multiple-choice questions for `content` at one difficulty.
    /// `count` is advisory only; the remote service is asked for exactly this
    /// many but the returned length is whatever validated.
    async fn generate_questions(
        &self,
        content: &str,
        difficulty: Difficulty,
        count: usize,
        language: Language,
    ) -> PortResult<Vec<Question>>;

    /// Explains why the selected option for `question` is wrong.
    async fn evaluate_answer(
        &self,
        question: &Question,
        selected_option: usize,
        language: Language,
    ) -> PortResult<String>;
}

//=========================================================================================
// Repository Ports (Traits)
//=========================================================================================
// Each repository owns serialization, default values, and cap enforcement for
// its collection, so call sites never touch raw stored blobs.

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Returns the full collection, newest first.
    async fn list(&self) -> PortResult<Vec<HistoryItem>>;

    async fn get(&self, id: Uuid) -> PortResult<HistoryItem>;

    /// Inserts `item`, deduplicating by exact `raw_content` match: an existing
    /// entry keeps its id and list position but has its generated artifacts
    /// and timestamp overwritten. New entries go to the front; the collection
    /// is truncated to the history cap, evicting the oldest.
    async fn upsert_by_content(&self, item: HistoryItem) -> PortResult<HistoryItem>;

    /// Records an answer on an item, replacing any prior answer for the same
    /// question id (last write wins).
    async fn record_answer(&self, item_id: Uuid, answer: UserAnswer) -> PortResult<()>;

    /// Adds a generated summary style to an item's style cache.
    async fn add_summary(
        &self,
        item_id: Uuid,
        style: SummaryStyle,
        content: &str,
    ) -> PortResult<()>;

    async fn delete(&self, id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait MistakeRepository: Send + Sync {
    async fn list(&self) -> PortResult<Vec<UserAnswer>>;

    /// Inserts `answer`, replacing any existing entry with the same question
    /// id; otherwise appends. Truncated to the mistake cap, evicting the
    /// oldest entries.
    async fn upsert(&self, answer: UserAnswer) -> PortResult<()>;

    async fn remove(&self, question_id: u32) -> PortResult<()>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Loads the profile, falling back to the default profile when absent.
    async fn load(&self) -> PortResult<UserProfile>;

    async fn save(&self, profile: UserProfile) -> PortResult<()>;

    /// Returns the reserved default course, creating it on first use.
    async fn ensure_default_course(&self) -> PortResult<Course>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self) -> PortResult<Settings>;

    async fn save(&self, settings: Settings) -> PortResult<()>;
}
