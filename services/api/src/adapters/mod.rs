pub mod llm;
pub mod quiz_llm;
pub mod store;
pub mod summary_llm;

pub use llm::LlmContext;
pub use quiz_llm::OpenAiQuizAdapter;
pub use store::FileStoreAdapter;
pub use summary_llm::OpenAiSummaryAdapter;
