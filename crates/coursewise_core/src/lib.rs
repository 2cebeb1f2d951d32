pub mod domain;
pub mod ports;
pub mod quiz;
pub mod views;

pub use domain::{
    Course, CourseContent, Difficulty, HistoryItem, Language, PromptFeature, Question,
    QuestionBank, QuizStats, Settings, Summary, SummaryStyle, UserAnswer, UserProfile,
};
pub use ports::{
    HistoryRepository, MistakeRepository, PortError, PortResult, ProfileRepository,
    QuizGenerationService, SettingsRepository, SummaryGenerationService,
};
pub use quiz::{QuizError, QuizSession, Submission};
