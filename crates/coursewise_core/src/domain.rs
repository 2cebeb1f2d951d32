//! crates/coursewise_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum number of history items retained; oldest entries are evicted first.
pub const HISTORY_CAP: usize = 50;
/// Maximum number of mistakes retained; oldest entries are evicted first.
pub const MISTAKE_CAP: usize = 100;
/// Maximum length (in characters) of a derived history title.
pub const TITLE_MAX_CHARS: usize = 60;
/// Maximum size of a course icon data URI, in bytes.
pub const ICON_MAX_BYTES: usize = 500 * 1024;
/// Every generated question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;
/// How many questions a single generation call asks for by default.
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// Presentation register for generated summary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryStyle {
    Casual,
    Academic,
    Basic,
}

impl SummaryStyle {
    pub const ALL: [SummaryStyle; 3] =
        [SummaryStyle::Casual, SummaryStyle::Academic, SummaryStyle::Basic];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Casual => "casual",
            SummaryStyle::Academic => "academic",
            SummaryStyle::Basic => "basic",
        }
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "casual" => Ok(SummaryStyle::Casual),
            "academic" => Ok(SummaryStyle::Academic),
            "basic" => Ok(SummaryStyle::Basic),
            other => Err(format!("'{}' is not a valid summary style", other)),
        }
    }
}

/// Target natural language for generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Chinese,
    English,
    Spanish,
    French,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Chinese => "chinese",
            Language::English => "english",
            Language::Spanish => "spanish",
            Language::French => "french",
        }
    }

    /// The English name of the language, as used in generation prompts.
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::Chinese => "Simplified Chinese",
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chinese" => Ok(Language::Chinese),
            "english" => Ok(Language::English),
            "spanish" => Ok(Language::Spanish),
            "french" => Ok(Language::French),
            other => Err(format!("'{}' is not a valid language", other)),
        }
    }
}

/// Qualitative difficulty tag passed to the quiz generation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("'{}' is not a valid difficulty", other)),
        }
    }
}

/// A single generated summary, immutable once produced.
#[derive(Debug, Clone)]
pub struct Summary {
    pub content: String,
    pub style: SummaryStyle,
    pub language: Language,
}

/// A single generated multiple-choice question.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: u32,
    pub text: String,
    /// Exactly [`OPTIONS_PER_QUESTION`] entries; validated at the generation boundary.
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
}

/// Generated questions grouped by difficulty.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    pub easy: Vec<Question>,
    pub medium: Vec<Question>,
    pub hard: Vec<Question>,
}

impl QuestionBank {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> &[Question] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    pub fn total(&self) -> usize {
        self.easy.len() + self.medium.len() + self.hard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// All questions in difficulty order (easy, medium, hard).
    pub fn all(&self) -> Vec<Question> {
        let mut out = Vec::with_capacity(self.total());
        out.extend(self.easy.iter().cloned());
        out.extend(self.medium.iter().cloned());
        out.extend(self.hard.iter().cloned());
        out
    }
}

/// One submitted answer, snapshotting the question it was given for so that
/// mistake review still renders after the source content is regenerated.
#[derive(Debug, Clone)]
pub struct UserAnswer {
    pub question_id: u32,
    pub selected_option: usize,
    pub is_correct: bool,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub answered_at: DateTime<Utc>,
    pub course_id: Option<Uuid>,
}

impl UserAnswer {
    /// Builds an answer record; correctness is derived here and nowhere else.
    pub fn new(question: &Question, selected_option: usize, course_id: Option<Uuid>) -> Self {
        Self {
            question_id: question.id,
            selected_option,
            is_correct: selected_option == question.correct_answer,
            question_text: question.text.clone(),
            options: question.options.clone(),
            correct_answer: question.correct_answer,
            difficulty: question.difficulty,
            explanation: question.explanation.clone(),
            answered_at: Utc::now(),
            course_id,
        }
    }
}

/// The session-scoped aggregate produced by one content submission.
/// Replaced wholesale on each new submission.
#[derive(Debug, Clone)]
pub struct CourseContent {
    pub raw_content: String,
    /// The active display summary (conventionally the casual style).
    pub summary: Option<Summary>,
    /// All generated styles, kept for instant style switching.
    pub all_styles: HashMap<SummaryStyle, String>,
    pub questions: Option<QuestionBank>,
    pub language: Language,
}

/// A persisted snapshot of one processed content submission plus its
/// generated artifacts and any recorded answers.
#[derive(Debug, Clone)]
pub struct HistoryItem {
    pub id: Uuid,
    pub raw_content: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub course_id: Option<Uuid>,
    pub summaries: HashMap<SummaryStyle, String>,
    pub questions: Option<QuestionBank>,
    pub user_answers: Vec<UserAnswer>,
    pub language: Option<Language>,
}

impl HistoryItem {
    pub fn from_content(content: &CourseContent, course_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_content: content.raw_content.clone(),
            title: derive_title(&content.raw_content),
            created_at: Utc::now(),
            course_id,
            summaries: content.all_styles.clone(),
            questions: content.questions.clone(),
            user_answers: Vec::new(),
            language: Some(content.language),
        }
    }
}

/// Derives a display title from raw content: first non-empty line,
/// truncated to [`TITLE_MAX_CHARS`] characters.
pub fn derive_title(raw_content: &str) -> String {
    let first_line = raw_content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Untitled");
    first_line.chars().take(TITLE_MAX_CHARS).collect()
}

/// A user-defined grouping label applied to history items.
#[derive(Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// A data URI, at most [`ICON_MAX_BYTES`] bytes.
    pub icon: Option<String>,
    /// A palette token understood by the client, e.g. "blue".
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// The reserved default course. Its id is fixed so history items can
    /// reference it before it has ever been persisted.
    pub fn default_course() -> Self {
        Self {
            id: Uuid::nil(),
            name: "General".to_string(),
            description: Some("Default course for uncategorized content".to_string()),
            icon: None,
            color: "blue".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Aggregate quiz statistics, recomputed from history rather than
/// incrementally updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizStats {
    pub total_quizzes: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub username: String,
    pub email: Option<String>,
    pub quiz_stats: QuizStats,
    pub courses: Vec<Course>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            username: "Learner".to_string(),
            email: None,
            quiz_stats: QuizStats::default(),
            courses: Vec::new(),
        }
    }
}

/// Which generation feature a prompt override applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptFeature {
    Summary,
    Quiz,
    Evaluation,
}

impl PromptFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptFeature::Summary => "summary",
            PromptFeature::Quiz => "quiz",
            PromptFeature::Evaluation => "evaluation",
        }
    }
}

/// User-tunable generation settings, persisted alongside the collections.
/// The API credential lives here (not in server config) so the client can
/// supply and rotate it at runtime.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// feature -> (style/difficulty name or "default") -> template text.
    pub prompt_overrides: HashMap<String, HashMap<String, String>>,
}

impl Settings {
    /// Looks up a prompt override for a feature, preferring the specific
    /// variant key and falling back to the feature's "default" entry.
    pub fn prompt_override(&self, feature: PromptFeature, variant: &str) -> Option<&str> {
        let by_variant = self.prompt_overrides.get(feature.as_str())?;
        by_variant
            .get(variant)
            .or_else(|| by_variant.get("default"))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_first_nonempty_line_truncated() {
        let raw = "\n\n  Intro to Thermodynamics  \nsecond line";
        assert_eq!(derive_title(raw), "Intro to Thermodynamics");

        let long = "x".repeat(200);
        assert_eq!(derive_title(&long).chars().count(), TITLE_MAX_CHARS);

        assert_eq!(derive_title("   \n  "), "Untitled");
    }

    #[test]
    fn answer_correctness_is_derived_at_construction() {
        let question = Question {
            id: 7,
            text: "2+2?".to_string(),
            options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct_answer: 1,
            difficulty: Difficulty::Easy,
            explanation: None,
        };
        assert!(UserAnswer::new(&question, 1, None).is_correct);
        assert!(!UserAnswer::new(&question, 3, None).is_correct);
    }

    #[test]
    fn prompt_override_falls_back_to_default_variant() {
        let mut settings = Settings::default();
        settings.prompt_overrides.insert(
            "summary".to_string(),
            HashMap::from([
                ("default".to_string(), "base template".to_string()),
                ("casual".to_string(), "casual template".to_string()),
            ]),
        );
        assert_eq!(
            settings.prompt_override(PromptFeature::Summary, "casual"),
            Some("casual template")
        );
        assert_eq!(
            settings.prompt_override(PromptFeature::Summary, "academic"),
            Some("base template")
        );
        assert_eq!(settings.prompt_override(PromptFeature::Quiz, "easy"), None);
    }
}
