//! services/api/src/adapters/store.rs
//!
//! This module contains the storage adapter, which is the concrete
//! implementation of the repository ports from the `core` crate. Each
//! collection lives in one JSON file under the data directory and is
//! rewritten whole on every mutation; all read-modify-write cycles for a
//! collection are serialized through a per-collection mutex, so two
//! overlapping mutations cannot lose each other's update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursewise_core::domain::{
    Course, Difficulty, HistoryItem, Language, Question, QuestionBank, QuizStats, Settings,
    SummaryStyle, UserAnswer, UserProfile, HISTORY_CAP, MISTAKE_CAP,
};
use coursewise_core::ports::{
    HistoryRepository, MistakeRepository, PortError, PortResult, ProfileRepository,
    SettingsRepository,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

const HISTORY_FILE: &str = "history.json";
const MISTAKES_FILE: &str = "mistakes.json";
const PROFILE_FILE: &str = "profile.json";
const SETTINGS_FILE: &str = "settings.json";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the repository ports over JSON files.
pub struct FileStoreAdapter {
    dir: PathBuf,
    history_lock: Mutex<()>,
    mistakes_lock: Mutex<()>,
    profile_lock: Mutex<()>,
    settings_lock: Mutex<()>,
}

impl FileStoreAdapter {
    /// Creates a new `FileStoreAdapter` rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            history_lock: Mutex::new(()),
            mistakes_lock: Mutex::new(()),
            profile_lock: Mutex::new(()),
            settings_lock: Mutex::new(()),
        }
    }

    /// Ensures the data directory exists. Called once at startup.
    pub async fn init(&self) -> PortResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to create data dir: {}", e)))
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Reads one collection. A missing file or a corrupt payload falls back
    /// to the default value; corruption is logged, never surfaced.
    async fn read<T: DeserializeOwned + Default>(&self, file: &str) -> T {
        let path = self.path(file);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        "Stored collection {} is corrupt ({}); falling back to default.",
                        path.display(),
                        e
                    );
                    T::default()
                }
            },
            Err(_) => T::default(),
        }
    }

    /// Serializes and atomically replaces one collection file.
    async fn write<T: Serialize>(&self, file: &str, value: &T) -> PortResult<()> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| PortError::Unexpected(format!("serialization failed: {}", e)))?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| write_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| write_error(&path, e))
    }
}

fn write_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("failed to write {}: {}", path.display(), e))
}

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
enum StyleRecord {
    Casual,
    Academic,
    Basic,
}

impl From<SummaryStyle> for StyleRecord {
    fn from(style: SummaryStyle) -> Self {
        match style {
            SummaryStyle::Casual => StyleRecord::Casual,
            SummaryStyle::Academic => StyleRecord::Academic,
            SummaryStyle::Basic => StyleRecord::Basic,
        }
    }
}

impl StyleRecord {
    fn to_domain(self) -> SummaryStyle {
        match self {
            StyleRecord::Casual => SummaryStyle::Casual,
            StyleRecord::Academic => SummaryStyle::Academic,
            StyleRecord::Basic => SummaryStyle::Basic,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum LanguageRecord {
    Chinese,
    English,
    Spanish,
    French,
}

impl From<Language> for LanguageRecord {
    fn from(language: Language) -> Self {
        match language {
            Language::Chinese => LanguageRecord::Chinese,
            Language::English => LanguageRecord::English,
            Language::Spanish => LanguageRecord::Spanish,
            Language::French => LanguageRecord::French,
        }
    }
}

impl LanguageRecord {
    fn to_domain(self) -> Language {
        match self {
            LanguageRecord::Chinese => Language::Chinese,
            LanguageRecord::English => Language::English,
            LanguageRecord::Spanish => Language::Spanish,
            LanguageRecord::French => Language::French,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum DifficultyRecord {
    Easy,
    Medium,
    Hard,
}

impl From<Difficulty> for DifficultyRecord {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => DifficultyRecord::Easy,
            Difficulty::Medium => DifficultyRecord::Medium,
            Difficulty::Hard => DifficultyRecord::Hard,
        }
    }
}

impl DifficultyRecord {
    fn to_domain(self) -> Difficulty {
        match self {
            DifficultyRecord::Easy => Difficulty::Easy,
            DifficultyRecord::Medium => Difficulty::Medium,
            DifficultyRecord::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct QuestionRecord {
    id: u32,
    text: String,
    options: Vec<String>,
    correct_answer: usize,
    difficulty: DifficultyRecord,
    explanation: Option<String>,
}

impl QuestionRecord {
    fn from_domain(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer,
            difficulty: q.difficulty.into(),
            explanation: q.explanation.clone(),
        }
    }

    fn to_domain(self) -> Question {
        Question {
            id: self.id,
            text: self.text,
            options: self.options,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty.to_domain(),
            explanation: self.explanation,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Default)]
struct QuestionBankRecord {
    easy: Vec<QuestionRecord>,
    medium: Vec<QuestionRecord>,
    hard: Vec<QuestionRecord>,
}

impl QuestionBankRecord {
    fn from_domain(bank: &QuestionBank) -> Self {
        Self {
            easy: bank.easy.iter().map(QuestionRecord::from_domain).collect(),
            medium: bank.medium.iter().map(QuestionRecord::from_domain).collect(),
            hard: bank.hard.iter().map(QuestionRecord::from_domain).collect(),
        }
    }

    fn to_domain(self) -> QuestionBank {
        QuestionBank {
            easy: self.easy.into_iter().map(QuestionRecord::to_domain).collect(),
            medium: self.medium.into_iter().map(QuestionRecord::to_domain).collect(),
            hard: self.hard.into_iter().map(QuestionRecord::to_domain).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct UserAnswerRecord {
    question_id: u32,
    selected_option: usize,
    is_correct: bool,
    question_text: String,
    options: Vec<String>,
    correct_answer: usize,
    difficulty: DifficultyRecord,
    explanation: Option<String>,
    answered_at: DateTime<Utc>,
    course_id: Option<Uuid>,
}

impl UserAnswerRecord {
    fn from_domain(a: &UserAnswer) -> Self {
        Self {
            question_id: a.question_id,
            selected_option: a.selected_option,
            is_correct: a.is_correct,
            question_text: a.question_text.clone(),
            options: a.options.clone(),
            correct_answer: a.correct_answer,
            difficulty: a.difficulty.into(),
            explanation: a.explanation.clone(),
            answered_at: a.answered_at,
            course_id: a.course_id,
        }
    }

    fn to_domain(self) -> UserAnswer {
        UserAnswer {
            question_id: self.question_id,
            selected_option: self.selected_option,
            is_correct: self.is_correct,
            question_text: self.question_text,
            options: self.options,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty.to_domain(),
            explanation: self.explanation,
            answered_at: self.answered_at,
            course_id: self.course_id,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct HistoryItemRecord {
    id: Uuid,
    raw_content: String,
    title: String,
    created_at: DateTime<Utc>,
    course_id: Option<Uuid>,
    summaries: HashMap<StyleRecord, String>,
    questions: Option<QuestionBankRecord>,
    user_answers: Vec<UserAnswerRecord>,
    language: Option<LanguageRecord>,
}

impl HistoryItemRecord {
    fn from_domain(item: &HistoryItem) -> Self {
        Self {
            id: item.id,
            raw_content: item.raw_content.clone(),
            title: item.title.clone(),
            created_at: item.created_at,
            course_id: item.course_id,
            summaries: item
                .summaries
                .iter()
                .map(|(style, text)| ((*style).into(), text.clone()))
                .collect(),
            questions: item.questions.as_ref().map(QuestionBankRecord::from_domain),
            user_answers: item
                .user_answers
                .iter()
                .map(UserAnswerRecord::from_domain)
                .collect(),
            language: item.language.map(Into::into),
        }
    }

    fn to_domain(self) -> HistoryItem {
        HistoryItem {
            id: self.id,
            raw_content: self.raw_content,
            title: self.title,
            created_at: self.created_at,
            course_id: self.course_id,
            summaries: self
                .summaries
                .into_iter()
                .map(|(style, text)| (style.to_domain(), text))
                .collect(),
            questions: self.questions.map(QuestionBankRecord::to_domain),
            user_answers: self
                .user_answers
                .into_iter()
                .map(UserAnswerRecord::to_domain)
                .collect(),
            language: self.language.map(LanguageRecord::to_domain),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct CourseRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    icon: Option<String>,
    color: String,
    created_at: DateTime<Utc>,
}

impl CourseRecord {
    fn from_domain(course: &Course) -> Self {
        Self {
            id: course.id,
            name: course.name.clone(),
            description: course.description.clone(),
            icon: course.icon.clone(),
            color: course.color.clone(),
            created_at: course.created_at,
        }
    }

    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            name: self.name,
            description: self.description,
            icon: self.icon,
            color: self.color,
            created_at: self.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct ProfileRecord {
    username: String,
    email: Option<String>,
    total_quizzes: u32,
    correct_answers: u32,
    total_questions: u32,
    courses: Vec<CourseRecord>,
}

impl ProfileRecord {
    fn from_domain(profile: &UserProfile) -> Self {
        Self {
            username: profile.username.clone(),
            email: profile.email.clone(),
            total_quizzes: profile.quiz_stats.total_quizzes,
            correct_answers: profile.quiz_stats.correct_answers,
            total_questions: profile.quiz_stats.total_questions,
            courses: profile.courses.iter().map(CourseRecord::from_domain).collect(),
        }
    }

    fn to_domain(self) -> UserProfile {
        UserProfile {
            username: self.username,
            email: self.email,
            quiz_stats: QuizStats {
                total_quizzes: self.total_quizzes,
                correct_answers: self.correct_answers,
                total_questions: self.total_questions,
            },
            courses: self.courses.into_iter().map(CourseRecord::to_domain).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Default)]
struct SettingsRecord {
    api_key: Option<String>,
    model: Option<String>,
    prompt_overrides: HashMap<String, HashMap<String, String>>,
}

impl SettingsRecord {
    fn from_domain(settings: &Settings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            prompt_overrides: settings.prompt_overrides.clone(),
        }
    }

    fn to_domain(self) -> Settings {
        Settings {
            api_key: self.api_key,
            model: self.model,
            prompt_overrides: self.prompt_overrides,
        }
    }
}

//=========================================================================================
// `HistoryRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryRepository for FileStoreAdapter {
    async fn list(&self) -> PortResult<Vec<HistoryItem>> {
        let _guard = self.history_lock.lock().await;
        let records: Vec<HistoryItemRecord> = self.read(HISTORY_FILE).await;
        Ok(records.into_iter().map(HistoryItemRecord::to_domain).collect())
    }

    async fn get(&self, id: Uuid) -> PortResult<HistoryItem> {
        let _guard = self.history_lock.lock().await;
        let records: Vec<HistoryItemRecord> = self.read(HISTORY_FILE).await;
        records
            .into_iter()
            .find(|r| r.id == id)
            .map(HistoryItemRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("history item {}", id)))
    }

    async fn upsert_by_content(&self, item: HistoryItem) -> PortResult<HistoryItem> {
        let _guard = self.history_lock.lock().await;
        let mut records: Vec<HistoryItemRecord> = self.read(HISTORY_FILE).await;

        let mut record = HistoryItemRecord::from_domain(&item);
        let stored = match records.iter().position(|r| r.raw_content == item.raw_content) {
            Some(index) => {
                // Same content submitted again: keep the original id and list
                // position, overwrite the generated artifacts and timestamp.
                record.id = records[index].id;
                records[index] = record.clone();
                record
            }
            None => {
                records.insert(0, record.clone());
                // New items go to the front, so truncation evicts the oldest.
                records.truncate(HISTORY_CAP);
                record
            }
        };

        self.write(HISTORY_FILE, &records).await?;
        Ok(stored.to_domain())
    }

    async fn record_answer(&self, item_id: Uuid, answer: UserAnswer) -> PortResult<()> {
        let _guard = self.history_lock.lock().await;
        let mut records: Vec<HistoryItemRecord> = self.read(HISTORY_FILE).await;
        let item = records
            .iter_mut()
            .find(|r| r.id == item_id)
            .ok_or_else(|| PortError::NotFound(format!("history item {}", item_id)))?;

        let record = UserAnswerRecord::from_domain(&answer);
        match item
            .user_answers
            .iter()
            .position(|a| a.question_id == record.question_id)
        {
            Some(index) => item.user_answers[index] = record,
            None => item.user_answers.push(record),
        }

        self.write(HISTORY_FILE, &records).await
    }

    async fn add_summary(
        &self,
        item_id: Uuid,
        style: SummaryStyle,
        content: &str,
    ) -> PortResult<()> {
        let _guard = self.history_lock.lock().await;
        let mut records: Vec<HistoryItemRecord> = self.read(HISTORY_FILE).await;
        let item = records
            .iter_mut()
            .find(|r| r.id == item_id)
            .ok_or_else(|| PortError::NotFound(format!("history item {}", item_id)))?;

        item.summaries.insert(style.into(), content.to_string());
        self.write(HISTORY_FILE, &records).await
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let _guard = self.history_lock.lock().await;
        let mut records: Vec<HistoryItemRecord> = self.read(HISTORY_FILE).await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(PortError::NotFound(format!("history item {}", id)));
        }
        self.write(HISTORY_FILE, &records).await
    }
}

//=========================================================================================
// `MistakeRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl MistakeRepository for FileStoreAdapter {
    async fn list(&self) -> PortResult<Vec<UserAnswer>> {
        let _guard = self.mistakes_lock.lock().await;
        let records: Vec<UserAnswerRecord> = self.read(MISTAKES_FILE).await;
        Ok(records.into_iter().map(UserAnswerRecord::to_domain).collect())
    }

    async fn upsert(&self, answer: UserAnswer) -> PortResult<()> {
        let _guard = self.mistakes_lock.lock().await;
        let mut records: Vec<UserAnswerRecord> = self.read(MISTAKES_FILE).await;

        let record = UserAnswerRecord::from_domain(&answer);
        match records.iter().position(|r| r.question_id == record.question_id) {
            Some(index) => records[index] = record,
            None => records.push(record),
        }
        // Evict the oldest entries, never the one just inserted.
        if records.len() > MISTAKE_CAP {
            let excess = records.len() - MISTAKE_CAP;
            records.drain(..excess);
        }

        self.write(MISTAKES_FILE, &records).await
    }

    async fn remove(&self, question_id: u32) -> PortResult<()> {
        let _guard = self.mistakes_lock.lock().await;
        let mut records: Vec<UserAnswerRecord> = self.read(MISTAKES_FILE).await;
        let before = records.len();
        records.retain(|r| r.question_id != question_id);
        if records.len() == before {
            return Err(PortError::NotFound(format!(
                "mistake for question {}",
                question_id
            )));
        }
        self.write(MISTAKES_FILE, &records).await
    }
}

//=========================================================================================
// `ProfileRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileRepository for FileStoreAdapter {
    async fn load(&self) -> PortResult<UserProfile> {
        let _guard = self.profile_lock.lock().await;
        let record: Option<ProfileRecord> = self.read(PROFILE_FILE).await;
        Ok(record.map(ProfileRecord::to_domain).unwrap_or_default())
    }

    async fn save(&self, profile: UserProfile) -> PortResult<()> {
        let _guard = self.profile_lock.lock().await;
        self.write(PROFILE_FILE, &ProfileRecord::from_domain(&profile))
            .await
    }

    async fn ensure_default_course(&self) -> PortResult<Course> {
        let _guard = self.profile_lock.lock().await;
        let record: Option<ProfileRecord> = self.read(PROFILE_FILE).await;
        let mut profile = record.map(ProfileRecord::to_domain).unwrap_or_default();

        let default_id = Course::default_course().id;
        if let Some(course) = profile.courses.iter().find(|c| c.id == default_id) {
            return Ok(course.clone());
        }

        let course = Course::default_course();
        profile.courses.insert(0, course.clone());
        self.write(PROFILE_FILE, &ProfileRecord::from_domain(&profile))
            .await?;
        Ok(course)
    }
}

//=========================================================================================
// `SettingsRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl SettingsRepository for FileStoreAdapter {
    async fn load(&self) -> PortResult<Settings> {
        let _guard = self.settings_lock.lock().await;
        let record: SettingsRecord = self.read(SETTINGS_FILE).await;
        Ok(record.to_domain())
    }

    async fn save(&self, settings: Settings) -> PortResult<()> {
        let _guard = self.settings_lock.lock().await;
        self.write(SETTINGS_FILE, &SettingsRecord::from_domain(&settings))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursewise_core::domain::{CourseContent, Summary};
    use tempfile::tempdir;

    fn content(raw: &str) -> CourseContent {
        CourseContent {
            raw_content: raw.to_string(),
            summary: Some(Summary {
                content: "a summary".to_string(),
                style: SummaryStyle::Casual,
                language: Language::English,
            }),
            all_styles: HashMap::from([(SummaryStyle::Casual, "a summary".to_string())]),
            questions: None,
            language: Language::English,
        }
    }

    fn item(raw: &str) -> HistoryItem {
        HistoryItem::from_content(&content(raw), None)
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

    async fn store(dir: &Path) -> FileStoreAdapter {
        let store = FileStoreAdapter::new(dir);
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn resubmitting_identical_content_updates_in_place() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        let first = store.upsert_by_content(item("same text")).await.unwrap();
        let mut second = item("same text");
        second
            .summaries
            .insert(SummaryStyle::Academic, "new".to_string());
        let stored = store.upsert_by_content(second).await.unwrap();

        let all = HistoryRepository::list(&store).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(stored.id, first.id);
        assert!(all[0].summaries.contains_key(&SummaryStyle::Academic));
    }

    #[tokio::test]
    async fn history_is_capped_and_evicts_the_oldest() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        for i in 0..=HISTORY_CAP {
            store
                .upsert_by_content(item(&format!("content number {}", i)))
                .await
                .unwrap();
        }

        let all = HistoryRepository::list(&store).await.unwrap();
        assert_eq!(all.len(), HISTORY_CAP);
        // Item 0 was inserted first and must be gone; the newest is in front.
        assert!(all.iter().all(|i| i.raw_content != "content number 0"));
        assert_eq!(
            all[0].raw_content,
            format!("content number {}", HISTORY_CAP)
        );
    }

    #[tokio::test]
    async fn answers_are_last_write_wins_within_an_item() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;
        let stored = store.upsert_by_content(item("with quiz")).await.unwrap();

        let q = question(5);
        store
            .record_answer(stored.id, UserAnswer::new(&q, 1, None))
            .await
            .unwrap();
        store
            .record_answer(stored.id, UserAnswer::new(&q, 0, None))
            .await
            .unwrap();

        let reloaded = store.get(stored.id).await.unwrap();
        assert_eq!(reloaded.user_answers.len(), 1);
        assert_eq!(reloaded.user_answers[0].selected_option, 0);
        assert!(reloaded.user_answers[0].is_correct);
    }

    #[tokio::test]
    async fn mistakes_upsert_by_question_id_and_keep_newest_on_overflow() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        // Same question answered wrong twice leaves one entry.
        let q = question(1);
        MistakeRepository::upsert(&store, UserAnswer::new(&q, 1, None))
            .await
            .unwrap();
        MistakeRepository::upsert(&store, UserAnswer::new(&q, 2, None))
            .await
            .unwrap();
        let mistakes = MistakeRepository::list(&store).await.unwrap();
        assert_eq!(mistakes.len(), 1);
        assert_eq!(mistakes[0].selected_option, 2);

        // Overflowing the cap evicts the oldest entries, not the newest.
        for id in 2..=(MISTAKE_CAP as u32 + 1) {
            MistakeRepository::upsert(&store, UserAnswer::new(&question(id), 1, None))
                .await
                .unwrap();
        }
        let mistakes = MistakeRepository::list(&store).await.unwrap();
        assert_eq!(mistakes.len(), MISTAKE_CAP);
        assert!(mistakes.iter().all(|m| m.question_id != 1));
        assert!(mistakes.iter().any(|m| m.question_id == MISTAKE_CAP as u32 + 1));
    }

    #[tokio::test]
    async fn corrupt_collection_falls_back_to_empty_default() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;
        tokio::fs::write(dir.path().join(HISTORY_FILE), "{not json]")
            .await
            .unwrap();

        let all = HistoryRepository::list(&store).await.unwrap();
        assert!(all.is_empty());

        // The collection is writable again afterwards.
        store.upsert_by_content(item("fresh start")).await.unwrap();
        assert_eq!(HistoryRepository::list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn default_course_is_created_lazily_exactly_once() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        assert!(ProfileRepository::load(&store).await.unwrap().courses.is_empty());
        let first = store.ensure_default_course().await.unwrap();
        let second = store.ensure_default_course().await.unwrap();
        assert_eq!(first.id, second.id);

        let profile = ProfileRepository::load(&store).await.unwrap();
        assert_eq!(profile.courses.len(), 1);
        assert_eq!(profile.courses[0].name, "General");
    }

    #[tokio::test]
    async fn settings_round_trip_through_the_store() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        let mut settings = Settings::default();
        settings.api_key = Some("sk-test".to_string());
        settings.model = Some("gpt-4o".to_string());
        SettingsRepository::save(&store, settings).await.unwrap();

        let loaded = SettingsRepository::load(&store).await.unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.model.as_deref(), Some("gpt-4o"));
    }
}
