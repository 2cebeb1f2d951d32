//! crates/coursewise_core/src/views.rs
//!
//! Pure derivations over the persisted collections: filtered and searched
//! history views, per-item counts, mistake category counts, and the full
//! quiz-stats recomputation. No independent state; always recomputed from
//! the underlying collections.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{Difficulty, HistoryItem, QuizStats, UserAnswer};

/// The recency window used by the "recent" history filter.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Display counts for a single history item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCounts {
    pub summaries: usize,
    pub questions: usize,
    pub answered: usize,
}

pub fn item_counts(item: &HistoryItem) -> ItemCounts {
    ItemCounts {
        summaries: item.summaries.len(),
        questions: item.questions.as_ref().map_or(0, |b| b.total()),
        answered: item.user_answers.len(),
    }
}

/// Filters history to one course. `None` matches items without a course.
pub fn filter_by_course(items: &[HistoryItem], course_id: Option<Uuid>) -> Vec<&HistoryItem> {
    items
        .iter()
        .filter(|item| item.course_id == course_id)
        .collect()
}

/// Items created within the last [`RECENT_WINDOW_DAYS`] days of `now`.
pub fn filter_recent(items: &[HistoryItem], now: DateTime<Utc>) -> Vec<&HistoryItem> {
    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    items
        .iter()
        .filter(|item| item.created_at >= cutoff)
        .collect()
}

/// Case-insensitive free-text search over item titles and question text.
pub fn search<'a>(items: &'a [HistoryItem], query: &str) -> Vec<&'a HistoryItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            if item.title.to_lowercase().contains(&needle) {
                return true;
            }
            item.questions
                .as_ref()
                .map(|bank| {
                    bank.easy
                        .iter()
                        .chain(bank.medium.iter())
                        .chain(bank.hard.iter())
                        .any(|q| q.text.to_lowercase().contains(&needle))
                })
                .unwrap_or(false)
        })
        .collect()
}

/// Accuracy percentage from aggregate stats; 0 when nothing was answered.
pub fn accuracy_percent(stats: &QuizStats) -> f64 {
    if stats.total_questions == 0 {
        return 0.0;
    }
    (stats.correct_answers as f64 / stats.total_questions as f64) * 100.0
}

/// Mistake counts per difficulty, in easy/medium/hard order.
pub fn mistake_counts_by_difficulty(mistakes: &[UserAnswer]) -> [(Difficulty, usize); 3] {
    Difficulty::ALL.map(|difficulty| {
        let count = mistakes.iter().filter(|m| m.difficulty == difficulty).count();
        (difficulty, count)
    })
}

/// Recomputes aggregate quiz stats by scanning the entire history collection.
/// A "quiz" is a history item with at least one recorded answer.
pub fn recompute_quiz_stats(history: &[HistoryItem]) -> QuizStats {
    let mut stats = QuizStats::default();
    for item in history {
        if item.user_answers.is_empty() {
            continue;
        }
        stats.total_quizzes += 1;
        stats.total_questions += item.user_answers.len() as u32;
        stats.correct_answers += item.user_answers.iter().filter(|a| a.is_correct).count() as u32;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{derive_title, Question, QuestionBank};
    use std::collections::HashMap;

    fn item(raw: &str, course_id: Option<Uuid>, age_days: i64) -> HistoryItem {
        HistoryItem {
            id: Uuid::new_v4(),
            raw_content: raw.to_string(),
            title: derive_title(raw),
            created_at: Utc::now() - Duration::days(age_days),
            course_id,
            summaries: HashMap::new(),
            questions: None,
            user_answers: Vec::new(),
            language: None,
        }
    }

    fn question(id: u32, text: &str) -> Question {
        Question {
            id,
            text: text.to_string(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: 0,
            difficulty: Difficulty::Medium,
            explanation: None,
        }
    }

    #[test]
    fn course_filter_matches_exactly_including_none() {
        let course = Uuid::new_v4();
        let items = vec![item("a", Some(course), 0), item("b", None, 0)];
        assert_eq!(filter_by_course(&items, Some(course)).len(), 1);
        assert_eq!(filter_by_course(&items, None).len(), 1);
        assert_eq!(filter_by_course(&items, Some(Uuid::new_v4())).len(), 0);
    }

    #[test]
    fn recent_filter_uses_seven_day_window() {
        let items = vec![item("new", None, 1), item("old", None, 8)];
        let recent = filter_recent(&items, Utc::now());
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "new");
    }

    #[test]
    fn search_matches_titles_and_question_text() {
        let mut with_question = item("Biology notes", None, 0);
        with_question.questions = Some(QuestionBank {
            easy: vec![question(1, "What is mitosis?")],
            ..Default::default()
        });
        let items = vec![with_question, item("History of Rome", None, 0)];

        assert_eq!(search(&items, "MITOSIS").len(), 1);
        assert_eq!(search(&items, "rome").len(), 1);
        assert_eq!(search(&items, "").len(), 2);
        assert_eq!(search(&items, "astronomy").len(), 0);
    }

    #[test]
    fn accuracy_is_zero_without_answers() {
        assert_eq!(accuracy_percent(&QuizStats::default()), 0.0);
        let stats = QuizStats {
            total_quizzes: 1,
            correct_answers: 3,
            total_questions: 4,
        };
        assert_eq!(accuracy_percent(&stats), 75.0);
    }

    #[test]
    fn stats_are_recomputed_from_history_scan() {
        let q = question(1, "q");
        let mut answered = item("answered", None, 0);
        answered.user_answers = vec![
            UserAnswer::new(&q, 0, None),
            UserAnswer::new(&question(2, "q2"), 3, None),
        ];
        let items = vec![answered, item("unanswered", None, 0)];

        let stats = recompute_quiz_stats(&items);
        assert_eq!(stats.total_quizzes, 1);
        assert_eq!(stats.total_questions, 2);
        assert_eq!(stats.correct_answers, 1);
    }

    #[test]
    fn mistake_counts_group_by_difficulty() {
        let mut easy = UserAnswer::new(&question(1, "q"), 1, None);
        easy.difficulty = Difficulty::Easy;
        let medium = UserAnswer::new(&question(2, "q"), 1, None);
        let counts = mistake_counts_by_difficulty(&[easy, medium]);
        assert_eq!(counts[0], (Difficulty::Easy, 1));
        assert_eq!(counts[1], (Difficulty::Medium, 1));
        assert_eq!(counts[2], (Difficulty::Hard, 0));
    }
}
