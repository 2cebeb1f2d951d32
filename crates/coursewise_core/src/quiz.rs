//! crates/coursewise_core/src/quiz.rs
//!
//! The quiz session state machine: a linear pointer over a question
//! sequence with a per-question answered/unanswered sub-state. Pure and
//! synchronous; persistence of mistakes is signalled to the caller, not
//! performed here.

use uuid::Uuid;

use crate::domain::{Question, UserAnswer};

/// Errors for invalid state-machine transitions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("The quiz has no questions")]
    Empty,
    #[error("The current question has already been answered")]
    AlreadyAnswered,
    #[error("No option has been selected")]
    NoSelection,
    #[error("Option index {0} is out of range")]
    OptionOutOfRange(usize),
}

/// The outcome of one answer submission. `record_mistake` tells the caller
/// whether the answer must be upserted into the mistake collection.
#[derive(Debug, Clone)]
pub struct Submission {
    pub answer: UserAnswer,
    pub record_mistake: bool,
}

/// One in-progress quiz over a fixed question sequence.
///
/// There is no terminal state: reaching the last question merely makes
/// `next_question` a no-op.
#[derive(Debug)]
pub struct QuizSession {
    questions: Vec<Question>,
    current: usize,
    pending_selection: Option<usize>,
    explanation_visible: bool,
    /// Keyed by question id, last write wins.
    answers: Vec<UserAnswer>,
    course_id: Option<Uuid>,
}

impl QuizSession {
    /// Starts a session positioned at index 0, optionally seeded with
    /// previously saved answers for this exact question set.
    pub fn new(
        questions: Vec<Question>,
        course_id: Option<Uuid>,
        initial_answers: Vec<UserAnswer>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        let mut session = Self {
            questions,
            current: 0,
            pending_selection: None,
            explanation_visible: false,
            answers: Vec::new(),
            course_id,
        };
        for answer in initial_answers {
            session.store_answer(answer);
        }
        session.sync_to_current();
        Ok(session)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn pending_selection(&self) -> Option<usize> {
        self.pending_selection
    }

    pub fn explanation_visible(&self) -> bool {
        self.explanation_visible
    }

    pub fn answers(&self) -> &[UserAnswer] {
        &self.answers
    }

    /// The recorded answer for the current question, if any.
    pub fn current_answer(&self) -> Option<&UserAnswer> {
        self.answer_for(self.current_question().id)
    }

    pub fn answer_for(&self, question_id: u32) -> Option<&UserAnswer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    /// Selects an option on the current question. Allowed only while the
    /// question is unanswered.
    pub fn select_option(&mut self, option_index: usize) -> Result<(), QuizError> {
        if self.current_answer().is_some() {
            return Err(QuizError::AlreadyAnswered);
        }
        if option_index >= self.current_question().options.len() {
            return Err(QuizError::OptionOutOfRange(option_index));
        }
        self.pending_selection = Some(option_index);
        Ok(())
    }

    /// Submits the pending selection for the current question. Correctness is
    /// derived by index comparison; the explanation is auto-shown afterwards.
    pub fn submit_answer(&mut self) -> Result<Submission, QuizError> {
        if self.current_answer().is_some() {
            return Err(QuizError::AlreadyAnswered);
        }
        let selected = self.pending_selection.ok_or(QuizError::NoSelection)?;
        let answer = UserAnswer::new(self.current_question(), selected, self.course_id);
        let record_mistake = !answer.is_correct;
        self.store_answer(answer.clone());
        self.explanation_visible = true;
        Ok(Submission {
            answer,
            record_mistake,
        })
    }

    /// Moves to the next question; a no-op at the last index.
    pub fn next_question(&mut self) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.sync_to_current();
        }
    }

    /// Moves to the previous question; a no-op at index 0.
    pub fn prev_question(&mut self) {
        if self.current > 0 {
            self.current -= 1;
            self.sync_to_current();
        }
    }

    /// Whether a "why was this wrong" explanation may be requested: only
    /// valid once the current question is answered incorrectly.
    pub fn can_request_evaluation(&self) -> bool {
        matches!(self.current_answer(), Some(a) if !a.is_correct)
    }

    /// Upserts into the session answer list, keyed by question id.
    fn store_answer(&mut self, answer: UserAnswer) {
        match self
            .answers
            .iter()
            .position(|a| a.question_id == answer.question_id)
        {
            Some(index) => self.answers[index] = answer,
            None => self.answers.push(answer),
        }
    }

    /// Resets pending selection and explanation visibility to reflect the
    /// target question's prior answer, if any.
    fn sync_to_current(&mut self) {
        match self.current_answer() {
            Some(answer) => {
                self.pending_selection = Some(answer.selected_option);
                self.explanation_visible = true;
            }
            None => {
                self.pending_selection = None;
                self.explanation_visible = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;

    fn question(id: u32, correct: usize) -> Question {
        Question {
            id,
            text: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: correct,
            difficulty: Difficulty::Easy,
            explanation: Some("because".into()),
        }
    }

    fn session(n: u32) -> QuizSession {
        let questions = (0..n).map(|i| question(i, 2)).collect();
        QuizSession::new(questions, None, Vec::new()).unwrap()
    }

    #[test]
    fn empty_question_set_is_rejected() {
        assert_eq!(
            QuizSession::new(Vec::new(), None, Vec::new()).err(),
            Some(QuizError::Empty)
        );
    }

    #[test]
    fn navigation_is_clamped_at_both_ends() {
        let mut s = session(3);
        s.prev_question();
        assert_eq!(s.current_index(), 0);

        s.next_question();
        s.next_question();
        assert_eq!(s.current_index(), 2);
        s.next_question();
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn submit_requires_a_selection() {
        let mut s = session(1);
        assert_eq!(s.submit_answer().err(), Some(QuizError::NoSelection));
    }

    #[test]
    fn select_rejects_out_of_range_option() {
        let mut s = session(1);
        assert_eq!(
            s.select_option(4).err(),
            Some(QuizError::OptionOutOfRange(4))
        );
    }

    #[test]
    fn correct_submission_does_not_flag_a_mistake() {
        let mut s = session(1);
        s.select_option(2).unwrap();
        let submission = s.submit_answer().unwrap();
        assert!(submission.answer.is_correct);
        assert!(!submission.record_mistake);
        assert!(s.explanation_visible());
    }

    #[test]
    fn wrong_submission_flags_a_mistake() {
        let mut s = session(1);
        s.select_option(1).unwrap();
        let submission = s.submit_answer().unwrap();
        assert!(!submission.answer.is_correct);
        assert!(submission.record_mistake);
        assert!(s.can_request_evaluation());
    }

    #[test]
    fn answered_question_rejects_reselection_and_resubmission() {
        let mut s = session(1);
        s.select_option(0).unwrap();
        s.submit_answer().unwrap();
        assert_eq!(s.select_option(1).err(), Some(QuizError::AlreadyAnswered));
        assert_eq!(s.submit_answer().err(), Some(QuizError::AlreadyAnswered));
    }

    #[test]
    fn navigation_restores_prior_answer_state() {
        let mut s = session(2);
        s.select_option(1).unwrap();
        s.submit_answer().unwrap();

        s.next_question();
        assert_eq!(s.pending_selection(), None);
        assert!(!s.explanation_visible());

        s.prev_question();
        assert_eq!(s.pending_selection(), Some(1));
        assert!(s.explanation_visible());
    }

    #[test]
    fn session_answers_are_last_write_wins_by_question_id() {
        let q = question(0, 2);
        let first = UserAnswer::new(&q, 0, None);
        let second = UserAnswer::new(&q, 2, None);

        // Seeding applies the same upsert as submission.
        let seeded = QuizSession::new(vec![q], None, vec![first, second]).unwrap();
        assert_eq!(seeded.answers().len(), 1);
        assert_eq!(seeded.answers()[0].selected_option, 2);
        assert!(seeded.answers()[0].is_correct);
        // The seeded session reflects the stored answer immediately.
        assert_eq!(seeded.pending_selection(), Some(2));
        assert!(seeded.explanation_visible());
    }
}
