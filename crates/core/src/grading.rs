//! Quiz grading and per-attempt answer tracking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::QuizQuestion;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("question {index} does not exist (quiz has {len})")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("{option:?} is not an option of question {index}")]
    UnknownOption { index: usize, option: String },

    #[error("question {index} was already answered")]
    AlreadyAnswered { index: usize },

    #[error("quiz was already submitted")]
    AlreadySubmitted,

    #[error("answer every question before checking ({} left)", .unanswered.len())]
    Incomplete { unanswered: Vec<usize> },
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub is_correct: bool,
}

/// Grades one selection against a question. Never mutates the question.
#[must_use]
pub fn grade(question: &QuizQuestion, selected_option: &str) -> Grade {
    Grade {
        is_correct: selected_option == question.answer(),
    }
}

/// How an option should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionMark {
    /// Nothing revealed yet.
    Unmarked,
    Correct,
    /// The learner's pick, and it is wrong.
    Incorrect,
    Dimmed,
}

/// Marks for every option of `question`.
///
/// Until `revealed`, every option is `Unmarked`. Afterwards options equal to
/// the answer are `Correct`, the selection is `Incorrect` when it differs,
/// and the rest are `Dimmed`. A question whose answer matches no option shows
/// no `Correct` mark at all.
#[must_use]
pub fn option_marks(
    question: &QuizQuestion,
    selected: Option<usize>,
    revealed: bool,
) -> Vec<OptionMark> {
    question
        .options()
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            if !revealed {
                OptionMark::Unmarked
            } else if option == question.answer() {
                OptionMark::Correct
            } else if selected == Some(idx) {
                OptionMark::Incorrect
            } else {
                OptionMark::Dimmed
            }
        })
        .collect()
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// When answers are revealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizMode {
    /// Each question locks and shows its result as soon as it is answered.
    #[default]
    Immediate,
    /// Selections stay editable until the whole quiz is submitted at once.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionState {
    Unanswered,
    Answered { option: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: usize,
    pub answered: usize,
    pub total: usize,
}

/// One learner's pass through a lesson quiz.
///
/// Holds at most one selected option per question. Indices refer to the
/// lesson's question list, which the caller passes back in on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    mode: QuizMode,
    states: Vec<QuestionState>,
    submitted: bool,
}

impl QuizAttempt {
    #[must_use]
    pub fn new(question_count: usize, mode: QuizMode) -> Self {
        Self {
            mode,
            states: vec![QuestionState::Unanswered; question_count],
            submitted: false,
        }
    }

    #[must_use]
    pub fn for_questions(questions: &[QuizQuestion], mode: QuizMode) -> Self {
        Self::new(questions.len(), mode)
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    #[must_use]
    pub fn state(&self, index: usize) -> Option<QuestionState> {
        self.states.get(index).copied()
    }

    #[must_use]
    pub fn selected(&self, index: usize) -> Option<usize> {
        match self.states.get(index)? {
            QuestionState::Answered { option } => Some(*option),
            QuestionState::Unanswered => None,
        }
    }

    /// Whether the result of question `index` may be shown.
    #[must_use]
    pub fn is_revealed(&self, index: usize) -> bool {
        match self.mode {
            QuizMode::Immediate => self.selected(index).is_some(),
            QuizMode::Deferred => self.submitted,
        }
    }

    /// True once every question has a selection.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.states
            .iter()
            .all(|s| matches!(s, QuestionState::Answered { .. }))
    }

    #[must_use]
    pub fn unanswered(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, QuestionState::Unanswered))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Records a selection for question `index`.
    ///
    /// In immediate mode the question locks and the grade is returned. In
    /// deferred mode the selection may be changed until submission and
    /// `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// `QuestionOutOfRange` / `UnknownOption` for bad input,
    /// `AlreadyAnswered` for a locked question, `AlreadySubmitted` after submission.
    pub fn answer(
        &mut self,
        questions: &[QuizQuestion],
        index: usize,
        option: &str,
    ) -> Result<Option<Grade>, AttemptError> {
        let question = self.question_at(questions, index)?;
        if self.submitted {
            return Err(AttemptError::AlreadySubmitted);
        }
        if self.mode == QuizMode::Immediate && self.selected(index).is_some() {
            return Err(AttemptError::AlreadyAnswered { index });
        }

        let position = question
            .options()
            .iter()
            .position(|o| o == option)
            .ok_or_else(|| AttemptError::UnknownOption {
                index,
                option: option.to_owned(),
            })?;

        self.states[index] = QuestionState::Answered { option: position };

        Ok(match self.mode {
            QuizMode::Immediate => Some(grade(question, option)),
            QuizMode::Deferred => None,
        })
    }

    /// Locks the attempt and reveals every result.
    ///
    /// # Errors
    ///
    /// `Incomplete` while any question lacks a selection, `AlreadySubmitted` on a second call.
    pub fn submit(&mut self, questions: &[QuizQuestion]) -> Result<QuizScore, AttemptError> {
        if self.submitted {
            return Err(AttemptError::AlreadySubmitted);
        }
        let unanswered = self.unanswered();
        if !unanswered.is_empty() {
            return Err(AttemptError::Incomplete { unanswered });
        }
        self.submitted = true;
        Ok(self.score(questions))
    }

    /// Puts every question back to `Unanswered`.
    pub fn retry(&mut self) {
        self.states.fill(QuestionState::Unanswered);
        self.submitted = false;
    }

    /// Counts correct answers among revealed questions.
    #[must_use]
    pub fn score(&self, questions: &[QuizQuestion]) -> QuizScore {
        let mut correct = 0;
        let mut answered = 0;
        for (idx, question) in questions.iter().enumerate().take(self.states.len()) {
            if !self.is_revealed(idx) {
                continue;
            }
            let Some(option) = self.selected(idx) else {
                continue;
            };
            answered += 1;
            if question
                .options()
                .get(option)
                .is_some_and(|o| grade(question, o).is_correct)
            {
                correct += 1;
            }
        }
        QuizScore {
            correct,
            answered,
            total: self.states.len(),
        }
    }

    #[must_use]
    pub fn marks(&self, questions: &[QuizQuestion], index: usize) -> Vec<OptionMark> {
        questions
            .get(index)
            .map(|q| option_marks(q, self.selected(index), self.is_revealed(index)))
            .unwrap_or_default()
    }

    fn question_at<'q>(
        &self,
        questions: &'q [QuizQuestion],
        index: usize,
    ) -> Result<&'q QuizQuestion, AttemptError> {
        if index >= self.states.len() {
            return Err(AttemptError::QuestionOutOfRange {
                index,
                len: self.states.len(),
            });
        }
        questions
            .get(index)
            .ok_or(AttemptError::QuestionOutOfRange {
                index,
                len: questions.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_plus_two() -> QuizQuestion {
        QuizQuestion::new(
            "2+2?",
            vec!["3".into(), "4".into(), "5".into()],
            "4",
        )
        .unwrap()
    }

    fn capital() -> QuizQuestion {
        QuizQuestion::new(
            "Capital of France?",
            vec!["Lyon".into(), "Paris".into()],
            "Paris",
        )
        .unwrap()
    }

    #[test]
    fn grade_compares_with_answer() {
        let q = two_plus_two();
        assert!(grade(&q, "4").is_correct);
        assert!(!grade(&q, "3").is_correct);
    }

    #[test]
    fn immediate_answer_locks_question() {
        let questions = vec![two_plus_two()];
        let mut attempt = QuizAttempt::for_questions(&questions, QuizMode::Immediate);

        let grade = attempt.answer(&questions, 0, "3").unwrap();
        assert_eq!(grade, Some(Grade { is_correct: false }));
        assert_eq!(attempt.state(0), Some(QuestionState::Answered { option: 0 }));

        let err = attempt.answer(&questions, 0, "4").unwrap_err();
        assert_eq!(err, AttemptError::AlreadyAnswered { index: 0 });
        assert_eq!(attempt.selected(0), Some(0));
    }

    #[test]
    fn retry_resets_every_question() {
        let questions = vec![two_plus_two(), capital()];
        let mut attempt = QuizAttempt::for_questions(&questions, QuizMode::Immediate);
        attempt.answer(&questions, 0, "4").unwrap();
        attempt.answer(&questions, 1, "Lyon").unwrap();
        assert!(attempt.is_complete());

        attempt.retry();
        assert_eq!(attempt.unanswered(), vec![0, 1]);
        assert!(attempt.answer(&questions, 0, "4").unwrap().unwrap().is_correct);
    }

    #[test]
    fn rejects_unknown_option_and_index() {
        let questions = vec![two_plus_two()];
        let mut attempt = QuizAttempt::for_questions(&questions, QuizMode::Immediate);
        assert!(matches!(
            attempt.answer(&questions, 0, "22"),
            Err(AttemptError::UnknownOption { index: 0, .. })
        ));
        assert!(matches!(
            attempt.answer(&questions, 3, "4"),
            Err(AttemptError::QuestionOutOfRange { index: 3, len: 1 })
        ));
        assert_eq!(attempt.state(0), Some(QuestionState::Unanswered));
    }

    #[test]
    fn marks_follow_rendering_rules() {
        let questions = vec![two_plus_two()];
        let mut attempt = QuizAttempt::for_questions(&questions, QuizMode::Immediate);
        assert_eq!(attempt.marks(&questions, 0), vec![OptionMark::Unmarked; 3]);

        attempt.answer(&questions, 0, "5").unwrap();
        assert_eq!(
            attempt.marks(&questions, 0),
            vec![OptionMark::Dimmed, OptionMark::Correct, OptionMark::Incorrect]
        );
    }

    #[test]
    fn ungradable_question_never_shows_correct() {
        let q = QuizQuestion::from_persisted(
            "2+2?".into(),
            vec!["3".into(), "5".into()],
            "4".into(),
        );
        let questions = vec![q];
        let mut attempt = QuizAttempt::for_questions(&questions, QuizMode::Immediate);
        let grade = attempt.answer(&questions, 0, "3").unwrap().unwrap();
        assert!(!grade.is_correct);
        let marks = attempt.marks(&questions, 0);
        assert!(!marks.contains(&OptionMark::Correct));
        assert_eq!(marks, vec![OptionMark::Incorrect, OptionMark::Dimmed]);
    }

    #[test]
    fn deferred_mode_reveals_on_submit() {
        let questions = vec![two_plus_two(), capital()];
        let mut attempt = QuizAttempt::for_questions(&questions, QuizMode::Deferred);

        assert_eq!(attempt.answer(&questions, 0, "3").unwrap(), None);
        attempt.answer(&questions, 0, "4").unwrap();
        assert!(!attempt.is_revealed(0));

        let err = attempt.submit(&questions).unwrap_err();
        assert_eq!(err, AttemptError::Incomplete { unanswered: vec![1] });

        attempt.answer(&questions, 1, "Lyon").unwrap();
        let score = attempt.submit(&questions).unwrap();
        assert_eq!(
            score,
            QuizScore {
                correct: 1,
                answered: 2,
                total: 2
            }
        );
        assert!(attempt.is_revealed(1));
        assert_eq!(
            attempt.answer(&questions, 1, "Paris").unwrap_err(),
            AttemptError::AlreadySubmitted
        );
        assert_eq!(attempt.submit(&questions).unwrap_err(), AttemptError::AlreadySubmitted);
    }

    #[test]
    fn score_counts_only_revealed_answers() {
        let questions = vec![two_plus_two(), capital()];
        let mut attempt = QuizAttempt::for_questions(&questions, QuizMode::Immediate);
        attempt.answer(&questions, 1, "Paris").unwrap();
        assert_eq!(
            attempt.score(&questions),
            QuizScore {
                correct: 1,
                answered: 1,
                total: 2
            }
        );
    }
}
