//! Course viewer state as a plain value plus one update function.
//!
//! `ViewState` holds the selected lesson, the module expanded in the
//! outline, the compact-menu flag, and the quiz attempt of the selected
//! lesson. Every change goes through [`ViewState::apply`], so a front end
//! only renders the state and forwards actions.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::curriculum::Course;
use crate::grading::{AttemptError, Grade, QuizAttempt, QuizMode, QuizScore};
use crate::model::{Lesson, LessonId, ModuleId};
use crate::progress::{CompletedSet, is_unlocked};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavError {
    #[error("lesson {0} is not part of this program")]
    UnknownLesson(LessonId),

    #[error("module {0} is not part of this program")]
    UnknownModule(ModuleId),

    #[error("lesson {0} is locked until the previous lesson is completed")]
    Locked(LessonId),

    #[error("no lesson is selected")]
    NoSelection,

    #[error(transparent)]
    Quiz(#[from] AttemptError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavAction {
    SelectLesson(LessonId),
    ToggleModule(ModuleId),
    Advance,
    Back,
    Answer { question: usize, option: String },
    SubmitQuiz,
    RetryQuiz,
    OpenMenu,
    CloseMenu,
}

/// What an action did, for the caller to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    Selected { lesson: LessonId, module: ModuleId },
    ModuleToggled { module: ModuleId, open: bool },
    /// `Advance` past the last lesson.
    EndOfProgram,
    /// `Back` from the first lesson.
    StartOfProgram,
    Answered { question: usize, grade: Option<Grade> },
    QuizSubmitted(QuizScore),
    QuizReset,
    MenuChanged { open: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    selected: Option<LessonId>,
    open_module: Option<ModuleId>,
    menu_open: bool,
    quiz_mode: QuizMode,
    quiz: QuizAttempt,
}

impl ViewState {
    /// Selects the first lesson of the first module and expands that module.
    #[must_use]
    pub fn initial(course: &Course, quiz_mode: QuizMode) -> Self {
        let mut state = Self {
            selected: None,
            open_module: None,
            menu_open: false,
            quiz_mode,
            quiz: QuizAttempt::new(0, quiz_mode),
        };

        if let Some(first) = course.sequence().first() {
            state.selected = Some(first.lesson_id);
            state.open_module = Some(first.module_id);
            if let Some(lesson) = course.lesson(first.lesson_id) {
                state.quiz = QuizAttempt::for_questions(lesson.quiz(), quiz_mode);
            }
        } else if let Some(module) = course.program().modules().first() {
            state.open_module = Some(module.id());
        }
        state
    }

    #[must_use]
    pub fn selected(&self) -> Option<LessonId> {
        self.selected
    }

    #[must_use]
    pub fn open_module(&self) -> Option<ModuleId> {
        self.open_module
    }

    #[must_use]
    pub fn is_module_open(&self, module_id: ModuleId) -> bool {
        self.open_module == Some(module_id)
    }

    #[must_use]
    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    #[must_use]
    pub fn quiz(&self) -> &QuizAttempt {
        &self.quiz
    }

    #[must_use]
    pub fn quiz_mode(&self) -> QuizMode {
        self.quiz_mode
    }

    #[must_use]
    pub fn selected_lesson<'c>(&self, course: &'c Course) -> Option<&'c Lesson> {
        self.selected.and_then(|id| course.lesson(id))
    }

    /// Switches quiz mode; the current lesson's attempt starts over.
    pub fn set_quiz_mode(&mut self, course: &Course, mode: QuizMode) {
        self.quiz_mode = mode;
        let questions = self.selected_lesson(course).map_or(0, |l| l.quiz().len());
        self.quiz = QuizAttempt::new(questions, mode);
    }

    /// Re-anchors the state after `previous` was reloaded as `course`.
    ///
    /// Keeps the selection if the lesson still exists, otherwise starts over
    /// from the first lesson. Answers are stored as option positions, so the
    /// quiz attempt survives only if the lesson's questions are unchanged.
    pub fn reconcile(&mut self, previous: &Course, course: &Course) {
        let Some(lesson) = self.selected_lesson(course) else {
            *self = Self::initial(course, self.quiz_mode);
            return;
        };

        let unchanged = self
            .selected_lesson(previous)
            .is_some_and(|old| old.quiz() == lesson.quiz());
        if !unchanged {
            self.quiz = QuizAttempt::for_questions(lesson.quiz(), self.quiz_mode);
        }
        if self
            .open_module
            .is_some_and(|m| course.module(m).is_none())
        {
            self.open_module = None;
        }
    }

    /// Applies one action.
    ///
    /// # Errors
    ///
    /// Returns `NavError` when the action refers to something outside the
    /// course, targets a locked lesson, or the quiz rejects the answer. The
    /// state is unchanged on error.
    pub fn apply(
        &mut self,
        course: &Course,
        completed: &CompletedSet,
        action: NavAction,
    ) -> Result<NavEvent, NavError> {
        debug!(?action, selected = ?self.selected, "navigation action");
        match action {
            NavAction::SelectLesson(lesson_id) => self.select(course, completed, lesson_id),
            NavAction::ToggleModule(module_id) => {
                if course.module(module_id).is_none() {
                    return Err(NavError::UnknownModule(module_id));
                }
                let open = !self.is_module_open(module_id);
                self.open_module = open.then_some(module_id);
                Ok(NavEvent::ModuleToggled {
                    module: module_id,
                    open,
                })
            }
            NavAction::Advance => {
                let current = self.selected.ok_or(NavError::NoSelection)?;
                match course.sequence().next_after(current) {
                    Some(next) => self.select(course, completed, next.lesson_id),
                    None => Ok(NavEvent::EndOfProgram),
                }
            }
            NavAction::Back => {
                let current = self.selected.ok_or(NavError::NoSelection)?;
                match course.sequence().previous_before(current) {
                    Some(prev) => self.select(course, completed, prev.lesson_id),
                    None => Ok(NavEvent::StartOfProgram),
                }
            }
            NavAction::Answer { question, option } => {
                let lesson = self.selected_lesson(course).ok_or(NavError::NoSelection)?;
                let grade = self.quiz.answer(lesson.quiz(), question, &option)?;
                Ok(NavEvent::Answered { question, grade })
            }
            NavAction::SubmitQuiz => {
                let lesson = self.selected_lesson(course).ok_or(NavError::NoSelection)?;
                let score = self.quiz.submit(lesson.quiz())?;
                Ok(NavEvent::QuizSubmitted(score))
            }
            NavAction::RetryQuiz => {
                self.quiz.retry();
                Ok(NavEvent::QuizReset)
            }
            NavAction::OpenMenu => {
                self.menu_open = true;
                Ok(NavEvent::MenuChanged { open: true })
            }
            NavAction::CloseMenu => {
                self.menu_open = false;
                Ok(NavEvent::MenuChanged { open: false })
            }
        }
    }

    fn select(
        &mut self,
        course: &Course,
        completed: &CompletedSet,
        lesson_id: LessonId,
    ) -> Result<NavEvent, NavError> {
        let lesson = course
            .lesson(lesson_id)
            .ok_or(NavError::UnknownLesson(lesson_id))?;
        if !is_unlocked(course.sequence(), completed, lesson_id) {
            return Err(NavError::Locked(lesson_id));
        }

        self.selected = Some(lesson_id);
        self.open_module = Some(lesson.module_id());
        self.menu_open = false;
        self.quiz = QuizAttempt::for_questions(lesson.quiz(), self.quiz_mode);

        Ok(NavEvent::Selected {
            lesson: lesson_id,
            module: lesson.module_id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DisplayColor, Module, Program, ProgramId, QuizQuestion};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn quiz() -> Vec<QuizQuestion> {
        vec![
            QuizQuestion::new("2+2?", vec!["3".into(), "4".into(), "5".into()], "4").unwrap(),
        ]
    }

    fn lesson(id: u64, module: u64, with_quiz: bool) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            ModuleId::new(module),
            format!("Lesson {id}"),
            None,
            Vec::new(),
            if with_quiz { quiz() } else { Vec::new() },
            fixed_now() + Duration::minutes(i64::try_from(id).unwrap()),
        )
        .unwrap()
    }

    fn module(id: u64, lessons: Vec<Lesson>) -> Module {
        Module::new(
            ModuleId::new(id),
            ProgramId::new(1),
            format!("Module {id}"),
            DisplayColor::default(),
            fixed_now() + Duration::minutes(i64::try_from(id).unwrap()),
        )
        .unwrap()
        .with_lessons(lessons)
        .unwrap()
    }

    /// Module 1: lessons 1 (quiz), 2. Module 2: lesson 3.
    fn course() -> Course {
        let program = Program::new(
            ProgramId::new(1),
            "Mathématiques 3e",
            None,
            DisplayColor::default(),
            fixed_now(),
        )
        .unwrap()
        .with_modules(vec![
            module(1, vec![lesson(1, 1, true), lesson(2, 1, false)]),
            module(2, vec![lesson(3, 2, true)]),
        ])
        .unwrap();
        Course::new(program)
    }

    fn all_done() -> CompletedSet {
        let mut done = CompletedSet::new();
        for id in 1..=3 {
            done.insert(LessonId::new(id));
        }
        done
    }

    #[test]
    fn initial_selects_first_lesson_and_opens_its_module() {
        let state = ViewState::initial(&course(), QuizMode::Immediate);
        assert_eq!(state.selected(), Some(LessonId::new(1)));
        assert_eq!(state.open_module(), Some(ModuleId::new(1)));
        assert_eq!(state.quiz().len(), 1);
    }

    #[test]
    fn initial_on_empty_course_selects_nothing() {
        let program = Program::new(
            ProgramId::new(1),
            "Vide",
            None,
            DisplayColor::default(),
            fixed_now(),
        )
        .unwrap();
        let state = ViewState::initial(&Course::new(program), QuizMode::Immediate);
        assert_eq!(state.selected(), None);
        assert_eq!(state.open_module(), None);
    }

    #[test]
    fn selecting_a_lesson_in_another_module_opens_that_module() {
        let course = course();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        state.apply(&course, &all_done(), NavAction::OpenMenu).unwrap();

        let event = state
            .apply(&course, &all_done(), NavAction::SelectLesson(LessonId::new(3)))
            .unwrap();
        assert_eq!(
            event,
            NavEvent::Selected {
                lesson: LessonId::new(3),
                module: ModuleId::new(2)
            }
        );
        assert_eq!(state.open_module(), Some(ModuleId::new(2)));
        assert!(!state.is_menu_open());
    }

    #[test]
    fn locked_lessons_cannot_be_selected() {
        let course = course();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        let before = state.clone();
        let err = state
            .apply(&course, &CompletedSet::new(), NavAction::SelectLesson(LessonId::new(2)))
            .unwrap_err();
        assert_eq!(err, NavError::Locked(LessonId::new(2)));
        assert_eq!(state, before);
    }

    #[test]
    fn toggle_module_is_independent_of_selection() {
        let course = course();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        let done = CompletedSet::new();

        let event = state
            .apply(&course, &done, NavAction::ToggleModule(ModuleId::new(1)))
            .unwrap();
        assert_eq!(
            event,
            NavEvent::ModuleToggled {
                module: ModuleId::new(1),
                open: false
            }
        );
        assert_eq!(state.open_module(), None);
        assert_eq!(state.selected(), Some(LessonId::new(1)));

        state
            .apply(&course, &done, NavAction::ToggleModule(ModuleId::new(2)))
            .unwrap();
        assert!(state.is_module_open(ModuleId::new(2)));
        assert!(matches!(
            state.apply(&course, &done, NavAction::ToggleModule(ModuleId::new(42))),
            Err(NavError::UnknownModule(_))
        ));
    }

    #[test]
    fn advance_walks_the_sequence_then_reports_end() {
        let course = course();
        let done = all_done();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);

        state.apply(&course, &done, NavAction::Advance).unwrap();
        assert_eq!(state.selected(), Some(LessonId::new(2)));
        state.apply(&course, &done, NavAction::Advance).unwrap();
        assert_eq!(state.selected(), Some(LessonId::new(3)));
        assert_eq!(
            state.apply(&course, &done, NavAction::Advance).unwrap(),
            NavEvent::EndOfProgram
        );
        assert_eq!(state.selected(), Some(LessonId::new(3)));
    }

    #[test]
    fn advance_respects_unlock_gating() {
        let course = course();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        let err = state
            .apply(&course, &CompletedSet::new(), NavAction::Advance)
            .unwrap_err();
        assert_eq!(err, NavError::Locked(LessonId::new(2)));
    }

    #[test]
    fn back_from_first_lesson_reports_start() {
        let course = course();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        assert_eq!(
            state.apply(&course, &all_done(), NavAction::Back).unwrap(),
            NavEvent::StartOfProgram
        );
    }

    #[test]
    fn leaving_and_returning_resets_quiz_but_keeps_progress() {
        let course = course();
        let mut done = CompletedSet::new();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);

        state
            .apply(
                &course,
                &done,
                NavAction::Answer {
                    question: 0,
                    option: "4".into(),
                },
            )
            .unwrap();
        assert!(state.quiz().is_complete());
        done.insert(LessonId::new(1));

        state
            .apply(&course, &done, NavAction::SelectLesson(LessonId::new(2)))
            .unwrap();
        state
            .apply(&course, &done, NavAction::SelectLesson(LessonId::new(1)))
            .unwrap();

        assert!(!state.quiz().is_complete());
        assert!(done.contains(LessonId::new(1)));
    }

    #[test]
    fn answer_twice_is_rejected_until_retry() {
        let course = course();
        let done = CompletedSet::new();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        let answer = |option: &str| NavAction::Answer {
            question: 0,
            option: option.into(),
        };

        let event = state.apply(&course, &done, answer("3")).unwrap();
        assert_eq!(
            event,
            NavEvent::Answered {
                question: 0,
                grade: Some(Grade { is_correct: false })
            }
        );
        assert!(matches!(
            state.apply(&course, &done, answer("4")),
            Err(NavError::Quiz(AttemptError::AlreadyAnswered { index: 0 }))
        ));

        state.apply(&course, &done, NavAction::RetryQuiz).unwrap();
        state.apply(&course, &done, answer("4")).unwrap();
    }

    #[test]
    fn deferred_mode_submits_whole_quiz() {
        let course = course();
        let done = CompletedSet::new();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        state.set_quiz_mode(&course, QuizMode::Deferred);

        assert!(matches!(
            state.apply(&course, &done, NavAction::SubmitQuiz),
            Err(NavError::Quiz(AttemptError::Incomplete { .. }))
        ));
        state
            .apply(
                &course,
                &done,
                NavAction::Answer {
                    question: 0,
                    option: "4".into(),
                },
            )
            .unwrap();
        let event = state.apply(&course, &done, NavAction::SubmitQuiz).unwrap();
        assert!(matches!(event, NavEvent::QuizSubmitted(score) if score.correct == 1));
    }

    #[test]
    fn state_round_trips_through_json() {
        let course = course();
        let state = ViewState::initial(&course, QuizMode::Deferred);
        let json = serde_json::to_string(&state).unwrap();
        let back: ViewState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn reconcile_falls_back_to_first_lesson() {
        let course = course();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        state
            .apply(&course, &all_done(), NavAction::SelectLesson(LessonId::new(3)))
            .unwrap();

        let smaller = Course::new(
            Program::new(
                ProgramId::new(1),
                "Mathématiques 3e",
                None,
                DisplayColor::default(),
                fixed_now(),
            )
            .unwrap()
            .with_modules(vec![module(1, vec![lesson(1, 1, true)])])
            .unwrap(),
        );
        state.reconcile(&course, &smaller);
        assert_eq!(state.selected(), Some(LessonId::new(1)));
        assert_eq!(state.open_module(), Some(ModuleId::new(1)));
    }

    #[test]
    fn reconcile_resets_quiz_when_options_move() {
        let course = course();
        let mut state = ViewState::initial(&course, QuizMode::Immediate);
        state
            .apply(
                &course,
                &CompletedSet::new(),
                NavAction::Answer {
                    question: 0,
                    option: "3".into(),
                },
            )
            .unwrap();

        state.reconcile(&course, &course);
        assert_eq!(state.quiz().selected(0), Some(0));

        let reordered = Lesson::new(
            LessonId::new(1),
            ModuleId::new(1),
            "Lesson 1",
            None,
            Vec::new(),
            vec![QuizQuestion::new("2+2?", vec!["4".into(), "3".into(), "5".into()], "4").unwrap()],
            fixed_now() + Duration::minutes(1),
        )
        .unwrap();
        let reloaded = Course::new(
            Program::new(
                ProgramId::new(1),
                "Mathématiques 3e",
                None,
                DisplayColor::default(),
                fixed_now(),
            )
            .unwrap()
            .with_modules(vec![
                module(1, vec![reordered, lesson(2, 1, false)]),
                module(2, vec![lesson(3, 2, true)]),
            ])
            .unwrap(),
        );
        state.reconcile(&course, &reloaded);
        assert_eq!(state.selected(), Some(LessonId::new(1)));
        assert_eq!(state.quiz().selected(0), None);
        assert!(!state.quiz().is_revealed(0));
    }
}

