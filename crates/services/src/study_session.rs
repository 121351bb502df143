//! One learner studying one program.
//!
//! `StudySession` owns the loaded course, the navigation state and the
//! progress tracker, and renders plain view structs for a front end.

use std::sync::Arc;

use koda_core::curriculum::Course;
use koda_core::grading::{Grade, OptionMark, QuizMode, QuizScore};
use koda_core::model::{DisplayColor, LearnerId, LessonId, ModuleId, ProgramId};
use koda_core::navigation::{NavAction, NavError, NavEvent, ViewState};
use koda_core::progress::{ProgressKey, ProgressSummary};
use koda_core::video::{self, EmbedKind, EmbedOptions};
use storage::local::ProgressStore;
use tracing::info;

use crate::error::StudyError;
use crate::progress_tracker::ProgressTracker;

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineLesson {
    pub id: LessonId,
    pub title: String,
    pub selected: bool,
    pub completed: bool,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineModule {
    pub id: ModuleId,
    pub title: String,
    pub color: DisplayColor,
    pub open: bool,
    pub lessons: Vec<OutlineLesson>,
}

/// Sidebar content: every module with its lessons and their flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub program_id: ProgramId,
    pub title: String,
    pub description: Option<String>,
    pub color: DisplayColor,
    pub menu_open: bool,
    pub modules: Vec<OutlineModule>,
    pub progress: ProgressSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub text: String,
    pub mark: OptionMark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub index: usize,
    pub question: String,
    pub options: Vec<OptionView>,
    pub selected: Option<usize>,
    pub revealed: bool,
}

/// Main pane content for the selected lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonView {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub module_title: String,
    pub video: EmbedKind,
    pub player_src: Option<String>,
    /// Shown in place of the player when there is nothing to play.
    pub notice: Option<&'static str>,
    pub exercises: Vec<String>,
    pub questions: Vec<QuestionView>,
    pub quiz_mode: QuizMode,
    /// Present once the quiz result may be shown.
    pub score: Option<QuizScore>,
    pub completed: bool,
    pub has_previous: bool,
    pub has_next: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

pub struct StudySession {
    course: Course,
    view: ViewState,
    progress: ProgressTracker,
    embed: EmbedOptions,
}

impl StudySession {
    #[must_use]
    pub fn new(course: Course, progress: ProgressTracker, quiz_mode: QuizMode) -> Self {
        let view = ViewState::initial(&course, quiz_mode);
        Self {
            course,
            view,
            progress,
            embed: EmbedOptions::default(),
        }
    }

    /// Opens a session with progress read from `store`.
    #[must_use]
    pub fn open(
        course: Course,
        store: Arc<dyn ProgressStore>,
        learner: LearnerId,
        quiz_mode: QuizMode,
    ) -> Self {
        let key = ProgressKey::new(course.program().id(), learner);
        let progress = ProgressTracker::load(store, key, course.sequence().clone());
        Self::new(course, progress, quiz_mode)
    }

    #[must_use]
    pub fn with_embed_options(mut self, embed: EmbedOptions) -> Self {
        self.embed = embed;
        self
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn progress(&self) -> ProgressSummary {
        self.progress.summary()
    }

    fn apply(&mut self, action: NavAction) -> Result<NavEvent, StudyError> {
        let event = self
            .view
            .apply(&self.course, self.progress.completed(), action)?;
        Ok(event)
    }

    /// # Errors
    ///
    /// `StudyError::Nav` for unknown or locked lessons.
    pub fn select_lesson(&mut self, lesson_id: LessonId) -> Result<NavEvent, StudyError> {
        self.apply(NavAction::SelectLesson(lesson_id))
    }

    /// # Errors
    ///
    /// `StudyError::Nav` for modules outside the program.
    pub fn toggle_module(&mut self, module_id: ModuleId) -> Result<NavEvent, StudyError> {
        self.apply(NavAction::ToggleModule(module_id))
    }

    /// Moves to the next lesson, or reports `NavEvent::EndOfProgram`.
    ///
    /// # Errors
    ///
    /// `StudyError::Nav` when the next lesson is still locked.
    pub fn advance(&mut self) -> Result<NavEvent, StudyError> {
        self.apply(NavAction::Advance)
    }

    /// # Errors
    ///
    /// `StudyError::Nav` when nothing is selected.
    pub fn back(&mut self) -> Result<NavEvent, StudyError> {
        self.apply(NavAction::Back)
    }

    pub fn set_menu_open(&mut self, open: bool) {
        let action = if open {
            NavAction::OpenMenu
        } else {
            NavAction::CloseMenu
        };
        // Menu actions never fail.
        let _ = self.apply(action);
    }

    /// Answers a question of the selected lesson's quiz.
    ///
    /// # Errors
    ///
    /// `StudyError::Nav` wrapping the quiz rejection.
    pub fn answer(&mut self, question: usize, option: &str) -> Result<Option<Grade>, StudyError> {
        match self.apply(NavAction::Answer {
            question,
            option: option.to_owned(),
        })? {
            NavEvent::Answered { grade, .. } => Ok(grade),
            _ => Ok(None),
        }
    }

    /// # Errors
    ///
    /// `StudyError::Nav` if questions are unanswered or the quiz was already submitted.
    pub fn submit_quiz(&mut self) -> Result<QuizScore, StudyError> {
        match self.apply(NavAction::SubmitQuiz)? {
            NavEvent::QuizSubmitted(score) => Ok(score),
            _ => Err(NavError::NoSelection.into()),
        }
    }

    pub fn retry_quiz(&mut self) {
        let _ = self.apply(NavAction::RetryQuiz);
    }

    pub fn set_quiz_mode(&mut self, mode: QuizMode) {
        self.view.set_quiz_mode(&self.course, mode);
    }

    /// Marks the selected lesson complete; returns `true` if it was new.
    ///
    /// # Errors
    ///
    /// `StudyError::Nav` when nothing is selected.
    pub fn mark_complete(&mut self) -> Result<bool, StudyError> {
        let lesson_id = self.view.selected().ok_or(NavError::NoSelection)?;
        let added = self.progress.mark_complete(lesson_id)?;
        if added {
            let summary = self.progress.summary();
            info!(
                lesson = %lesson_id,
                completed = summary.completed,
                total = summary.total,
                "lesson completed"
            );
        }
        Ok(added)
    }

    /// Marks the selected lesson complete, then moves on.
    ///
    /// # Errors
    ///
    /// Same as [`StudySession::mark_complete`].
    pub fn complete_and_advance(&mut self) -> Result<NavEvent, StudyError> {
        self.mark_complete()?;
        self.advance()
    }

    /// Clears this program's progress and returns to the first lesson.
    pub fn restart_program(&mut self) {
        self.progress.reset();
        self.view = ViewState::initial(&self.course, self.view.quiz_mode());
        info!(program = %self.course.program().id(), "program restarted");
    }

    /// Swaps in a freshly loaded version of the same program.
    pub fn replace_course(&mut self, course: Course) {
        self.progress.set_sequence(course.sequence().clone());
        let previous = std::mem::replace(&mut self.course, course);
        self.view.reconcile(&previous, &self.course);
    }

    #[must_use]
    pub fn outline(&self) -> Outline {
        let program = self.course.program();
        let selected = self.view.selected();
        let modules = program
            .modules()
            .iter()
            .map(|module| OutlineModule {
                id: module.id(),
                title: module.title().to_owned(),
                color: module.color().clone(),
                open: self.view.is_module_open(module.id()),
                lessons: module
                    .lessons()
                    .iter()
                    .map(|lesson| OutlineLesson {
                        id: lesson.id(),
                        title: lesson.title().to_owned(),
                        selected: selected == Some(lesson.id()),
                        completed: self.progress.is_completed(lesson.id()),
                        unlocked: self.progress.is_unlocked(lesson.id()),
                    })
                    .collect(),
            })
            .collect();

        Outline {
            program_id: program.id(),
            title: program.title().to_owned(),
            description: program.description().map(str::to_owned),
            color: program.color().clone(),
            menu_open: self.view.is_menu_open(),
            modules,
            progress: self.progress.summary(),
        }
    }

    /// The selected lesson, or `None` for a program without lessons.
    #[must_use]
    pub fn lesson_view(&self) -> Option<LessonView> {
        let lesson = self.view.selected_lesson(&self.course)?;
        let module_title = self
            .course
            .module(lesson.module_id())
            .map(|m| m.title().to_owned())
            .unwrap_or_default();
        let sequence = self.course.sequence();
        let attempt = self.view.quiz();
        let questions = lesson.quiz();

        let question_views = questions
            .iter()
            .enumerate()
            .map(|(index, question)| QuestionView {
                index,
                question: question.question().to_owned(),
                options: question
                    .options()
                    .iter()
                    .zip(attempt.marks(questions, index))
                    .map(|(text, mark)| OptionView {
                        text: text.clone(),
                        mark,
                    })
                    .collect(),
                selected: attempt.selected(index),
                revealed: attempt.is_revealed(index),
            })
            .collect();

        let show_score = !attempt.is_empty()
            && (attempt.is_submitted()
                || (attempt.mode() == QuizMode::Immediate && attempt.is_complete()));
        let video = video::resolve_opt(lesson.video_url());

        Some(LessonView {
            id: lesson.id(),
            module_id: lesson.module_id(),
            title: lesson.title().to_owned(),
            module_title,
            player_src: video.player_src(self.embed),
            notice: video.notice(),
            video,
            exercises: lesson.exercises().to_vec(),
            questions: question_views,
            quiz_mode: attempt.mode(),
            score: show_score.then(|| attempt.score(questions)),
            completed: self.progress.is_completed(lesson.id()),
            has_previous: sequence.previous_before(lesson.id()).is_some(),
            has_next: sequence.next_after(lesson.id()).is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use koda_core::model::{Lesson, Module, Program, QuizQuestion};
    use koda_core::time::fixed_now;
    use storage::local::MemoryProgressStore;

    /// An empty `options` slice means no quiz.
    fn lesson(id: u64, module: u64, video: Option<&str>, options: &[&str]) -> Lesson {
        let questions = if options.is_empty() {
            Vec::new()
        } else {
            let options = options.iter().map(|o| (*o).to_owned()).collect();
            vec![QuizQuestion::new("2+2?", options, "4").unwrap()]
        };
        Lesson::new(
            LessonId::new(id),
            ModuleId::new(module),
            format!("Leçon {id}"),
            video.map(str::to_owned),
            vec![format!("Exercice {id}")],
            questions,
            fixed_now() + Duration::minutes(i64::try_from(id).unwrap()),
        )
        .unwrap()
    }

    fn course() -> Course {
        course_with_options(&["3", "4", "5"])
    }

    fn course_with_options(options: &[&str]) -> Course {
        let m1 = Module::new(
            ModuleId::new(1),
            ProgramId::new(1),
            "Nombres et calculs",
            DisplayColor::default(),
            fixed_now(),
        )
        .unwrap()
        .with_lessons(vec![
            lesson(1, 1, Some("https://youtu.be/dQw4w9WgXcQ"), options),
            lesson(2, 1, Some("https://vimeo.com/1"), &[]),
        ])
        .unwrap();
        let m2 = Module::new(
            ModuleId::new(2),
            ProgramId::new(1),
            "Géométrie plane",
            DisplayColor::default(),
            fixed_now() + Duration::minutes(1),
        )
        .unwrap()
        .with_lessons(vec![lesson(3, 2, None, &[])])
        .unwrap();
        let program = Program::new(
            ProgramId::new(1),
            "Mathématiques 3ᵉ",
            None,
            DisplayColor::default(),
            fixed_now(),
        )
        .unwrap()
        .with_modules(vec![m1, m2])
        .unwrap();
        Course::new(program)
    }

    fn session(store: &MemoryProgressStore) -> StudySession {
        StudySession::open(
            course(),
            Arc::new(store.clone()),
            LearnerId::parse("ada").unwrap(),
            QuizMode::Immediate,
        )
    }

    #[test]
    fn outline_flags_follow_progress() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);

        let outline = s.outline();
        assert!(outline.modules[0].open);
        assert!(!outline.modules[1].open);
        let first = &outline.modules[0].lessons[0];
        assert!(first.selected && first.unlocked && !first.completed);
        assert!(!outline.modules[0].lessons[1].unlocked);

        s.mark_complete().unwrap();
        let outline = s.outline();
        assert!(outline.modules[0].lessons[0].completed);
        assert!(outline.modules[0].lessons[1].unlocked);
        assert_eq!(outline.progress.completed, 1);
        assert_eq!(outline.progress.total, 3);
    }

    #[test]
    fn lesson_view_renders_video_and_quiz_marks() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);

        let view = s.lesson_view().unwrap();
        assert_eq!(
            view.player_src.as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0&modestbranding=1")
        );
        assert_eq!(view.module_title, "Nombres et calculs");
        assert!(view.questions[0].options.iter().all(|o| o.mark == OptionMark::Unmarked));
        assert!(view.has_next && !view.has_previous);
        assert_eq!(view.score, None);

        let grade = s.answer(0, "3").unwrap();
        assert_eq!(grade, Some(Grade { is_correct: false }));
        let marks: Vec<OptionMark> = s.lesson_view().unwrap().questions[0]
            .options
            .iter()
            .map(|o| o.mark)
            .collect();
        assert_eq!(
            marks,
            vec![OptionMark::Incorrect, OptionMark::Correct, OptionMark::Dimmed]
        );
        assert_eq!(s.lesson_view().unwrap().score.map(|sc| sc.correct), Some(0));
    }

    #[test]
    fn unsupported_video_shows_notice_instead_of_player() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        s.complete_and_advance().unwrap();

        let view = s.lesson_view().unwrap();
        assert_eq!(view.id, LessonId::new(2));
        assert_eq!(view.video, EmbedKind::Unsupported);
        assert_eq!(view.player_src, None);
        assert_eq!(view.notice, Some("Video format not supported"));
    }

    #[test]
    fn complete_and_advance_crosses_modules_and_ends() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);

        s.complete_and_advance().unwrap();
        let event = s.complete_and_advance().unwrap();
        assert_eq!(
            event,
            NavEvent::Selected {
                lesson: LessonId::new(3),
                module: ModuleId::new(2)
            }
        );
        assert!(s.outline().modules[1].open);
        assert_eq!(s.complete_and_advance().unwrap(), NavEvent::EndOfProgram);
        assert!(s.progress().is_finished());
    }

    #[test]
    fn locked_lesson_cannot_be_opened() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        assert!(matches!(
            s.select_lesson(LessonId::new(3)),
            Err(StudyError::Nav(NavError::Locked(_)))
        ));
        assert!(matches!(s.advance(), Err(StudyError::Nav(NavError::Locked(_)))));
    }

    #[test]
    fn progress_survives_a_new_session() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        s.mark_complete().unwrap();
        drop(s);

        let mut again = session(&store);
        assert_eq!(again.progress().completed, 1);
        again.select_lesson(LessonId::new(2)).unwrap();
    }

    #[test]
    fn restart_clears_progress_and_selection() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        s.complete_and_advance().unwrap();
        s.restart_program();

        assert_eq!(s.progress().completed, 0);
        assert_eq!(s.view_state().selected(), Some(LessonId::new(1)));
        assert_eq!(session(&store).progress().completed, 0);
    }

    #[test]
    fn replacing_course_keeps_valid_selection() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        s.complete_and_advance().unwrap();
        s.replace_course(course());
        assert_eq!(s.view_state().selected(), Some(LessonId::new(2)));
        assert_eq!(s.progress().completed, 1);
    }

    #[test]
    fn reloading_same_quiz_keeps_the_answer() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        s.answer(0, "3").unwrap();

        s.replace_course(course());
        assert_eq!(s.lesson_view().unwrap().questions[0].selected, Some(0));
    }

    #[test]
    fn reloading_with_reordered_options_resets_quiz() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        s.answer(0, "3").unwrap();
        assert!(s.lesson_view().unwrap().score.is_some());

        s.replace_course(course_with_options(&["4", "3", "5"]));
        let view = s.lesson_view().unwrap();
        let question = &view.questions[0];
        assert_eq!(question.selected, None);
        assert!(!question.revealed);
        assert!(question.options.iter().all(|o| o.mark == OptionMark::Unmarked));
        assert_eq!(view.score, None);

        assert_eq!(s.answer(0, "4").unwrap().map(|g| g.is_correct), Some(true));
    }

    #[test]
    fn switching_quiz_mode_restarts_current_attempt() {
        let store = MemoryProgressStore::new();
        let mut s = session(&store);
        s.answer(0, "4").unwrap();

        s.set_quiz_mode(QuizMode::Deferred);
        let view = s.lesson_view().unwrap();
        assert_eq!(view.quiz_mode, QuizMode::Deferred);
        assert_eq!(view.questions[0].selected, None);
        assert_eq!(s.answer(0, "4").unwrap(), None);
    }
}
