mod color;
mod ids;
mod lesson;
mod module;
mod program;
pub mod quiz;

pub use color::{ColorError, DEFAULT_COLOR, DisplayColor};
pub use ids::{LearnerId, LessonId, ModuleId, ParseIdError, ProgramId};

pub use lesson::{
    EXERCISE_DELIMITER, Lesson, LessonError, decode_legacy_exercises,
};
pub use module::{Module, ModuleError};
pub use program::{Program, ProgramError};
pub use quiz::{QuizError, QuizQuestion, decode_quiz_payload, parse_option_list};
