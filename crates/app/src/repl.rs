//! Line-oriented study loop over stdin.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use koda_core::grading::{OptionMark, QuizMode};
use koda_core::model::{LessonId, ModuleId};
use koda_core::navigation::NavEvent;
use services::{CourseLoader, LessonView, Outline, StudyError, StudySession};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Outline,
    Show,
    Open(LessonId),
    Toggle(ModuleId),
    /// Question index is zero-based here; the prompt is one-based.
    Answer { question: usize, option: String },
    Submit,
    Retry,
    Complete,
    Next,
    Back,
    Mode(QuizMode),
    Restart,
    Reload,
    Help,
    Quit,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match word {
            "list" | "ls" => Ok(Self::Outline),
            "show" | "" => Ok(Self::Show),
            "open" => parse_id(rest).map(|id| Self::Open(LessonId::new(id))),
            "toggle" => parse_id(rest).map(|id| Self::Toggle(ModuleId::new(id))),
            "answer" | "a" => {
                let (number, option) = rest
                    .split_once(' ')
                    .ok_or_else(|| "usage: answer <question#> <option>".to_string())?;
                let number = parse_id(number)?;
                let question = usize::try_from(number)
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .ok_or_else(|| format!("no question {number}"))?;
                Ok(Self::Answer {
                    question,
                    option: option.trim().to_string(),
                })
            }
            "submit" => Ok(Self::Submit),
            "retry" => Ok(Self::Retry),
            "complete" | "done" => Ok(Self::Complete),
            "next" | "n" => Ok(Self::Next),
            "back" | "b" => Ok(Self::Back),
            "mode" => match rest {
                "immediate" => Ok(Self::Mode(QuizMode::Immediate)),
                "deferred" | "aggregate" => Ok(Self::Mode(QuizMode::Deferred)),
                other => Err(format!("unknown quiz mode: {other:?}")),
            },
            "restart" => Ok(Self::Restart),
            "reload" => Ok(Self::Reload),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

fn parse_id(raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| format!("expected a number, got {raw:?}"))
}

const HELP: &str = "\
commands:
  list                     show the program outline
  show                     show the current lesson
  open <lesson_id>         open an unlocked lesson
  toggle <module_id>       expand or collapse a module
  answer <n> <option>      answer question n of the current quiz
  submit | retry           submit or reset the quiz
  complete                 mark the lesson done and go to the next one
  next | back              move through the program
  mode immediate|deferred  switch quiz feedback
  restart                  clear progress for this program
  reload                   reload the program from storage
  quit";

/// Runs commands until `quit` or end of input.
///
/// # Errors
///
/// Returns I/O errors from the terminal streams.
pub async fn run(
    session: &mut StudySession,
    loader: &CourseLoader,
    input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "{}", render_outline(&session.outline()))?;
    show_lesson(session, out)?;
    writeln!(out, "type `help` for commands")?;

    for line in input.lines() {
        let line = line?;
        let command = match ReplCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };

        let result = match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => {
                writeln!(out, "{HELP}")?;
                Ok(())
            }
            ReplCommand::Outline => {
                writeln!(out, "{}", render_outline(&session.outline()))?;
                Ok(())
            }
            ReplCommand::Show => show_lesson(session, out),
            ReplCommand::Reload => {
                match loader.load(session.course().program().id()).await {
                    Ok(course) => {
                        session.replace_course(course);
                        writeln!(out, "{}", render_outline(&session.outline()))?;
                    }
                    Err(err) => {
                        warn!(error = %err, "reload failed");
                        writeln!(out, "could not reload: {err}")?;
                    }
                }
                Ok(())
            }
            other => dispatch(session, other, out),
        };
        result?;
    }
    Ok(())
}

fn dispatch(
    session: &mut StudySession,
    command: ReplCommand,
    out: &mut impl Write,
) -> io::Result<()> {
    let outcome: Result<(), StudyError> = match command {
        ReplCommand::Open(id) => session.select_lesson(id).map(drop),
        ReplCommand::Toggle(id) => session.toggle_module(id).map(|event| {
            if let NavEvent::ModuleToggled { open, .. } = event {
                let _ = writeln!(out, "module {id} {}", if open { "expanded" } else { "collapsed" });
            }
        }),
        ReplCommand::Answer { question, option } => {
            session.answer(question, &option).map(|grade| match grade {
                Some(g) if g.is_correct => {
                    let _ = writeln!(out, "correct");
                }
                Some(_) => {
                    let _ = writeln!(out, "incorrect");
                }
                None => {
                    let _ = writeln!(out, "answer recorded");
                }
            })
        }
        ReplCommand::Submit => session.submit_quiz().map(|score| {
            let _ = writeln!(out, "score: {}/{}", score.correct, score.total);
        }),
        ReplCommand::Retry => {
            session.retry_quiz();
            Ok(())
        }
        ReplCommand::Complete => session.complete_and_advance().map(|event| report(event, out)),
        ReplCommand::Next => session.advance().map(|event| report(event, out)),
        ReplCommand::Back => session.back().map(|event| report(event, out)),
        ReplCommand::Mode(mode) => {
            session.set_quiz_mode(mode);
            Ok(())
        }
        ReplCommand::Restart => {
            session.restart_program();
            Ok(())
        }
        ReplCommand::Outline
        | ReplCommand::Show
        | ReplCommand::Reload
        | ReplCommand::Help
        | ReplCommand::Quit => Ok(()),
    };

    match outcome {
        Ok(()) => show_lesson(session, out),
        Err(err) => writeln!(out, "{err}"),
    }
}

fn report(event: NavEvent, out: &mut impl Write) {
    let message = match event {
        NavEvent::EndOfProgram => "end of program",
        NavEvent::StartOfProgram => "already at the first lesson",
        _ => return,
    };
    let _ = writeln!(out, "{message}");
}

fn show_lesson(session: &StudySession, out: &mut impl Write) -> io::Result<()> {
    match session.lesson_view() {
        Some(view) => writeln!(out, "{}", render_lesson(&view)),
        None => writeln!(out, "this program has no lessons yet"),
    }
}

pub fn render_outline(outline: &Outline) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "{} [{}/{} lessons, {}%]",
        outline.title,
        outline.progress.completed,
        outline.progress.total,
        outline.progress.percent()
    );
    if let Some(description) = &outline.description {
        let _ = writeln!(text, "  {description}");
    }
    for module in &outline.modules {
        let fold = if module.open { '-' } else { '+' };
        let _ = writeln!(text, "{fold} [{}] {}", module.id, module.title);
        if !module.open {
            continue;
        }
        for lesson in &module.lessons {
            let cursor = if lesson.selected { '>' } else { ' ' };
            let state = if lesson.completed {
                "[x]"
            } else if lesson.unlocked {
                "[ ]"
            } else {
                "[-]"
            };
            let _ = writeln!(text, "  {cursor} {state} {:>3} {}", lesson.id, lesson.title);
        }
    }
    text.trim_end().to_string()
}

pub fn render_lesson(view: &LessonView) -> String {
    let mut text = String::new();
    let done = if view.completed { " (done)" } else { "" };
    let _ = writeln!(text, "== {} / {}{done}", view.module_title, view.title);
    match (&view.player_src, view.notice) {
        (Some(src), _) => {
            let _ = writeln!(text, "video: {src}");
        }
        (None, Some(notice)) => {
            let _ = writeln!(text, "video: {notice}");
        }
        (None, None) => {}
    }

    if !view.exercises.is_empty() {
        let _ = writeln!(text, "exercises:");
        for (n, exercise) in view.exercises.iter().enumerate() {
            let _ = writeln!(text, "  {}. {exercise}", n + 1);
        }
    }

    for question in &view.questions {
        let _ = writeln!(text, "Q{}. {}", question.index + 1, question.question);
        for (idx, option) in question.options.iter().enumerate() {
            let picked = if question.selected == Some(idx) { '*' } else { ' ' };
            let mark = match option.mark {
                OptionMark::Correct => "  (correct)",
                OptionMark::Incorrect => "  (wrong)",
                OptionMark::Dimmed | OptionMark::Unmarked => "",
            };
            let _ = writeln!(text, "   {picked} {}{mark}", option.text);
        }
    }
    if let Some(score) = view.score {
        let _ = writeln!(text, "score: {}/{}", score.correct, score.total);
    }

    let mut moves = Vec::new();
    if view.has_previous {
        moves.push("back");
    }
    if view.has_next {
        moves.push("next");
    }
    if !moves.is_empty() {
        let _ = write!(text, "[{}]", moves.join(" | "));
    }
    text.trim_end().to_string()
}
