use std::fmt;
use std::io;
use std::path::PathBuf;

use koda_core::grading::QuizMode;
use koda_core::model::{LearnerId, ProgramId};
use services::{AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod repl;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidProgramId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLearner { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidProgramId { raw } => write!(f, "invalid --program value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLearner { raw } => write!(f, "invalid --learner value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug)]
struct Args {
    db_url: String,
    progress_dir: PathBuf,
    learner: LearnerId,
    program_id: Option<ProgramId>,
    quiz_mode: QuizMode,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- study   [options]");
    eprintln!("  cargo run -p app -- outline [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         default: sqlite://koda.sqlite3");
    eprintln!("  --progress-dir <path>     default: .koda-progress");
    eprintln!("  --learner <name>          default: local");
    eprintln!("  --program <id>            default: the oldest program");
    eprintln!("  --aggregate-quiz          reveal quiz answers only on submit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  KODA_DB_URL, KODA_PROGRESS_DIR, KODA_LEARNER, KODA_PROGRAM_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Study,
    Outline,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "study" => Some(Self::Study),
            "outline" => Some(Self::Outline),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("KODA_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite://koda.sqlite3".into()), normalize_sqlite_url);
        let mut progress_dir = std::env::var("KODA_PROGRESS_DIR")
            .map_or_else(|_| PathBuf::from(".koda-progress"), PathBuf::from);
        let mut learner_raw = std::env::var("KODA_LEARNER").unwrap_or_else(|_| "local".into());
        let mut program_id = std::env::var("KODA_PROGRAM_ID")
            .ok()
            .and_then(|value| value.parse::<ProgramId>().ok());
        let mut quiz_mode = QuizMode::Immediate;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--progress-dir" => {
                    progress_dir = PathBuf::from(require_value(args, "--progress-dir")?);
                }
                "--learner" => {
                    learner_raw = require_value(args, "--learner")?;
                }
                "--program" => {
                    let value = require_value(args, "--program")?;
                    let parsed = value
                        .parse::<ProgramId>()
                        .map_err(|_| ArgsError::InvalidProgramId { raw: value.clone() })?;
                    program_id = Some(parsed);
                }
                "--aggregate-quiz" => quiz_mode = QuizMode::Deferred,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let learner = LearnerId::parse(learner_raw.clone())
            .ok_or(ArgsError::InvalidLearner { raw: learner_raw })?;

        Ok(Self {
            db_url,
            progress_dir,
            learner,
            program_id,
            quiz_mode,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Study,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Study,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    let services =
        AppServices::new_sqlite(&parsed.db_url, &parsed.progress_dir, Clock::system()).await?;

    let Some(program_id) = services.resolve_program(parsed.program_id).await? else {
        eprintln!("no programs yet; run `cargo run -p storage --bin seed` first");
        return Ok(());
    };
    info!(program = %program_id, learner = %parsed.learner, ?cmd, "opening program");

    let mut session = services
        .start_study(program_id, parsed.learner, parsed.quiz_mode)
        .await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Outline => {
            use std::io::Write as _;
            writeln!(out, "{}", repl::render_outline(&session.outline()))?;
        }
        Command::Study => {
            let stdin = io::stdin();
            repl::run(&mut session, services.course_loader(), stdin.lock(), &mut out).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
