use std::fmt;

use chrono::{DateTime, Duration, Utc};
use koda_core::model::{
    DisplayColor, Lesson, LessonId, Module, ModuleId, Program, ProgramId, QuizQuestion,
};
use storage::repository::{NewLessonRecord, NewModuleRecord, NewProgramRecord, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
    force: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("KODA_DB_URL").unwrap_or_else(|_| "sqlite://koda.sqlite3".into());
        let mut now: Option<DateTime<Utc>> = None;
        let mut force = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--force" => force = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, now, force })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://koda.sqlite3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  --force                   Seed even if programs already exist");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  KODA_DB_URL");
}

//
// ─── DEMO CATALOG ──────────────────────────────────────────────────────────────
//

struct LessonSeed {
    title: &'static str,
    video_url: &'static str,
    exercises: &'static [&'static str],
    quiz: &'static [(&'static str, &'static [&'static str], &'static str)],
}

struct ModuleSeed {
    title: &'static str,
    color: &'static str,
    lessons: &'static [LessonSeed],
}

struct ProgramSeed {
    title: &'static str,
    description: &'static str,
    color: &'static str,
    modules: &'static [ModuleSeed],
}

const CATALOG: &[ProgramSeed] = &[
    ProgramSeed {
        title: "Mathématiques 3ᵉ",
        description: "Nombres, calculs, géométrie, fonctions...",
        color: "#667eea",
        modules: &[
            ModuleSeed {
                title: "Nombres et calculs",
                color: "#6366f1",
                lessons: &[
                    LessonSeed {
                        title: "Les fractions",
                        video_url: "https://www.youtube.com/embed/6Zg2cXfWJk4",
                        exercises: &["Calcule la somme de 1/3 + 2/3"],
                        quiz: &[(
                            "Quelle est la fraction équivalente à 1/2 ?",
                            &["2/4", "1/3", "3/4"],
                            "2/4",
                        )],
                    },
                    LessonSeed {
                        title: "Les décimaux",
                        video_url: "https://www.youtube.com/embed/4aZf9vGJ6qw",
                        exercises: &["Convertis 0.75 en fraction"],
                        quiz: &[(
                            "Quel est le résultat de 0.5 + 0.25 ?",
                            &["0.75", "0.52", "0.25"],
                            "0.75",
                        )],
                    },
                ],
            },
            ModuleSeed {
                title: "Géométrie plane",
                color: "#22c55e",
                lessons: &[
                    LessonSeed {
                        title: "Angles",
                        video_url: "",
                        exercises: &["Mesure des angles."],
                        quiz: &[],
                    },
                    LessonSeed {
                        title: "Triangles",
                        video_url: "",
                        exercises: &["Identifier les triangles."],
                        quiz: &[],
                    },
                ],
            },
        ],
    },
    ProgramSeed {
        title: "Français 3ᵉ",
        description: "Grammaire, conjugaison, rédaction, lecture...",
        color: "#f6d365",
        modules: &[ModuleSeed {
            title: "Grammaire avancée",
            color: "#eab308",
            lessons: &[
                LessonSeed {
                    title: "Les temps verbaux",
                    video_url: "",
                    exercises: &["Exercice sur les temps verbaux."],
                    quiz: &[],
                },
                LessonSeed {
                    title: "Les accords",
                    video_url: "",
                    exercises: &["Exercice sur les accords."],
                    quiz: &[],
                },
            ],
        }],
    },
];

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

async fn seed_program(
    storage: &Storage,
    seed: &ProgramSeed,
    now: &mut DateTime<Utc>,
) -> Result<(ProgramId, usize), Box<dyn std::error::Error>> {
    // Each row gets its own timestamp so creation order is unambiguous.
    let mut tick = || {
        *now += Duration::seconds(1);
        *now
    };

    let draft = Program::new(
        ProgramId::new(1),
        seed.title,
        Some(seed.description.to_owned()),
        DisplayColor::parse(seed.color)?,
        tick(),
    )?;
    let program_id = storage
        .programs
        .insert_new_program(NewProgramRecord::from_program(&draft))
        .await?;

    let mut lessons = 0;
    for module_seed in seed.modules {
        let draft = Module::new(
            ModuleId::new(1),
            program_id,
            module_seed.title,
            DisplayColor::parse(module_seed.color)?,
            tick(),
        )?;
        let module_id = storage
            .modules
            .insert_new_module(NewModuleRecord::from_module(&draft))
            .await?;

        for lesson_seed in module_seed.lessons {
            let quiz = lesson_seed
                .quiz
                .iter()
                .map(|(question, options, answer)| {
                    QuizQuestion::new(*question, to_strings(options), *answer)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let draft = Lesson::new(
                LessonId::new(1),
                module_id,
                lesson_seed.title,
                Some(lesson_seed.video_url.to_owned()),
                to_strings(lesson_seed.exercises),
                quiz,
                tick(),
            )?;
            storage
                .lessons
                .insert_new_lesson(NewLessonRecord::from_lesson(&draft))
                .await?;
            lessons += 1;
        }
    }

    Ok((program_id, lessons))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let mut now = args.now.unwrap_or_else(Utc::now);

    let existing = storage.programs.list_programs().await?;
    if !existing.is_empty() && !args.force {
        println!(
            "{} already holds {} program(s); pass --force to seed again",
            args.db_url,
            existing.len()
        );
        return Ok(());
    }

    for seed in CATALOG {
        let (program_id, lessons) = seed_program(&storage, seed, &mut now).await?;
        info!(program = %program_id, lessons, title = seed.title, "seeded program");
        println!("Seeded program {program_id} \"{}\" with {lessons} lessons", seed.title);
    }
    println!("Seed data written to {}", args.db_url);

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
