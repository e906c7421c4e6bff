use std::fmt;
use std::sync::Arc;

use exam_core::model::{Credentials, ExamId};
use services::{
    Clock, ContentService, ExamApi, ExamSession, HistoryService, HttpExamApi, NoPresentation,
    SessionDriver, SignalHub, SubmissionPipeline,
};
use storage::repository::Storage;
use tracing::info;

mod config;
mod telemetry;
mod terminal;

use config::AppConfig;

const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam run     [--db <sqlite_url>] [--exam-id <id>]");
    eprintln!("  exam token   <access_token> [--type <token_type>] [--db <sqlite_url>]");
    eprintln!("  exam logout  [--db <sqlite_url>]");
    eprintln!("  exam history [--db <sqlite_url>] [--limit <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {}", config::DEFAULT_DB_URL);
    eprintln!("  --exam-id 1");
    eprintln!("  --limit {DEFAULT_HISTORY_LIMIT}");
    eprintln!();
    eprintln!("Environment (.env is read if present):");
    eprintln!("  EXAM_DB_URL, EXAM_ID, EXAM_API_BASE_URL, EXAM_API_TIMEOUT_SECS,");
    eprintln!("  EXAM_LOG, EXAM_LOG_JSON, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Token,
    Logout,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "token" => Some(Self::Token),
            "logout" => Some(Self::Logout),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

/// Command-line overrides on top of `AppConfig`.
#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    exam_id: Option<ExamId>,
    limit: Option<u32>,
    token: Option<String>,
    token_type: Option<String>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--exam-id" if cmd == Command::Run => {
                    let value = require_value(args, "--exam-id")?;
                    let id = value
                        .parse::<ExamId>()
                        .map_err(|_| ArgsError::InvalidExamId { raw: value.clone() })?;
                    parsed.exam_id = Some(id);
                }
                "--limit" if cmd == Command::History => {
                    let value = require_value(args, "--limit")?;
                    let limit = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                    parsed.limit = Some(limit);
                }
                "--type" if cmd == Command::Token => {
                    parsed.token_type = Some(require_value(args, "--type")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if cmd == Command::Token && parsed.token.is_none() && !arg.starts_with("--") => {
                    parsed.token = Some(arg);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        if cmd == Command::Token && parsed.token.is_none() {
            return Err(ArgsError::MissingValue {
                flag: "<access_token>",
            });
        }
        Ok(parsed)
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means `run`.
    let (cmd, rest) = match argv.first().map(String::as_str) {
        None => (Command::Run, argv.as_slice()),
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => (Command::Run, argv.as_slice()),
        Some(first) => {
            let Some(cmd) = Command::from_arg(first) else {
                eprintln!("unknown subcommand: {first}");
                print_usage();
                return Err(ArgsError::UnknownArg(first.to_string()).into());
            };
            (cmd, &argv[1..])
        }
    };

    let args = Args::parse(cmd, &mut rest.iter().cloned()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    telemetry::init_tracing(&config.log)?;

    let db_url = normalize_sqlite_url(args.db_url.clone().unwrap_or(config.db_url.clone()));
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;

    match cmd {
        Command::Run => {
            let exam_id = args.exam_id.unwrap_or(config.exam_id);
            run_exam(&config, &storage, exam_id).await
        }
        Command::Token => {
            let token = args.token.unwrap_or_default();
            let credentials = Credentials::new(token, args.token_type)?;
            storage.credentials.save(&credentials).await?;
            println!("Signed in ({} token saved).", credentials.token_type());
            Ok(())
        }
        Command::Logout => {
            storage.credentials.clear().await?;
            println!("Signed out.");
            Ok(())
        }
        Command::History => {
            let history = HistoryService::new(Arc::clone(&storage.attempts));
            print_history(&history, args.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)).await
        }
    }
}

async fn run_exam(
    config: &AppConfig,
    storage: &Storage,
    exam_id: ExamId,
) -> Result<(), Box<dyn std::error::Error>> {
    let api: Arc<dyn ExamApi> = Arc::new(HttpExamApi::new(config.api.clone())?);
    let content = ContentService::new(Arc::clone(&api), Arc::clone(&storage.credentials));
    let exam = match content.load(exam_id).await {
        Ok(exam) => Arc::new(exam),
        Err(err) if err.is_no_content() => {
            println!("No questions are available for exam {exam_id}.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let clock = Clock::system();
    let session = ExamSession::new(exam, clock);
    let pipeline =
        SubmissionPipeline::new(api, Arc::clone(&storage.credentials)).with_clock(clock);
    let history = HistoryService::new(Arc::clone(&storage.attempts));
    let signals = Arc::new(SignalHub::new());
    let handle = SessionDriver::new(
        session,
        pipeline,
        Arc::new(NoPresentation),
        Arc::clone(&signals),
    )
    .with_history(history)
    .spawn();

    terminal::drive(&handle, &signals).await?;
    let session = handle.shutdown().await?;
    info!(state = session.state().name(), "exam session closed");
    Ok(())
}

async fn print_history(
    history: &HistoryService,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let attended = history.attended_count().await?;
    println!("Attended exams: {attended}");
    for item in history.recent(limit).await? {
        let timed_out = if item.timed_out { "  (time expired)" } else { "" };
        println!(
            "  {}  {}  {:.1}%  {}  {}/{} answered{timed_out}",
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.exam_name,
            item.percentage,
            item.performance.label(),
            item.answered,
            item.question_count
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // Printed once here; the layers below only propagate.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
