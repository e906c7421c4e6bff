use std::env;
use std::fmt;

use exam_core::model::ExamId;
use services::ApiConfig;
use services::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite://exam.sqlite3";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.into(),
            json: false,
        }
    }
}

/// Settings for the binary, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_url: String,
    pub exam_id: ExamId,
    pub log: LogSettings,
    pub api: ApiConfig,
}

#[derive(Debug)]
pub enum AppConfigError {
    InvalidExamId { raw: String },
    Api(ConfigError),
}

impl fmt::Display for AppConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppConfigError::InvalidExamId { raw } => write!(f, "invalid EXAM_ID value: {raw}"),
            AppConfigError::Api(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppConfigError {}

impl From<ConfigError> for AppConfigError {
    fn from(err: ConfigError) -> Self {
        AppConfigError::Api(err)
    }
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns `AppConfigError` for an unparsable `EXAM_ID` or invalid API settings.
    pub fn from_env() -> Result<Self, AppConfigError> {
        let db_url = env::var("EXAM_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let exam_id = match env::var("EXAM_ID") {
            Ok(raw) => raw
                .parse::<ExamId>()
                .map_err(|_| AppConfigError::InvalidExamId { raw })?,
            Err(_) => ExamId::new(1),
        };
        let log = LogSettings {
            level: env::var("EXAM_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
            json: env::var("EXAM_LOG_JSON").is_ok_and(|raw| parse_flag(&raw)),
        };
        Ok(Self {
            db_url,
            exam_id,
            log,
            api: ApiConfig::from_env()?,
        })
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
