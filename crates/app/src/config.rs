use std::fmt;
use std::path::PathBuf;

use sop_core::model::{
    DetectorSettings, DetectorSettingsDraft, EnvironmentId, ProcessId, SettingsError,
};

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidEnvironmentId { raw: String },
    InvalidProcessId { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    Settings(SettingsError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidEnvironmentId { raw } => {
                write!(f, "invalid --environment-id value: {raw}")
            }
            ArgsError::InvalidProcessId { raw } => write!(f, "invalid --process-id value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::Settings(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<SettingsError> for ArgsError {
    fn from(err: SettingsError) -> Self {
        ArgsError::Settings(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

/// Where replay input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

/// Options shared by every subcommand, filled from `SOP_*` variables first and
/// then overridden by flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub db_url: String,
    pub environment_id: EnvironmentId,
    pub process_id: ProcessId,
    pub settings: DetectorSettings,
    pub input: Input,
}

impl Args {
    /// Parses flags after the subcommand. `env` looks up environment variables.
    pub fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("SOP_DB_URL")
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut environment_id = EnvironmentId::new(1);
        let mut process_id = ProcessId::new(1);
        let mut draft = DetectorSettingsDraft::new();
        if let Some(raw) = env("SOP_CONFIDENCE_THRESHOLD") {
            draft.confidence_threshold = Some(parse_number("SOP_CONFIDENCE_THRESHOLD", raw)?);
        }
        if let Some(raw) = env("SOP_HAND_OFFSET_PX") {
            draft.hand_offset_px = Some(parse_number("SOP_HAND_OFFSET_PX", raw)?);
        }
        let mut input = Input::Stdin;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--environment-id" => {
                    let value = require_value(args, "--environment-id")?;
                    environment_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidEnvironmentId { raw: value.clone() })?;
                }
                "--process-id" => {
                    let value = require_value(args, "--process-id")?;
                    process_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidProcessId { raw: value.clone() })?;
                }
                "--confidence" => {
                    let value = require_value(args, "--confidence")?;
                    draft.confidence_threshold = Some(parse_number("--confidence", value)?);
                }
                "--hand-offset" => {
                    let value = require_value(args, "--hand-offset")?;
                    draft.hand_offset_px = Some(parse_number("--hand-offset", value)?);
                }
                "--input" => {
                    let value = require_value(args, "--input")?;
                    input = if value == "-" {
                        Input::Stdin
                    } else {
                        Input::File(PathBuf::from(value))
                    };
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            environment_id,
            process_id,
            settings: draft.validate()?,
            input,
        })
    }
}

/// Turns `sqlite:relative.db` or a bare path into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: String) -> String {
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

/// Creates the database file and its directory so `SQLite` can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
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
