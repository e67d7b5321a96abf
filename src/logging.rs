/// Structured logging for the alignment pipeline
///
/// Provides context-rich logging tagged with the modality being aligned and
/// the county key, with timestamps and severity levels. Supports console
/// output and file-based logging for long collation runs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::AlignError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Modality Tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Daily,
    Monthly,
    Imagery,
    Yield,
    Collator,
    /// File readers, before rows are assigned to a modality
    Ingest,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Daily => write!(f, "DAILY"),
            Modality::Monthly => write!(f, "MONTHLY"),
            Modality::Imagery => write!(f, "IMAGERY"),
            Modality::Yield => write!(f, "YIELD"),
            Modality::Collator => write!(f, "COLLATE"),
            Modality::Ingest => write!(f, "INGEST"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the county simply has no data in this source,
    /// or a yield entry is zero
    Expected,
    /// Unexpected failure - malformed input or a schema/config problem
    Unexpected,
    /// Unknown - incomplete data that may or may not be a pipeline fault
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, modality: &Modality, key: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let key_part = key.map(|k| format!(" [{}]", k)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, modality, key_part, message)
    }

    fn log(&self, level: LogLevel, modality: &Modality, key: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, modality, key, message);
        let key_part = key.map(|k| format!(" [{}]", k)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", modality, key_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", modality, key_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", modality, key_part, message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, modality: Modality, key: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &modality, key, message);
        }
    }
}

/// Log a general informational message
pub fn info(modality: Modality, key: Option<&str>, message: &str) {
    emit(LogLevel::Info, modality, key, message);
}

/// Log a warning message
pub fn warn(modality: Modality, key: Option<&str>, message: &str) {
    emit(LogLevel::Warning, modality, key, message);
}

/// Log an error message
pub fn error(modality: Modality, key: Option<&str>, message: &str) {
    emit(LogLevel::Error, modality, key, message);
}

/// Log a debug message
pub fn debug(modality: Modality, key: Option<&str>, message: &str) {
    emit(LogLevel::Debug, modality, key, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify an alignment failure by its error kind
pub fn classify_failure(err: &AlignError) -> FailureType {
    match err {
        // Counties routinely lack rows in a given source, and USDA tables
        // carry zero yields for failed harvests
        AlignError::KeyNotFound { .. } | AlignError::InvalidDomain { .. } => FailureType::Expected,
        // Partial months and ragged grids come from incomplete downloads
        AlignError::ShapeMismatch { .. } => FailureType::Unknown,
        AlignError::MissingVariable { .. }
        | AlignError::Parse(_)
        | AlignError::Io(_)
        | AlignError::Csv(_)
        | AlignError::Manifest(_)
        | AlignError::Config(_)
        | AlignError::Store(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log an alignment failure with automatic classification
pub fn log_alignment_failure(modality: Modality, key: &str, operation: &str, err: &AlignError) {
    let failure_type = classify_failure(err);

    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(modality, Some(key), &message),
        FailureType::Unexpected => error(modality, Some(key), &message),
        FailureType::Unknown => warn(modality, Some(key), &message),
    }
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a collation batch
pub fn log_batch_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Batch complete: {}/{} samples aligned, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(Modality::Collator, None, &message);
    } else if successful == 0 {
        error(Modality::Collator, None, &message);
    } else {
        warn(Modality::Collator, None, &message);
    }
}
