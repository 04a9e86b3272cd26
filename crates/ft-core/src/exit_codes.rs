//! Exit codes for the ft-core CLI.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes (the query ran)
//! - 10-19: User/input errors (fixable by changing arguments or files)
//! - 20-29: Internal and infrastructure errors

use ft_common::Error;

/// Exit codes for ft-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Query produced a value
    Clean = 0,

    /// Query ran but there was no data to report
    NoData = 1,

    /// Invalid arguments
    ArgsError = 10,

    /// Catalogue or settings could not be loaded or failed validation
    ConfigError = 11,

    /// Readings file is missing, unreadable, malformed or non-numeric
    InputError = 12,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,

    /// Store or cache backend failure
    StorageError = 22,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Codes 0-1.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Map a library error to the exit code reported for it.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidCatalogue(_) => ExitCode::ConfigError,
            Error::TypeNotFound { .. }
            | Error::CompositePeriodQuery { .. }
            | Error::UnsupportedAggregation(_)
            | Error::TooManyBuckets { .. } => ExitCode::ArgsError,
            Error::NonNumericValue { .. }
            | Error::MalformedRecord { .. }
            | Error::ReadingsUnavailable { .. } => ExitCode::InputError,
            Error::Store(_) | Error::Cache(_) => ExitCode::StorageError,
            Error::Io(_) => ExitCode::IoError,
            Error::Json(_) => ExitCode::InternalError,
        }
    }

    /// Error code name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::NoData => "OK_NO_DATA",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::StorageError => "ERR_STORAGE",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
