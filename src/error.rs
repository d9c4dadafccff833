//! Error types for report loading and export.
//!
//! Access denial is not an error: it is an [`AccessDecision`](crate::access::AccessDecision)
//! value. Everything here is either a configuration problem, which should stop the
//! process at startup, or a data problem with the current snapshot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// A required configuration value is absent or empty.
    #[error("Missing configuration value: {key}")]
    MissingConfig { key: &'static str },

    /// The configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested spreadsheet page does not exist in the source.
    #[error("Sheet not found: {spreadsheet}/{sheet}")]
    SheetNotFound { spreadsheet: String, sheet: String },

    /// A record lacks a column the typed row requires.
    #[error("Row {row}: missing column '{column}'")]
    MissingColumn { row: usize, column: &'static str },

    /// A record carries a value that cannot be coerced.
    #[error("Row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[cfg(feature = "web")]
    #[error("XLSX export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, ReportError>;
