use tabula_core::ModelError;
use thiserror::Error;

/// Errors that abort report generation.
///
/// Missing or malformed attribute values do not end up here. They are
/// reported in place as `<Error>` cells.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report was requested or driven incorrectly
    #[error("Usage error: {0}")]
    Usage(String),

    /// A required value query failed
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
