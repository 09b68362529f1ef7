//! Error taxonomy for the dashboard flows.
//!
//! None of these are fatal to a session: every flow catches external
//! failures at its boundary and converts them into one of these kinds.

/// Upload could not be decoded into a table.
///
/// Recovered locally: the upload flow writes an inline error message into
/// the upload region and leaves prior state untouched.
#[derive(Debug, Clone, thiserror::Error)]
#[error("There was an error processing this file - {filename}. ({cause})")]
pub struct ParseError {
    pub filename: String,
    pub cause: String,
}

/// The document tree does not hold what a flow expected to read.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Unknown region node: {0}")]
    MissingRegion(&'static str),

    #[error("No uploaded table is present")]
    NoUploadedTable,

    #[error("Malformed node at {0}: {1}")]
    MalformedNode(String, String),
}

/// Compute backend failures.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// The backend reports the root identifier invalid. No download is
    /// produced; the UI is otherwise left unchanged.
    #[error("Root identifier rejected by the backend: {0}")]
    InvalidRoot(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Feedback draft failed validation; the modal stays open.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("WWID must be exactly {expected} characters, got {actual}")]
    WwidLength { expected: usize, actual: usize },

    #[error("Comment must not be empty")]
    EmptyComment,
}

/// Mail transport failure while dispatching a feedback report.
#[derive(Debug, thiserror::Error)]
#[error("Notification dispatch failed: {0}")]
pub struct NotificationError(pub String);
