//! Error types for keydev-core.

use chrono::NaiveDate;

/// Top-level keydev error type.
///
/// All fallible operations in `keydev-core` return [`Result<T, KeydevError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum KeydevError {
    /// Error from the sliding-window buffer.
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Error while reading or validating a change-set dataset.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// A query violated a precondition of the artifact graph.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the change-set buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// There is no next day to slide into. Not a failure: iteration is over.
    #[error("Not enough data to slide the window one more day (last included date is {last_included})")]
    SlidingNotPossible {
        /// Right edge of the window when sliding was attempted.
        last_included: NaiveDate,
    },

    /// The dataset spans fewer days than one window.
    #[error("Not enough data to create the first window: data starts on {first}, window is {window_size_days} days")]
    InsufficientHistory {
        first: NaiveDate,
        window_size_days: u32,
    },

    /// The dataset has no change sets at all.
    #[error("Dataset contains no change sets")]
    EmptyDataset,

    /// Sliding was requested before the initial window was built.
    #[error("Initial window has not been created")]
    NotInitialized,
}

/// Errors while loading change sets.
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// Filesystem I/O error reading the dataset.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset is not valid JSON or has the wrong shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A commit date could not be parsed.
    #[error("Invalid date '{value}' in commit {commit}")]
    InvalidDate { commit: String, value: String },

    /// A code change is inconsistent with its change type.
    #[error("Invalid code change in commit {commit}: {message}")]
    InvalidChange { commit: String, message: String },

    /// A change set without any code change.
    #[error("Commit {0} has no code changes")]
    EmptyChangeSet(String),
}

/// Precondition violations against the current window.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The developer has no node in the current artifact graph.
    #[error("Developer does not exist in the artifact graph: {0}")]
    UnknownDeveloper(String),
}

/// Errors in keydev configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, KeydevError>`.
pub type Result<T> = std::result::Result<T, KeydevError>;
