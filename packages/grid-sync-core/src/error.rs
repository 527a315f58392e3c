//! Grid error types.

use thiserror::Error;

/// Grid operation errors.
#[derive(Error, Debug, Clone)]
pub enum GridError {
    /// Row index outside the current page
    #[error("Row {index} not found (row count: {len})")]
    RowNotFound { index: usize, len: usize },

    /// Field missing from a row
    #[error("Field '{field}' not found in row {index}")]
    FieldNotFound { index: usize, field: String },

    /// Column has no edit descriptor
    #[error("Column '{0}' is not editable")]
    NotEditable(String),

    /// Event dispatched to a cell that cannot receive it
    #[error("Cell '{field}' in row {index} cannot handle {event}")]
    InvalidCell {
        index: usize,
        field: String,
        event: &'static str,
    },

    /// Host query operation failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Handle used while the grid is not mounted
    #[error("Grid handle is detached")]
    Detached,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for grid operations
pub type Result<T> = std::result::Result<T, GridError>;
