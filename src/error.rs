//! Error types for completed-import
//!
//! This module provides error handling for the pipeline, including:
//! - Domain-specific error types (Config, Database, transitions, clients)
//! - Stable machine-readable error codes for structured logging
//! - Context information (download ID, client ID, configuration key)

use crate::tracking::TrackedDownloadState;
use crate::types::{ClientId, DownloadId};
use thiserror::Error;

/// Result type alias for completed-import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for completed-import
///
/// None of these errors are fatal to the pipeline as a whole. The worst outcome of
/// any failure is a tracked download that stays in `ImportPending`.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll_interval")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A download client could not be reached or returned garbage
    #[error("download client {client_id} unavailable: {reason}")]
    ClientUnavailable {
        /// The client that failed
        client_id: ClientId,
        /// Why the client could not be polled
        reason: String,
    },

    /// Catastrophic import failure (path inaccessible, import engine crashed)
    #[error("import error: {0}")]
    Import(String),

    /// Media resolution failed
    #[error("media resolution error: {0}")]
    Resolve(String),

    /// Tracked download not found in the registry
    #[error("tracked download not found: {0}")]
    NotFound(DownloadId),

    /// Illegal state machine transition was requested
    #[error("download {download_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The tracked download the transition was requested for
        download_id: DownloadId,
        /// Current state
        from: TrackedDownloadState,
        /// Requested state
        to: TrackedDownloadState,
    },

    /// Shutdown in progress
    #[error("shutdown in progress")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(e) => match e {
                DatabaseError::ConnectionFailed(_) => "database_connection_failed",
                DatabaseError::MigrationFailed(_) => "database_migration_failed",
                DatabaseError::QueryFailed(_) => "database_query_failed",
            },
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ClientUnavailable { .. } => "client_unavailable",
            Error::Import(_) => "import_error",
            Error::Resolve(_) => "resolve_error",
            Error::NotFound(_) => "not_found",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}
