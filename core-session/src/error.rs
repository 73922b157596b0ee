//! Error types for session operations

use thiserror::Error;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// A catalog operation failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    /// A playback engine operation failed
    #[error("Engine error: {0}")]
    Engine(#[from] engine_traits::EngineError),

    /// Invalid session configuration or wiring
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The queue and catalog disagree about the current track
    #[error("Queue integrity violated: expected track {expected}, got {actual}")]
    Integrity {
        /// Track id the queue entry points at
        expected: String,
        /// Track id the catalog resolved
        actual: String,
    },

    /// The session controller is gone; commands can no longer be delivered
    #[error("Session mailbox is closed")]
    MailboxClosed,
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
