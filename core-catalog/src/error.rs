//! Error types for catalog operations

use thiserror::Error;

/// Errors that can occur during catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog has not finished loading yet
    #[error("Catalog is not ready")]
    NotReady,

    /// Loading the catalog from its source failed
    #[error("Catalog load failed: {0}")]
    LoadFailed(String),

    /// Track not found in the catalog
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Album not found in the catalog
    #[error("Album not found: {0}")]
    AlbumNotFound(String),

    /// A media identifier could not be parsed
    #[error("Invalid media id: {0}")]
    InvalidMediaId(String),

    /// Invalid input provided to a catalog operation
    #[error("Invalid input: {field} - {message}")]
    InvalidInput {
        /// Field that failed validation
        field: String,
        /// Validation error message
        message: String,
    },
}

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
