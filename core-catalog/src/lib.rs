//! Media catalog for the playback core
//!
//! Owns the in-memory library of tracks and albums. Data comes in through
//! a [`CatalogSource`], is indexed by [`CatalogProvider`] for id, album,
//! artist and free-text lookup, and is addressed from the outside with
//! hierarchical [`MediaId`] strings.
//!
//! The provider loads lazily: nothing touches the source until the first
//! [`CatalogProvider::ensure_ready`] call, and a failed load leaves the
//! provider ready to retry.

pub mod error;
pub mod media_id;
pub mod models;
pub mod provider;
pub mod source;

pub use error::{CatalogError, Result};
pub use media_id::{CategoryPath, MediaId};
pub use models::{Album, Track};
pub use provider::{CatalogProvider, LoadState};
pub use source::{CatalogData, CatalogSource, StaticCatalogSource};
