//! Core data model for chatlog.
//!
//! Holds the entity records (servers, channels, messages), the in-memory
//! [`index::Index`] that ties them together, the typed schemas for each
//! export file, and the shared error, text, time and settings helpers.

pub mod error;
pub mod formatting;
pub mod index;
pub mod models;
pub mod schema;
pub mod settings;
pub mod text;
pub mod time_utils;

pub use error::{ArchiveError, EntityKind, Result};
pub use index::{ChannelStats, Index};
pub use models::{Channel, ChannelKind, Message, Server};
