//! # Zoomi Common Library
//!
//! Shared code for the Zoomi exercise services including:
//! - Catalog models (exercises, library items, workout playlists)
//! - Locale selection for bilingual catalog fields
//! - Event types (ZoomiEvent enum) and the EventBus
//! - Configuration file resolution
//! - SQLite schema bootstrap

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod locale;
pub mod models;

pub use error::{Error, Result};
pub use locale::{Locale, Localized};
