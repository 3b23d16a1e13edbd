//! # Zoomi Exercise Player Library (zoomi-player)
//!
//! Plays guided exercises: a single library item, a single catalog exercise,
//! or a whole workout in order.
//!
//! **Purpose:** Resolve exercises from the catalog, gate playback on narration
//! readiness, run exactly one completion strategy per exercise, report
//! completions to the backend and expose the session over HTTP/SSE.
//!
//! **Architecture:** One task per playback session, fed by a single message
//! channel; collaborators (catalog, narration, animation, progress log) sit
//! behind traits.

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod playback;
pub mod progress;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
