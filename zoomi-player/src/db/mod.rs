//! Database access layer
//!
//! Provides catalog queries for exercises, library items and workouts.

pub mod catalog;
