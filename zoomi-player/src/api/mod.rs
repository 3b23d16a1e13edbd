//! HTTP host surface
//!
//! Lets a host screen drive one playback session over REST and follow it
//! through Server-Sent Events.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
