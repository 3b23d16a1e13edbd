//! Exercise playback
//!
//! The orchestrator and the pieces it coordinates: resolver, playlist
//! cursor, completion strategies, countdown timer and host display state.

pub mod display;
pub mod orchestrator;
pub mod playlist;
pub mod resolver;
pub mod session;
pub mod strategy;
pub mod summary;
pub mod timer;

pub use display::{ControlSurface, PlaylistProgress};
pub use orchestrator::{spawn_session, PlayerDeps, SessionRequest};
pub use playlist::{PlaylistQueue, QueueStatus};
pub use resolver::{AudioUrlBuilder, ExerciseAddress, ExerciseResolver, ResolvedExercise};
pub use session::{ExerciseTag, SessionHandle, SessionSnapshot, UserCommand};
pub use strategy::{ArmedStrategy, CompletionStrategy};
pub use summary::{Award, CompletionSummary, PointsLedger};
pub use timer::CountdownTimer;
