//! Error types for zoomi-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for zoomi-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client/server errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Exercise or workout could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Narration asset failed to fetch or decode
    #[error("Media load error: {0}")]
    Media(String),

    /// Remote completion log failed
    #[error("Progress log error: {0}")]
    Progress(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zoomi_common::Error> for Error {
    fn from(err: zoomi_common::Error) -> Self {
        match err {
            zoomi_common::Error::Database(e) => Error::Database(e),
            zoomi_common::Error::Config(msg) => Error::Config(msg),
            zoomi_common::Error::Io(e) => Error::Config(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

/// Why an exercise (or workout) could not be turned into something playable
///
/// The display text of each variant is what the user sees next to the
/// "go back" action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The request did not carry exactly one reference
    #[error("No exercise specified")]
    MissingReference,

    /// Library item or exercise lookup came back empty
    #[error("Exercise not found")]
    ExerciseNotFound,

    /// Exercise exists but is hidden
    #[error("This exercise is not currently available")]
    Unavailable,

    /// Workout could not be fetched
    #[error("Failed to load workout")]
    WorkoutUnavailable,

    /// Workout exists but has no entries
    #[error("Workout has no exercises")]
    WorkoutEmpty,

    /// Catalog backend failed while resolving
    #[error("Failed to load exercise")]
    Backend,
}

/// Convenience Result type using zoomi-player Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_messages_are_user_facing() {
        assert_eq!(ResolutionError::MissingReference.to_string(), "No exercise specified");
        assert_eq!(ResolutionError::ExerciseNotFound.to_string(), "Exercise not found");
        assert_eq!(
            ResolutionError::Unavailable.to_string(),
            "This exercise is not currently available"
        );
        assert_eq!(ResolutionError::WorkoutUnavailable.to_string(), "Failed to load workout");
    }

    #[test]
    fn test_resolution_error_is_transparent() {
        let err: Error = ResolutionError::WorkoutEmpty.into();
        assert_eq!(err.to_string(), "Workout has no exercises");
    }

    #[test]
    fn test_common_error_conversion() {
        let err: Error = zoomi_common::Error::Config("bad port".to_string()).into();
        assert!(matches!(err, Error::Config(msg) if msg == "bad port"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = zoomi_common::Error::Io(io).into();
        assert!(matches!(err, Error::Config(msg) if msg.contains("denied")));
    }
}
