//! Failures raised by the shared crate
//!
//! Only schema setup and config loading can fail here; everything else in
//! `zoomi-common` is plain data.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Schema creation or a pool query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Config file exists but could not be read
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}
