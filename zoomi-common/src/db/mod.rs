//! Catalog database bootstrap

pub mod init;

pub use init::*;
