//! Utility modules for error handling, configuration and paths

pub mod config;
pub mod error;
pub mod paths;

pub use config::ResolverSettings;
pub use error::{ErrorKind, ResolveError};
