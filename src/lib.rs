//! vidresolve library
//!
//! Turns social-media post links into directly playable video URLs.

pub mod extract;
pub mod resolver;
pub mod session;
pub mod tools;
pub mod utils;

// Re-export main types for easier use
pub use resolver::{default_dispatcher, Dispatcher, Resolution, Resolver, VideoReference};
pub use utils::{ErrorKind, ResolveError, ResolverSettings};
