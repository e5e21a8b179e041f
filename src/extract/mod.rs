//! Shared extraction helpers: URL canonicalization and pattern ladders

pub mod canonical;
pub mod ladder;

pub use canonical::canonicalize;
pub use ladder::{LadderMatch, PatternLadder, Rung};
