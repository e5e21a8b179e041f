use crate::resolver::models::Resolution;
use crate::utils::error::ResolveError;
use async_trait::async_trait;

/// Core trait for all platform resolvers
///
/// This trait isolates the dispatcher from how a platform is resolved
/// (format extraction tool, HTTP scraping, browser automation).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns a unique identifier for this resolver (e.g., "youtube", "instagram")
    fn id(&self) -> &'static str;

    /// Static predicate deciding whether this resolver claims the URL.
    ///
    /// Must not perform I/O.
    fn supports(&self, url: &str) -> bool;

    /// Resolve a post URL to a playable video.
    ///
    /// `Ok(Resolution::NotFound)` means every strategy was exhausted; errors
    /// are reserved for conditions no strategy could work around.
    async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError>;
}
