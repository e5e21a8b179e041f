use crate::resolver::models::Resolution;
use crate::resolver::traits::Resolver;
use crate::utils::error::ResolveError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Resolver registry
///
/// Routes each URL to the first resolver whose static predicate accepts it.
/// Exactly one resolver runs per call; there is no cross-resolver fallback.
pub struct Dispatcher {
    resolvers: Vec<Arc<dyn Resolver>>,
    deadline: Option<Duration>,
}

impl Dispatcher {
    pub fn new(resolvers: Vec<Arc<dyn Resolver>>) -> Self {
        Self {
            resolvers,
            deadline: None,
        }
    }

    /// Bound every call (delegation included) by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Find the resolver for a given URL
    pub fn find_resolver(&self, url: &str) -> Option<&Arc<dyn Resolver>> {
        let found = self.resolvers.iter().find(|r| r.supports(url));
        match found {
            Some(resolver) => debug!("Routing to resolver: {}", resolver.id()),
            None => debug!("No resolver accepts: {}", url),
        }
        found
    }

    /// Resolve with the matching resolver.
    pub async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError> {
        self.bounded(self.resolve_once(url)).await
    }

    /// Resolve, then re-dispatch once if the result is only an intermediary
    /// reference that delegates to the hosting platform.
    ///
    /// When the delegated resolution comes back empty the intermediary
    /// reference is returned as is.
    pub async fn resolve_following(&self, url: &str) -> Result<Resolution, ResolveError> {
        self.bounded(async {
            let first = self.resolve_once(url).await?;
            let target = first
                .found()
                .and_then(|r| r.delegation_target())
                .map(str::to_string);
            let Some(target) = target else {
                return Ok(first);
            };

            info!("Following delegation to {}", target);
            match self.resolve_once(&target).await? {
                Resolution::Found(reference) => Ok(Resolution::Found(reference)),
                Resolution::NotFound(exhausted) => {
                    debug!("Delegated resolution empty: {:?}", exhausted);
                    Ok(first)
                }
            }
        })
        .await
    }

    async fn resolve_once(&self, url: &str) -> Result<Resolution, ResolveError> {
        let resolver = self
            .find_resolver(url)
            .ok_or_else(|| ResolveError::UnsupportedPlatform(url.to_string()))?;
        resolver.resolve(url).await
    }

    async fn bounded<F>(&self, fut: F) -> Result<Resolution, ResolveError>
    where
        F: std::future::Future<Output = Result<Resolution, ResolveError>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, fut)
                .await
                .map_err(|_| ResolveError::DeadlineExceeded(deadline))?,
            None => fut.await,
        }
    }
}
