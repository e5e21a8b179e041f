//! Platform resolvers and the dispatcher that routes between them

pub mod dispatcher;
pub mod googleads;
pub mod instagram;
pub mod models;
pub mod traits;
pub mod youtube;

pub use dispatcher::Dispatcher;
pub use googleads::GoogleAdsResolver;
pub use instagram::{AdDownloads, InstagramResolver};
pub use models::{
    Attempt, AttemptOutcome, Candidate, CandidateSource, Exhausted, Format, MediaInfo, Platform,
    PlatformDetails, Resolution, VideoReference,
};
pub use traits::Resolver;
pub use youtube::YouTubeResolver;

use crate::session::{CookieFileStore, RemoteSessionStore, SessionStore, TieredSessionStore};
use crate::tools::browser::{ChromeLauncher, LaunchOptions};
use crate::tools::http::ReqwestFetcher;
use crate::tools::ytdlp::YtDlp;
use crate::utils::config::ResolverSettings;
use crate::utils::error::ResolveError;
use crate::utils::paths;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Two-tier session store: the remote table when configured, then the local
/// cookie export.
pub fn session_store(settings: &ResolverSettings) -> TieredSessionStore {
    let remote = match (&settings.remote_store_url, &settings.remote_store_key) {
        (Some(url), Some(key)) => {
            info!("Remote session store enabled");
            Some(Box::new(RemoteSessionStore::new(url.clone(), key.clone(), settings.http_timeout()))
                as Box<dyn SessionStore>)
        }
        _ => None,
    };
    let local = CookieFileStore::new().with_cookie(
        instagram::SESSION_KEY,
        paths::instagram_cookie_export(&settings.data_dir),
        "sessionid",
    );
    TieredSessionStore::new(remote, Box::new(local))
}

/// Dispatcher wired with the production collaborators.
///
/// A missing yt-dlp is not fatal here: the hosting-platform resolver and ad
/// pre-downloads report it per call.
pub fn default_dispatcher(settings: &ResolverSettings) -> Result<Dispatcher, ResolveError> {
    let ytdlp = Arc::new(
        YtDlp::locate(settings.ytdlp_path.as_deref()).unwrap_or_else(|e| {
            warn!("{}; resolutions needing it will fail", e);
            YtDlp::with_path(PathBuf::from("yt-dlp"))
        }),
    );
    let sessions: Arc<dyn SessionStore> = Arc::new(session_store(settings));
    let fetcher = Arc::new(ReqwestFetcher::new(settings.http_timeout())?);
    let launcher = Arc::new(ChromeLauncher::init(settings.chrome_path.clone()));

    let resolvers: Vec<Arc<dyn Resolver>> = vec![
        Arc::new(YouTubeResolver::new(
            ytdlp.clone(),
            Arc::clone(&sessions),
            paths::youtube_cookie_file(&settings.data_dir),
        )),
        Arc::new(InstagramResolver::new(
            fetcher,
            Arc::clone(&sessions),
            ytdlp,
            AdDownloads::from_settings(settings),
        )),
        Arc::new(GoogleAdsResolver::new(
            launcher,
            LaunchOptions::default(),
            settings.navigation_timeout(),
            settings.settle_delay(),
        )),
    ];

    let dispatcher = Dispatcher::new(resolvers);
    Ok(if settings.resolve_deadline_secs > 0 {
        dispatcher.with_deadline(settings.resolve_deadline())
    } else {
        dispatcher
    })
}
