//! Instagram resolver behavior against scripted endpoints.

mod common;

use async_trait::async_trait;
use common::{DownloadBehavior, MemorySessions, ScriptedFetcher, StubDownloader};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use vidresolve::resolver::instagram::{
    AdDownloads, Hit, InstagramResolver, PostRequest, Strategy, SESSION_KEY,
};
use vidresolve::resolver::{AttemptOutcome, PlatformDetails, Resolution, Resolver};
use vidresolve::tools::http::PageFetcher;
use vidresolve::{ErrorKind, ResolveError};

const POST: &str = "https://www.instagram.com/reel/DAbc123/?igsh=xyz";
const LEGACY: &str = "https://scontent.cdninstagram.com/v/t50.2886-16/clip.mp4?oe=1";
const RESTRICTED: &str = "https://scontent.cdninstagram.com/o1/v/t16/f2/m86/clip.mp4?oe=1";

fn graphql_payload(extra: &str) -> String {
    format!(
        r#"{{"data":{{"xdt_shortcode_media":{{{}"display_url":"https:\/\/scontent.cdninstagram.com\/thumb.jpg","edge_media_to_caption":{{"edges":[{{"node":{{"text":"Launch day"}}}}]}},"video_url":"{}","video_versions":[{{"type":101,"url":"{}"}}]}}}}}}"#,
        extra, RESTRICTED, LEGACY
    )
}

struct Fixture {
    _temp: TempDir,
    ads: AdDownloads,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let ads = AdDownloads {
        temp_dir: temp.path().join("temp"),
        served_prefix: "/temp".to_string(),
        cookie_file: temp.path().join("instagram_cookies.txt"),
        min_bytes: 1000,
    };
    Fixture { _temp: temp, ads }
}

fn logged_in() -> Arc<MemorySessions> {
    Arc::new(MemorySessions::empty().with(SESSION_KEY, "4242%3AabcDEF%3A19"))
}

fn build(
    fetcher: &Arc<ScriptedFetcher>,
    sessions: Arc<MemorySessions>,
    downloader: &Arc<StubDownloader>,
    ads: AdDownloads,
) -> InstagramResolver {
    InstagramResolver::new(fetcher.clone(), sessions, downloader.clone(), ads)
}

#[tokio::test]
async fn graphql_hit_short_circuits_remaining_endpoints() {
    let fx = fixture();
    let fetcher = Arc::new(ScriptedFetcher::new().ok("graphql/query", graphql_payload("")));
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert!(fetcher.urls()[0].contains("doc_id=8845758582119845"));
    assert_eq!(reference.title, "Launch day");
    assert_eq!(
        reference.thumbnail_url.as_deref(),
        Some("https://scontent.cdninstagram.com/thumb.jpg")
    );
    assert_eq!(downloader.call_count(), 0);
}

struct Counting {
    name: &'static str,
    invocations: Arc<AtomicUsize>,
    hit: Option<&'static str>,
}

#[async_trait]
impl Strategy for Counting {
    fn name(&self) -> String {
        self.name.to_string()
    }

    async fn attempt(
        &self,
        _fetcher: &dyn PageFetcher,
        _request: &PostRequest,
    ) -> Result<Option<Hit>, ResolveError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.hit.map(|url| Hit {
            video_url: url.to_string(),
            thumbnail_url: None,
            title: "Instagram Reels Video".to_string(),
            is_ad: false,
        }))
    }
}

#[tokio::test]
async fn later_strategies_never_invoked_after_success() {
    let fx = fixture();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let first = Arc::new(AtomicUsize::new(0));
    let rest = Arc::new(AtomicUsize::new(0));

    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(Counting {
            name: "first",
            invocations: first.clone(),
            hit: Some(LEGACY),
        }),
        Box::new(Counting {
            name: "second",
            invocations: rest.clone(),
            hit: Some(RESTRICTED),
        }),
        Box::new(Counting {
            name: "third",
            invocations: rest.clone(),
            hit: None,
        }),
    ];
    let resolver =
        build(&fetcher, logged_in(), &downloader, fx.ads.clone()).with_strategies(strategies);

    let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();
    assert_eq!(reference.video_url, LEGACY);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(rest.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn legacy_delivery_path_preferred() {
    let fx = fixture();
    let fetcher = Arc::new(ScriptedFetcher::new().ok("graphql/query", graphql_payload("")));
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    for _ in 0..3 {
        let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();
        assert_eq!(reference.video_url, LEGACY);
    }
}

#[tokio::test]
async fn headers_carry_decoded_session_and_post_referer() {
    let fx = fixture();
    let fetcher = Arc::new(ScriptedFetcher::new().ok("graphql/query", graphql_payload("")));
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    resolver.resolve(POST).await.unwrap();

    let requests = fetcher.requests.lock().unwrap();
    let headers = &requests[0].1;
    let get = |name: &str| headers.iter().find(|(n, _)| *n == name).map(|(_, v)| v.clone());
    assert_eq!(
        get("cookie").as_deref(),
        Some("sessionid=4242:abcDEF:19; ds_user_id=4242")
    );
    assert_eq!(
        get("referer").as_deref(),
        Some("https://www.instagram.com/reel/DAbc123/")
    );
}

#[tokio::test]
async fn missing_credential_is_terminal_and_fetches_nothing() {
    let fx = fixture();
    let fetcher = Arc::new(ScriptedFetcher::new().ok("graphql/query", graphql_payload("")));
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, Arc::new(MemorySessions::empty()), &downloader, fx.ads.clone());

    let err = resolver.resolve(POST).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingCredential);
    assert!(matches!(err, ResolveError::MissingCredential(_)));
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(downloader.call_count(), 0);
}

#[tokio::test]
async fn transport_errors_advance_to_embed_page() {
    let fx = fixture();
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .fail("graphql/query", "HTTP 401 Unauthorized")
            .ok(
                "/embed/",
                r#"<html><video class="EmbeddedMediaVideo" src="https://scontent.cdninstagram.com/v/t50/embed.mp4?a=1&amp;b=2"></video></html>"#,
            ),
    );
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();

    assert_eq!(
        reference.video_url,
        "https://scontent.cdninstagram.com/v/t50/embed.mp4?a=1&b=2"
    );
    assert_eq!(reference.title, "Instagram Video");
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn legacy_api_reached_last() {
    let fx = fixture();
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .ok("graphql/query", r#"{"data":{"xdt_shortcode_media":null}}"#)
            .ok("/embed/", "<html>login required</html>")
            .fail("/reel/DAbc123/?__a=1", "HTTP 500")
            .ok("/p/DAbc123/?__a=1", format!(r#"{{"items":[{{"video_versions":[{{"url":"{}"}}]}}]}}"#, LEGACY)),
    );
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();
    assert_eq!(reference.video_url, LEGACY);
    assert_eq!(reference.title, "Instagram Reels Video");
    assert_eq!(fetcher.calls(), 5);
}

#[tokio::test]
async fn exhaustion_is_not_found_with_inspectable_attempts() {
    let fx = fixture();
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));

    // Every endpoint unreachable: not found, but flagged as failures.
    let fetcher = Arc::new(ScriptedFetcher::new());
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());
    let Resolution::NotFound(exhausted) = resolver.resolve(POST).await.unwrap() else {
        panic!("expected not found");
    };
    assert_eq!(exhausted.attempts.len(), 5);
    assert!(exhausted.had_failures());
    assert!(matches!(
        exhausted.attempts[0].outcome,
        AttemptOutcome::Failed { kind: ErrorKind::Transport, .. }
    ));

    // Every endpoint answered without a video: genuinely absent.
    let fetcher = Arc::new(ScriptedFetcher::new().ok("instagram.com", "{}"));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());
    let Resolution::NotFound(exhausted) = resolver.resolve(POST).await.unwrap() else {
        panic!("expected not found");
    };
    assert!(!exhausted.had_failures());
}

#[tokio::test]
async fn url_without_shortcode_is_not_found() {
    let fx = fixture();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    let url = "https://www.instagram.com/someprofile/";
    assert!(resolver.supports(url));
    let resolution = resolver.resolve(url).await.unwrap();
    assert!(resolution.found().is_none());
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn ad_with_failing_downloader_returns_remote_candidate() {
    let fx = fixture();
    let fetcher = Arc::new(
        ScriptedFetcher::new().ok("graphql/query", graphql_payload(r#""product_type":"ad","#)),
    );
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Fail));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();

    assert_eq!(downloader.call_count(), 1);
    assert_eq!(reference.video_url, LEGACY);
    assert!(!reference.is_local());
    assert!(matches!(
        reference.details,
        PlatformDetails::Instagram { is_ad: true, local_path: None, .. }
    ));
}

#[tokio::test]
async fn ad_with_undersized_download_returns_remote_candidate() {
    let fx = fixture();
    let fetcher = Arc::new(
        ScriptedFetcher::new().ok("graphql/query", graphql_payload(r#""is_paid_partnership":true,"#)),
    );
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Write(500)));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();

    assert_eq!(reference.video_url, LEGACY);
    let calls = downloader.calls.lock().unwrap();
    assert!(!calls[0].1.exists());
}

#[tokio::test]
async fn ad_download_served_locally() {
    let fx = fixture();
    std::fs::write(&fx.ads.cookie_file, "# Netscape HTTP Cookie File\n").unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new().ok("graphql/query", graphql_payload(r#""product_type":"ad","#)),
    );
    let downloader = Arc::new(StubDownloader::new(DownloadBehavior::Write(4096)));
    let resolver = build(&fetcher, logged_in(), &downloader, fx.ads.clone());

    let reference = resolver.resolve(POST).await.unwrap().into_found().unwrap();

    assert!(reference.video_url.starts_with("/temp/ad_DAbc123_"));
    assert!(reference.video_url.ends_with(".mp4"));
    let PlatformDetails::Instagram { local_path: Some(path), is_ad: true, .. } = &reference.details else {
        panic!("expected a local ad copy");
    };
    assert!(path.starts_with(&fx.ads.temp_dir));
    assert_eq!(std::fs::metadata(path).unwrap().len(), 4096);

    let calls = downloader.calls.lock().unwrap();
    assert_eq!(calls[0].0, POST);
    assert_eq!(calls[0].2.as_deref(), Some(Path::new(&fx.ads.cookie_file)));
}
