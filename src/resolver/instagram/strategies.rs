//! Instagram lookup strategies, tried in order until one yields a video

use super::payload;
use crate::tools::http::{Headers, PageFetcher};
use crate::utils::error::ResolveError;
use async_trait::async_trait;
use tracing::{debug, info};

/// Query identifiers for the media-info GraphQL query, newest first.
pub const GRAPHQL_DOC_IDS: &[&str] = &["8845758582119845", "7153581528070080"];

/// Post path variants accepted by the legacy `__a=1` API.
pub const LEGACY_API_PATHS: &[&str] = &["reel", "p"];

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Everything a strategy needs about the post being resolved.
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub shortcode: String,
    pub headers: Headers,
}

/// Video located by a strategy, before ad handling.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub title: String,
    pub is_ad: bool,
}

/// One rung of the resolver's strategy ladder.
///
/// `Ok(None)` means the endpoint answered without a usable video; `Err`
/// means the endpoint could not be reached or refused the request.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    async fn attempt(
        &self,
        fetcher: &dyn PageFetcher,
        request: &PostRequest,
    ) -> Result<Option<Hit>, ResolveError>;
}

/// Standard ladder: GraphQL query per known identifier, public embed page,
/// then the legacy API path variants.
pub fn default_strategies() -> Vec<Box<dyn Strategy>> {
    let mut strategies: Vec<Box<dyn Strategy>> = GRAPHQL_DOC_IDS
        .iter()
        .copied()
        .map(|doc_id| Box::new(GraphQlStrategy { doc_id }) as Box<dyn Strategy>)
        .collect();
    strategies.push(Box::new(EmbedStrategy));
    strategies.extend(
        LEGACY_API_PATHS
            .iter()
            .copied()
            .map(|path| Box::new(LegacyApiStrategy { path }) as Box<dyn Strategy>),
    );
    strategies
}

fn json_hit(body: &str, is_ad: bool) -> Option<Hit> {
    let candidate = payload::best_candidate(body)?;
    Some(Hit {
        video_url: candidate.url,
        thumbnail_url: payload::thumbnail(body),
        title: payload::title(body, "Instagram Reels Video"),
        is_ad,
    })
}

pub struct GraphQlStrategy {
    doc_id: &'static str,
}

impl GraphQlStrategy {
    pub fn url(&self, shortcode: &str) -> String {
        let variables = serde_json::json!({ "shortcode": shortcode }).to_string();
        format!(
            "https://www.instagram.com/graphql/query/?doc_id={}&variables={}",
            self.doc_id,
            urlencoding::encode(&variables)
        )
    }
}

#[async_trait]
impl Strategy for GraphQlStrategy {
    fn name(&self) -> String {
        format!("graphql:{}", self.doc_id)
    }

    async fn attempt(
        &self,
        fetcher: &dyn PageFetcher,
        request: &PostRequest,
    ) -> Result<Option<Hit>, ResolveError> {
        info!("GraphQL query (doc_id: {})", self.doc_id);
        let body = fetcher
            .get_text(&self.url(&request.shortcode), &request.headers)
            .await?;
        debug!("GraphQL response length: {}", body.len());

        let is_ad = payload::has_ad_markers(&body);
        if is_ad {
            info!("Sponsored content markers present");
        }
        Ok(json_hit(&body, is_ad))
    }
}

pub struct EmbedStrategy;

impl EmbedStrategy {
    pub fn url(shortcode: &str) -> String {
        format!("https://www.instagram.com/p/{}/embed/", shortcode)
    }
}

#[async_trait]
impl Strategy for EmbedStrategy {
    fn name(&self) -> String {
        "embed".to_string()
    }

    async fn attempt(
        &self,
        fetcher: &dyn PageFetcher,
        request: &PostRequest,
    ) -> Result<Option<Hit>, ResolveError> {
        let headers: Headers = request
            .headers
            .iter()
            .map(|(name, value)| match *name {
                "accept" => (*name, HTML_ACCEPT.to_string()),
                _ => (*name, value.clone()),
            })
            .collect();

        info!("Embed page request");
        let html = fetcher
            .get_text(&Self::url(&request.shortcode), &headers)
            .await?;

        if let Some(candidate) = payload::first_video_url_field(&html) {
            return Ok(Some(Hit {
                video_url: candidate.url,
                thumbnail_url: payload::thumbnail(&html),
                title: payload::title(&html, "Instagram Reels Video"),
                is_ad: false,
            }));
        }
        Ok(payload::video_element_src(&html).map(|candidate| Hit {
            video_url: candidate.url,
            thumbnail_url: None,
            title: "Instagram Video".to_string(),
            is_ad: false,
        }))
    }
}

pub struct LegacyApiStrategy {
    path: &'static str,
}

impl LegacyApiStrategy {
    pub fn url(&self, shortcode: &str) -> String {
        format!(
            "https://www.instagram.com/{}/{}/?__a=1&__d=dis",
            self.path, shortcode
        )
    }
}

#[async_trait]
impl Strategy for LegacyApiStrategy {
    fn name(&self) -> String {
        format!("legacy-api:{}", self.path)
    }

    async fn attempt(
        &self,
        fetcher: &dyn PageFetcher,
        request: &PostRequest,
    ) -> Result<Option<Hit>, ResolveError> {
        let url = self.url(&request.shortcode);
        info!("Legacy API request: {:.60}", url);
        let body = fetcher.get_text(&url, &request.headers).await?;
        debug!("Legacy API response length: {}", body.len());
        Ok(json_hit(&body, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requests and answers every one with the same body.
    struct Canned {
        body: &'static str,
        seen: Mutex<Vec<(String, Headers)>>,
    }

    #[async_trait]
    impl PageFetcher for Canned {
        async fn get_text(&self, url: &str, headers: &Headers) -> Result<String, ResolveError> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), headers.clone()));
            Ok(self.body.to_string())
        }
    }

    fn request() -> PostRequest {
        PostRequest {
            shortcode: "DAbc123".to_string(),
            headers: vec![
                ("accept", "*/*".to_string()),
                ("x-ig-app-id", "936619743392459".to_string()),
            ],
        }
    }

    #[test]
    fn test_default_ladder_order() {
        let names: Vec<String> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "graphql:8845758582119845",
                "graphql:7153581528070080",
                "embed",
                "legacy-api:reel",
                "legacy-api:p",
            ]
        );
    }

    #[test]
    fn test_graphql_url_encodes_variables() {
        let strategy = GraphQlStrategy {
            doc_id: GRAPHQL_DOC_IDS[0],
        };
        assert_eq!(
            strategy.url("DAbc123"),
            "https://www.instagram.com/graphql/query/?doc_id=8845758582119845&variables=%7B%22shortcode%22%3A%22DAbc123%22%7D"
        );
    }

    #[test]
    fn test_legacy_urls() {
        let reel = LegacyApiStrategy { path: "reel" };
        assert_eq!(
            reel.url("DAbc123"),
            "https://www.instagram.com/reel/DAbc123/?__a=1&__d=dis"
        );
    }

    #[tokio::test]
    async fn test_graphql_flags_ads() {
        let fetcher = Canned {
            body: r#"{"product_type":"ad","video_url":"https://cdn/v/a.mp4"}"#,
            seen: Mutex::new(Vec::new()),
        };
        let strategy = GraphQlStrategy {
            doc_id: GRAPHQL_DOC_IDS[0],
        };
        let hit = strategy.attempt(&fetcher, &request()).await.unwrap().unwrap();
        assert!(hit.is_ad);
        assert_eq!(hit.title, "Instagram Reels Video");
    }

    #[tokio::test]
    async fn test_embed_swaps_accept_header_and_reads_video_element() {
        let fetcher = Canned {
            body: r#"<div><video playsinline src="https://cdn/v/clip.mp4?a=1"></video></div>"#,
            seen: Mutex::new(Vec::new()),
        };
        let hit = EmbedStrategy.attempt(&fetcher, &request()).await.unwrap().unwrap();
        assert_eq!(hit.video_url, "https://cdn/v/clip.mp4?a=1");
        assert_eq!(hit.title, "Instagram Video");
        assert_eq!(hit.thumbnail_url, None);

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(seen[0].0, "https://www.instagram.com/p/DAbc123/embed/");
        assert_eq!(seen[0].1[0], ("accept", HTML_ACCEPT.to_string()));
        assert_eq!(seen[0].1[1].0, "x-ig-app-id");
    }

    #[tokio::test]
    async fn test_no_video_is_empty_not_error() {
        let fetcher = Canned {
            body: r#"{"status":"ok"}"#,
            seen: Mutex::new(Vec::new()),
        };
        let legacy = LegacyApiStrategy { path: "p" };
        assert_eq!(legacy.attempt(&fetcher, &request()).await.unwrap(), None);
    }
}
