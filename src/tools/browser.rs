//! Headless browser automation
//!
//! Resolvers talk to the browser through [`BrowserLauncher`] and
//! [`BrowserSession`], injected at construction. The production launcher
//! drives Chrome over the DevTools protocol with chromiumoxide; one browser
//! process is launched per session and torn down by [`BrowserSession::close`].

use crate::utils::error::ResolveError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Receives every response URL, one at a time, in arrival order.
pub type ResponseObserver<'a> = dyn FnMut(&str) + Send + 'a;

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub args: Vec<String>,
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub executable: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            args: [
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--disable-web-security",
                "--disable-features=IsolateOrigins,site-per-process",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            user_agent: DESKTOP_USER_AGENT.to_string(),
            viewport: (1920, 1080),
            executable: None,
        }
    }
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start one browser instance with a single blank page.
    ///
    /// Implementations must release anything they acquired when launching
    /// fails partway.
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>, ResolveError>;
}

#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the page to load, bounded by `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        observer: &mut ResponseObserver<'_>,
    ) -> Result<(), ResolveError>;

    /// Keep observing responses for a fixed delay.
    async fn settle(&mut self, delay: Duration, observer: &mut ResponseObserver<'_>);

    /// Rendered markup of the top document.
    async fn content(&mut self) -> Result<String, ResolveError>;

    /// Rendered markup of every child frame that can be read.
    async fn frame_contents(&mut self) -> Result<Vec<String>, ResolveError>;

    /// Tear down the browser instance.
    async fn close(self: Box<Self>) -> Result<(), ResolveError>;
}

fn browser_err(context: &str, e: impl std::fmt::Display) -> ResolveError {
    ResolveError::Browser(format!("{}: {}", context, e))
}

/// Chrome launched through chromiumoxide.
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    live: Arc<AtomicUsize>,
}

impl ChromeLauncher {
    /// Resolve the browser executable once: the configured path, else a
    /// Chrome/Chromium binary on PATH, else chromiumoxide's own detection.
    pub fn init(configured: Option<PathBuf>) -> Self {
        let executable = configured.or_else(|| {
            ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
                .iter()
                .find_map(|name| which::which(name).ok())
        });
        match &executable {
            Some(path) => debug!("Browser executable: {:?}", path),
            None => debug!("Browser executable left to auto-detection"),
        }
        Self {
            executable,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Browser instances launched and not yet torn down.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    async fn open_page(browser: &Browser, options: &LaunchOptions) -> Result<Page, ResolveError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_err("new page", e))?;
        page.set_user_agent(options.user_agent.clone())
            .await
            .map_err(|e| browser_err("set user agent", e))?;
        page.execute(EnableParams::default())
            .await
            .map_err(|e| browser_err("enable network events", e))?;
        Ok(page)
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>, ResolveError> {
        let (width, height) = options.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Default::default()
            })
            .args(options.args.clone());
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = options.executable.as_ref().or(self.executable.as_ref()) {
            builder = builder.chrome_executable(exe);
        }
        let config = builder.build().map_err(|e| browser_err("config", e))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_err("launch", e))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        self.live.fetch_add(1, Ordering::SeqCst);

        let page = match Self::open_page(&browser, options).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                self.live.fetch_sub(1, Ordering::SeqCst);
                return Err(e);
            }
        };
        let responses = match page.event_listener::<EventResponseReceived>().await {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Failed to subscribe to response events: {}", e);
                None
            }
        };

        debug!("Browser instance launched");
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            page,
            responses,
            handler_task: Some(handler_task),
            live: Arc::clone(&self.live),
        }))
    }
}

/// Walks the frame tree from the top document. Each readable frame yields its
/// markup and its own child frames; unreadable frames yield empty markup.
const FRAME_TREE_SCRIPT: &str = r#"
(() => {
    const walk = doc => Array.from(doc.querySelectorAll('iframe, frame')).map(f => {
        let inner = null;
        try { inner = f.contentDocument; } catch (e) {}
        if (!inner || !inner.documentElement) return { markup: '', frames: [] };
        return { markup: inner.documentElement.outerHTML, frames: walk(inner) };
    });
    return walk(document);
})()
"#;

/// One embedded frame as reported by [`FRAME_TREE_SCRIPT`].
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FrameNode {
    pub markup: String,
    pub frames: Vec<FrameNode>,
}

/// Frame markup in document order, parents before their children. Frames
/// that could not be read are skipped, their descendants are not.
pub fn flatten_frames(nodes: Vec<FrameNode>) -> Vec<String> {
    fn walk(nodes: Vec<FrameNode>, out: &mut Vec<String>) {
        for node in nodes {
            if !node.markup.is_empty() {
                out.push(node.markup);
            }
            walk(node.frames, out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

pub struct ChromeSession {
    browser: Option<Browser>,
    page: Page,
    responses: Option<EventStream<EventResponseReceived>>,
    handler_task: Option<JoinHandle<()>>,
    live: Arc<AtomicUsize>,
}

impl ChromeSession {
    /// Feed pending response events to `observer` until `until` resolves.
    async fn pump<F, T>(
        responses: &mut Option<EventStream<EventResponseReceived>>,
        until: F,
        observer: &mut ResponseObserver<'_>,
    ) -> T
    where
        F: std::future::Future<Output = T>,
    {
        tokio::pin!(until);
        loop {
            let Some(stream) = responses.as_mut() else {
                return until.await;
            };
            let event = tokio::select! {
                out = &mut until => return out,
                event = stream.next() => event,
            };
            match event {
                Some(event) => observer(&event.response.url),
                None => *responses = None,
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        observer: &mut ResponseObserver<'_>,
    ) -> Result<(), ResolveError> {
        let page = &self.page;
        let goto = tokio::time::timeout(timeout, page.goto(url));
        match Self::pump(&mut self.responses, goto, observer).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(browser_err("navigation", e)),
            Err(_) => Err(ResolveError::Transport(format!(
                "navigation to {} timed out after {:?}",
                url, timeout
            ))),
        }
    }

    async fn settle(&mut self, delay: Duration, observer: &mut ResponseObserver<'_>) {
        Self::pump(&mut self.responses, tokio::time::sleep(delay), observer).await;
    }

    async fn content(&mut self) -> Result<String, ResolveError> {
        self.page
            .content()
            .await
            .map_err(|e| browser_err("read content", e))
    }

    async fn frame_contents(&mut self) -> Result<Vec<String>, ResolveError> {
        let result = self
            .page
            .evaluate(FRAME_TREE_SCRIPT)
            .await
            .map_err(|e| browser_err("read frames", e))?;
        let tree: Vec<FrameNode> = result
            .into_value()
            .map_err(|e| browser_err("decode frames", e))?;
        Ok(flatten_frames(tree))
    }

    async fn close(self: Box<Self>) -> Result<(), ResolveError> {
        let mut this = self;
        let Some(mut browser) = this.browser.take() else {
            return Ok(());
        };
        let closed = browser.close().await.map(|_| ());
        let _ = browser.wait().await;
        if let Some(task) = this.handler_task.take() {
            task.abort();
        }
        this.live.fetch_sub(1, Ordering::SeqCst);
        debug!("Browser instance closed");
        closed.map_err(|e| browser_err("close", e))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Reached when the owning future is cancelled before close().
        if let Some(mut browser) = self.browser.take() {
            self.live.fetch_sub(1, Ordering::SeqCst);
            let handler_task = self.handler_task.take();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = browser.close().await {
                            warn!("Browser drop cleanup failed: {}", e);
                        }
                        let _ = browser.wait().await;
                        if let Some(task) = handler_task {
                            task.abort();
                        }
                    });
                }
                Err(_) => {
                    warn!("No runtime for browser cleanup; relying on process kill on drop");
                    if let Some(task) = handler_task {
                        task.abort();
                    }
                }
            }
        }
    }
}
