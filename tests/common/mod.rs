//! In-process stand-ins for the external collaborators: no network, no
//! browser, no yt-dlp.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidresolve::resolver::MediaInfo;
use vidresolve::session::SessionStore;
use vidresolve::tools::browser::{BrowserLauncher, BrowserSession, LaunchOptions, ResponseObserver};
use vidresolve::tools::http::{Headers, PageFetcher};
use vidresolve::tools::ytdlp::{DownloaderProcess, FormatExtractor};
use vidresolve::ResolveError;

// ============================================================
// HTTP
// ============================================================

/// Answers by the first route whose key is a substring of the URL. Unrouted
/// URLs fail as transport errors.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Vec<(String, Result<String, String>)>,
    pub requests: Mutex<Vec<(String, Headers)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, url_part: &str, body: impl Into<String>) -> Self {
        self.routes.push((url_part.to_string(), Ok(body.into())));
        self
    }

    pub fn fail(mut self, url_part: &str, message: &str) -> Self {
        self.routes.push((url_part.to_string(), Err(message.to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn get_text(&self, url: &str, headers: &Headers) -> Result<String, ResolveError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), headers.clone()));
        match self.routes.iter().find(|(part, _)| url.contains(part.as_str())) {
            Some((_, Ok(body))) => Ok(body.clone()),
            Some((_, Err(message))) => Err(ResolveError::Transport(message.clone())),
            None => Err(ResolveError::Transport(format!("HTTP 404 from {}", url))),
        }
    }
}

// ============================================================
// Sessions
// ============================================================

#[derive(Default)]
pub struct MemorySessions {
    values: HashMap<String, String>,
    pub lookups: AtomicUsize,
}

impl MemorySessions {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn get(&self, key: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.values.get(key).cloned()
    }
}

// ============================================================
// yt-dlp roles
// ============================================================

pub enum DownloadBehavior {
    /// Exit cleanly after writing this many bytes
    Write(usize),
    /// Exit non-zero without output
    Fail,
}

pub struct StubDownloader {
    behavior: DownloadBehavior,
    pub calls: Mutex<Vec<(String, PathBuf, Option<PathBuf>)>>,
}

impl StubDownloader {
    pub fn new(behavior: DownloadBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DownloaderProcess for StubDownloader {
    async fn download(
        &self,
        target_url: &str,
        output: &Path,
        cookie_file: Option<&Path>,
    ) -> Result<(), ResolveError> {
        self.calls.lock().unwrap().push((
            target_url.to_string(),
            output.to_path_buf(),
            cookie_file.map(Path::to_path_buf),
        ));
        match self.behavior {
            DownloadBehavior::Write(size) => {
                tokio::fs::write(output, vec![0u8; size]).await?;
                Ok(())
            }
            DownloadBehavior::Fail => Err(ResolveError::ProcessFailure(
                "yt-dlp exited with exit status: 1".to_string(),
            )),
        }
    }
}

pub struct StubExtractor {
    result: Result<MediaInfo, String>,
    pub calls: Mutex<Vec<(String, Option<PathBuf>)>>,
}

impl StubExtractor {
    pub fn returning(info: MediaInfo) -> Self {
        Self {
            result: Ok(info),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl FormatExtractor for StubExtractor {
    async fn dump(&self, url: &str, cookie_file: Option<&Path>) -> Result<MediaInfo, ResolveError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), cookie_file.map(Path::to_path_buf)));
        self.result
            .clone()
            .map_err(ResolveError::Transport)
    }
}

// ============================================================
// Browser
// ============================================================

/// What a scripted page does once loaded.
#[derive(Clone, Default)]
pub struct PageScript {
    pub launch_fails: bool,
    pub navigation_fails: bool,
    /// Response URLs reported during navigation
    pub responses: Vec<String>,
    /// Response URLs reported during the settle delay
    pub late_responses: Vec<String>,
    pub content: String,
    pub frames: Vec<String>,
}

pub struct StubLauncher {
    script: PageScript,
    pub live: Arc<AtomicUsize>,
    pub launches: AtomicUsize,
}

impl StubLauncher {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            live: Arc::new(AtomicUsize::new(0)),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for StubLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserSession>, ResolveError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.script.launch_fails {
            return Err(ResolveError::Browser("launch: no browser binary".to_string()));
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSession {
            script: self.script.clone(),
            live: Arc::clone(&self.live),
        }))
    }
}

struct StubSession {
    script: PageScript,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for StubSession {
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        observer: &mut ResponseObserver<'_>,
    ) -> Result<(), ResolveError> {
        for response in &self.script.responses {
            observer(response);
        }
        if self.script.navigation_fails {
            return Err(ResolveError::Transport(format!(
                "navigation to {} timed out after {:?}",
                url, timeout
            )));
        }
        Ok(())
    }

    async fn settle(&mut self, _delay: Duration, observer: &mut ResponseObserver<'_>) {
        for response in &self.script.late_responses {
            observer(response);
        }
    }

    async fn content(&mut self) -> Result<String, ResolveError> {
        Ok(self.script.content.clone())
    }

    async fn frame_contents(&mut self) -> Result<Vec<String>, ResolveError> {
        Ok(self.script.frames.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), ResolveError> {
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
