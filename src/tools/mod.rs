//! External collaborators: browser, HTTP, yt-dlp and cookie files

pub mod browser;
pub mod cookies;
pub mod http;
pub mod ytdlp;

pub use browser::{BrowserLauncher, BrowserSession, ChromeLauncher, LaunchOptions};
pub use http::{Headers, PageFetcher, ReqwestFetcher};
pub use ytdlp::{DownloaderProcess, FormatExtractor, YtDlp};
