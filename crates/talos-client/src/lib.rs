pub mod client;
pub mod extract;
pub mod jobs;
pub mod options;
pub mod poller;
pub mod transport;
pub mod watcher;

pub use client::{ClientConfig, DEFAULT_API_URL, TalosClient};
pub use options::{CrawlOptions, ExtractOptions, Format, MapOptions, ScrapeOptions};
pub use transport::Transport;
pub use watcher::{CrawlWatcher, WatcherCloseHandle, WatcherState};
