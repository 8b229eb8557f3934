//! Side-effecting collaborators behind the built-in intents.
//!
//! The session only needs each executor's result; how a URL gets opened or
//! where a forecast comes from is up to the implementation. Failures are
//! `NexaError::Upstream` and are turned into per-intent apology responses
//! by the session, never propagated out of the command loop.

pub mod lookup;
pub mod stub;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpLookup;
pub use lookup::{EndpointConfig, LookupEndpoints};
pub use stub::StubActions;

use crate::error::Result;

/// One call per built-in intent.
pub trait ActionExecutor: Send + Sync {
    /// Short forecast descriptions for a city.
    fn weather(&self, city: &str) -> Result<Vec<String>>;

    /// Current headlines.
    fn news(&self) -> Result<Vec<String>>;

    fn joke(&self) -> Result<String>;

    fn quote(&self) -> Result<String>;

    /// Display string for the latest price of `symbol`.
    fn stock(&self, symbol: &str) -> Result<String>;

    /// Recipe titles using `ingredient`.
    fn recipes(&self, ingredient: &str) -> Result<Vec<String>>;

    /// Start playback for `query`.
    fn play(&self, query: &str) -> Result<()>;

    /// Open a web search for `query`.
    fn search(&self, query: &str) -> Result<()>;

    /// Open a known platform. `Ok(false)` when the name is not recognised.
    fn open_platform(&self, platform: &str) -> Result<bool>;

    fn battery(&self) -> Result<String>;

    /// Per-volume usage summary.
    fn storage(&self) -> Result<String>;

    /// Root filesystem totals.
    fn disk_usage(&self) -> Result<String>;

    fn empty_recycle_bin(&self) -> Result<String>;
}

const PLATFORMS: &[(&str, &str)] = &[
    ("facebook", "https://www.facebook.com/"),
    ("instagram", "https://www.instagram.com/"),
    ("tiktok", "https://www.tiktok.com/"),
    ("youtube", "https://www.youtube.com/"),
    ("twitter", "https://twitter.com/"),
    ("github", "https://github.com/"),
];

/// Home page for a platform name, case-insensitive.
pub fn platform_url(name: &str) -> Option<&'static str> {
    let name = name.trim();
    PLATFORMS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, url)| *url)
}

pub fn play_url(query: &str) -> String {
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(query)
    )
}

pub fn search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", urlencoding::encode(query))
}
