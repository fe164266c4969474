//! Runtime settings for the acquisition engine.
//!
//! Every value has a built-in default and can be overridden through an
//! `ALKIT_*` environment variable.

use alkit_schema::Country;
use std::path::PathBuf;

/// Default distribution CDN.
pub const DEFAULT_CDN_URL: &str = "https://bcartifacts-exdbf9fwegejdqak.b02.azurefd.net";

/// Default release channel.
pub const DEFAULT_CHANNEL: &str = "sandbox";

/// Microsoft symbols feed (flat container).
pub const MICROSOFT_SYMBOLS_FEED: &str =
    "https://dynamicssmb2.pkgs.visualstudio.com/DynamicsBCPublicFeeds/_packaging/MSSymbols/nuget/v3/flat2";

/// ISV / partner symbols feed (flat container).
pub const APPSOURCE_SYMBOLS_FEED: &str =
    "https://dynamicssmb2.pkgs.visualstudio.com/DynamicsBCPublicFeeds/_packaging/AppSourceSymbols/nuget/v3/flat2";

/// Default number of symbol packages downloaded at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// One package feed, tried in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Short name used in logs.
    pub name: String,
    /// Flat-container base URL, without a trailing slash.
    pub base_url: String,
}

impl FeedConfig {
    /// Create a feed entry, normalizing the trailing slash away.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Settings shared by the cache, the release index and the symbol resolver.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Distribution CDN base URL.
    pub cdn_url: String,
    /// Release channel (e.g. `sandbox`, `onprem`).
    pub channel: String,
    /// Root directory of the artifact cache.
    pub cache_root: PathBuf,
    /// Symbol feeds, in search order.
    pub feeds: Vec<FeedConfig>,
    /// Localization for country-qualified symbol packages.
    pub country: Country,
    /// Maximum concurrent symbol downloads.
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cdn_url: DEFAULT_CDN_URL.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            cache_root: crate::paths::cache_root(),
            feeds: default_feeds(),
            country: Country::worldwide(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// The two public symbol feeds, Microsoft first.
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new("microsoft", MICROSOFT_SYMBOLS_FEED),
        FeedConfig::new("appsource", APPSOURCE_SYMBOLS_FEED),
    ]
}

impl Settings {
    /// Load settings from environment variables over the defaults.
    ///
    /// Recognized: `ALKIT_CDN_URL`, `ALKIT_CHANNEL`, `ALKIT_CACHE_DIR`,
    /// `ALKIT_COUNTRY`, `ALKIT_CONCURRENCY`, `ALKIT_MS_FEED_URL` and
    /// `ALKIT_APPSOURCE_FEED_URL`. Unparseable numbers fall back silently.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(url) = std::env::var("ALKIT_CDN_URL") {
            settings.cdn_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(channel) = std::env::var("ALKIT_CHANNEL") {
            settings.channel = channel;
        }
        if let Ok(country) = std::env::var("ALKIT_COUNTRY") {
            settings.country = Country::new(&country);
        }
        if let Some(n) = std::env::var("ALKIT_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            settings.concurrency = n;
        }
        if let Ok(url) = std::env::var("ALKIT_MS_FEED_URL") {
            settings.feeds[0] = FeedConfig::new("microsoft", url);
        }
        if let Ok(url) = std::env::var("ALKIT_APPSOURCE_FEED_URL") {
            settings.feeds[1] = FeedConfig::new("appsource", url);
        }

        settings
    }

    /// Index of published releases for the configured channel.
    pub fn index_url(&self) -> String {
        format!("{}/{}/indexes/platform.json", self.cdn_url, self.channel)
    }

    /// The outer distribution archive for a concrete release.
    pub fn artifact_url(&self, full_version: &str) -> String {
        format!("{}/{}/{}/platform", self.cdn_url, self.channel, full_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let settings = Settings {
            cdn_url: "https://cdn.example".to_string(),
            channel: "onprem".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.index_url(),
            "https://cdn.example/onprem/indexes/platform.json"
        );
        assert_eq!(
            settings.artifact_url("27.0.1.2"),
            "https://cdn.example/onprem/27.0.1.2/platform"
        );
    }

    #[test]
    fn test_feed_order_and_normalization() {
        let feeds = default_feeds();
        assert_eq!(feeds[0].name, "microsoft");
        assert_eq!(feeds[1].name, "appsource");
        assert_eq!(FeedConfig::new("x", "http://a/b/").base_url, "http://a/b");
    }
}
