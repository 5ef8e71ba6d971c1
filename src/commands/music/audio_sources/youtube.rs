//! Implements `TrackResolver` using the `yt-dlp` command-line tool.
//! Searches the YouTube Music index first and falls back to general YouTube search.

use serde::Deserialize;
use serenity::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use super::{AudioSource, Track, TrackResolver};

/// Where a free-text query is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// The YouTube Music catalogue.
    Music,
    /// Regular YouTube search.
    General,
}

impl SearchScope {
    /// Strategies in the order they are tried.
    pub const ORDER: [SearchScope; 2] = [SearchScope::Music, SearchScope::General];

    /// Turns a free-text query into the argument handed to `yt-dlp`.
    pub fn target(self, query: &str) -> String {
        match self {
            SearchScope::Music => {
                let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
                format!("https://music.youtube.com/search?q={}", encoded)
            }
            SearchScope::General => format!("ytsearch1:{}", query),
        }
    }
}

/// The subset of `yt-dlp --dump-json` output we care about.
#[derive(Debug, Deserialize)]
pub struct YtDlpInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub webpage_url: Option<String>,
    pub url: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpInfo {
    /// Unwraps search/playlist results to their first entry.
    fn first_entry(self) -> Option<YtDlpInfo> {
        match self.entries {
            Some(entries) => entries.into_iter().next(),
            None => Some(self),
        }
    }

    /// Converts into a `Track`, falling back to `fallback_url` when the entry
    /// carries no URL of its own. Entries without an id are not playable.
    pub fn into_track(self, fallback_url: Option<String>) -> Option<Track> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let url = self.webpage_url.or(self.url).or(fallback_url)?;
        let title = self.title.unwrap_or_else(|| "Unknown Title".to_string());
        let duration = self
            .duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64);

        Some(
            Track::new(id, title, url)
                .with_duration(duration)
                .with_thumbnail(self.thumbnail),
        )
    }
}

/// Parses the stdout of `yt-dlp --dump-json` into a single track.
pub fn parse_track(stdout: &str) -> Option<Track> {
    let line = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    let info: YtDlpInfo = match serde_json::from_str(line) {
        Ok(info) => info,
        Err(e) => {
            debug!("Failed to parse yt-dlp output: {}", e);
            return None;
        }
    };
    info.first_entry()?.into_track(None)
}

/// `TrackResolver` backed by `yt-dlp`.
pub struct YoutubeApi {
    binary: String,
}

impl YoutubeApi {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs `yt-dlp --dump-json` against a URL or search target.
    async fn dump_json(&self, target: &str) -> Option<Track> {
        let output = Command::new(&self.binary)
            .args([
                "--dump-json",
                "--no-playlist",
                "--no-warnings",
                "--playlist-items",
                "1",
                target,
            ])
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {}: {}", self.binary, e);
                return None;
            }
        };

        if !output.status.success() {
            debug!("yt-dlp exited with {} for {}", output.status, target);
        }

        parse_track(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for YoutubeApi {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl TrackResolver for YoutubeApi {
    async fn resolve(&self, query: &str) -> Option<Track> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        info!("Searching for: {}", query);

        if AudioSource::is_url(query) {
            return self.dump_json(query).await;
        }

        for scope in SearchScope::ORDER {
            if let Some(track) = self.dump_json(&scope.target(query)).await {
                info!("Found ({:?}): {}", scope, track.title);
                return Some(track);
            }
            debug!("No {:?} result for: {}", scope, query);
        }

        warn!("Nothing found for: {}", query);
        None
    }
}
