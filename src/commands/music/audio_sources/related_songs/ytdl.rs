//! Implements `RecommendationSource` using `yt-dlp` against the YouTube Music
//! radio mix ("RD" playlist) seeded by a video id.

use crate::commands::music::audio_sources::track_metadata::Track;
use crate::commands::music::audio_sources::youtube::YtDlpInfo;
use serenity::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::RecommendationSource;

/// Canonical YouTube Music watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://music.youtube.com/watch?v={}", video_id)
}

/// The radio mix playlist seeded by `video_id`.
pub fn mix_url(video_id: &str) -> String {
    format!(
        "https://music.youtube.com/watch?v={}&list=RD{}",
        video_id, video_id
    )
}

/// Parses flat-playlist JSON lines into tracks, dropping the seed itself,
/// entries without an id, and anything past `limit`.
pub fn parse_mix_entries(stdout: &str, seed_id: &str, limit: usize) -> Vec<Track> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<YtDlpInfo>(line) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("Skipping unparsable mix entry: {}", e);
                None
            }
        })
        .filter(|info| info.id.as_deref() != Some(seed_id))
        .filter_map(|info| {
            let fallback = info.id.as_deref().map(watch_url);
            info.into_track(fallback)
        })
        .take(limit)
        .collect()
}

/// Fetches related songs from the YouTube Music mix of a video.
pub struct YtDlpFetcher {
    binary: String,
}

impl YtDlpFetcher {
    /// Creates a new `YtDlpFetcher` that runs the given `yt-dlp` binary.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl RecommendationSource for YtDlpFetcher {
    async fn related(&self, track_id: &str, limit: usize) -> Vec<Track> {
        info!("Fetching autoplay candidates for video: {}", track_id);

        // One extra entry: the mix starts with the seed itself.
        let playlist_end = (limit + 1).to_string();
        let output = Command::new(&self.binary)
            .args([
                "--dump-json",
                "--flat-playlist",
                "--playlist-end",
                &playlist_end,
                "--no-warnings",
                &mix_url(track_id),
            ])
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {} for mix {}: {}", self.binary, track_id, e);
                return Vec::new();
            }
        };

        let tracks = parse_mix_entries(&String::from_utf8_lossy(&output.stdout), track_id, limit);
        info!("Fetched {} autoplay candidates for {}", tracks.len(), track_id);
        tracks
    }
}
