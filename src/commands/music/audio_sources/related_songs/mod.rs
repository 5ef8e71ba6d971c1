//! This module defines the trait and implementation for fetching songs related
//! to a given track, used by the autoplay feature.

/// Implementation using the YouTube Music radio mix through `yt-dlp`.
pub mod ytdl;

use crate::commands::music::audio_sources::track_metadata::Track;
use serenity::async_trait;

/// Source of "related" tracks for autoplay.
///
/// Returns candidates in the order the provider ranked them. Errors are
/// collapsed into an empty list so that a failing provider only ever means
/// "nothing to autoplay".
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Fetches up to `limit` tracks related to the track identified by `track_id`.
    async fn related(&self, track_id: &str, limit: usize) -> Vec<Track>;
}
