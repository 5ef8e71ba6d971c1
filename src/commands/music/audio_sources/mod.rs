//! This module defines the collaborators that turn user input into playable
//! tracks: the `TrackResolver` trait and its `yt-dlp` implementation, the
//! `Track` model, and the related-songs sources used by autoplay.

/// Submodule for finding related songs, used by autoplay.
pub mod related_songs;
/// Submodule defining the `Track` struct used across the music core.
pub mod track_metadata;
/// Submodule implementing `TrackResolver` on top of `yt-dlp`.
pub mod youtube;

use serenity::async_trait;
use url::Url;

pub use track_metadata::{Requester, Track};

/// Resolves a free-text query or URL into at most one playable track.
///
/// Implementations collapse every failure (spawn errors, malformed output,
/// empty results) into `None`; the caller reports "not found" and leaves all
/// queue state untouched.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Option<Track>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as an http(s) URL.
    /// Does not validate if the URL is actually reachable.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input.trim())
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}
