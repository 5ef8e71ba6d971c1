//! Defines `Track`, the unified representation of a playable unit of audio,
//! and `Requester`, the identity of whoever queued it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity of the user who queued a track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requester {
    /// Platform user id.
    pub id: u64,
    /// Display name at the time of the request.
    pub name: String,
}

/// A playable track as resolved from a query or injected by autoplay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// The title of the track.
    pub title: String,
    /// Stable identifier assigned by the resolver (e.g. a YouTube video id).
    pub id: String,
    /// The canonical, playable URL.
    pub url: String,
    /// The duration of the track. `None` means live or unbounded.
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
    /// Whether the track was injected by autoplay rather than requested.
    #[serde(default)]
    pub is_autoplay: bool,
    /// Who requested the track. Always `None` for autoplay tracks.
    pub requested_by: Option<Requester>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            url: url.into(),
            duration: None,
            thumbnail: None,
            is_autoplay: false,
            requested_by: None,
        }
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    /// Attaches the requester, marking the track as explicitly queued.
    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requested_by = Some(requester);
        self.is_autoplay = false;
        self
    }

    /// Tags the track as injected by autoplay. Autoplay tracks carry no requester.
    pub fn into_autoplay(mut self) -> Self {
        self.is_autoplay = true;
        self.requested_by = None;
        self
    }

    /// Whether the track has no known end (live streams).
    pub fn is_live(&self) -> bool {
        self.duration.is_none()
    }

    /// Name to display in the "Requested by" field.
    pub fn requester_label(&self) -> &str {
        match (&self.requested_by, self.is_autoplay) {
            (_, true) => "Autoplay",
            (Some(requester), false) => &requester.name,
            (None, false) => "Unknown",
        }
    }
}
