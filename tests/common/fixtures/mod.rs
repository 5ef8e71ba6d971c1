//! Sample tracks and a ready-to-drive `MusicManager`.

use std::sync::Arc;
use std::time::Duration;

use rstest::fixture;
use serenity::model::id::GuildId;
use tokio::sync::mpsc::UnboundedReceiver;

use jukebox::commands::music::audio_sources::{Requester, Track};
use jukebox::commands::music::utils::autoplay_manager::RankedSampler;
use jukebox::commands::music::utils::guild_player::PlayerSettings;
use jukebox::commands::music::utils::music_manager::MusicManager;
use jukebox::commands::music::utils::notifications::{MusicEvent, MusicEventKind};

use super::mocks::{FakeConnector, FakeOpener, MockRecommender, silent_recommender};

/// Sample user ID for testing
pub const SAMPLE_USER_ID: u64 = 123456789;

/// URL the fakes use for a track id.
pub fn url_for(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// A track with a known length, as a resolver would return it.
pub fn track(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), url_for(id))
        .with_duration(Some(Duration::from_secs(180)))
}

/// A track queued by the sample user.
pub fn requested(id: &str) -> Track {
    track(id).with_requester(Requester {
        id: SAMPLE_USER_ID,
        name: "tester".to_string(),
    })
}

#[fixture]
pub fn guild() -> GuildId {
    GuildId::new(42)
}

/// Everything a test needs to drive players and observe them.
pub struct Harness {
    pub manager: MusicManager,
    pub events: UnboundedReceiver<MusicEvent>,
    pub connector: Arc<FakeConnector>,
    pub opener: Arc<FakeOpener>,
}

impl Harness {
    /// Builds a manager with deterministic autoplay picks.
    pub fn new(recommender: MockRecommender) -> Self {
        Self::with_settings(recommender, PlayerSettings::default())
    }

    pub fn with_settings(recommender: MockRecommender, settings: PlayerSettings) -> Self {
        let connector = Arc::new(FakeConnector::default());
        let opener = Arc::new(FakeOpener::default());
        let (manager, events) = MusicManager::new(
            connector.clone(),
            opener.clone(),
            Arc::new(recommender),
            settings,
        );
        let manager = manager.with_sampler(|| Box::new(RankedSampler));

        Self {
            manager,
            events,
            connector,
            opener,
        }
    }

    /// Events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<MusicEventKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }
}

#[fixture]
pub fn harness() -> Harness {
    Harness::new(silent_recommender())
}

/// Lets spawned players work through their mailboxes. Tests run on a paused
/// clock, so this returns once every task is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Ids of the tracks in a now-playing event, in order.
pub fn now_playing_ids(events: &[MusicEventKind]) -> Vec<String> {
    events
        .iter()
        .filter_map(|kind| match kind {
            MusicEventKind::NowPlaying(track) => Some(track.id.clone()),
            _ => None,
        })
        .collect()
}
