use poise::serenity_prelude as serenity;
use serenity::async_trait;
use tracing::{debug, warn};

use super::playback_sink::StreamEndSignal;

/// Songbird event handler that forwards track end and error events to the
/// guild worker.
pub struct StreamEndNotifier {
    signal: StreamEndSignal,
}

impl StreamEndNotifier {
    pub fn new(signal: StreamEndSignal) -> Self {
        Self { signal }
    }
}

#[async_trait]
impl songbird::EventHandler for StreamEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                if let songbird::tracks::PlayMode::Errored(e) = &state.playing {
                    warn!(
                        "Stream generation {} errored: {}",
                        self.signal.generation(),
                        e
                    );
                }
            }
            debug!("Stream generation {} ended", self.signal.generation());
            self.signal.notify();
        }
        None
    }
}
