use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::gateway::Ready;
use serenity::model::voice::VoiceState;
use serenity::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

use crate::commands::music::utils::music_manager::MusicManager;
use crate::commands::music::utils::voice;

/// Gateway events the music player reacts to
pub struct Handler {
    music: Arc<MusicManager>,
}

impl Handler {
    pub fn new(music: Arc<MusicManager>) -> Self {
        Self { music }
    }
}

#[async_trait]
impl serenity::prelude::EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Connected as {}", ready.user.name);
    }

    /// A bot disconnected from voice counts as having no listeners.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        if !self.music.has_queue(guild_id) {
            return;
        }

        match voice::listeners_with_bot(&ctx, guild_id) {
            Some(listeners) => {
                debug!("Guild {} voice update, {} listeners", guild_id, listeners);
                self.music.presence_changed(guild_id, listeners);
            }
            None => debug!("Guild {} voice update for an uncached guild", guild_id),
        }
    }
}
