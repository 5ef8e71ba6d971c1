//! Events emitted by the guild players, and the task that posts them to the
//! guild's music channel.

use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serenity::all::CreateMessage;
use serenity::model::id::{ChannelId, GuildId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::Track;

use super::embedded_messages;

/// Why a guild player was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartReason {
    /// Nothing was queued for the whole idle timeout.
    Inactivity,
    /// Every listener left the voice channel.
    NoListeners,
    /// Someone asked the bot to leave.
    Requested,
}

impl fmt::Display for DepartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepartReason::Inactivity => f.write_str("inactivity"),
            DepartReason::NoListeners => f.write_str("no listeners"),
            DepartReason::Requested => f.write_str("leave requested"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MusicEventKind {
    NowPlaying(Track),
    Enqueued { track: Track, position: usize },
    Skipped(Track),
    Stopped,
    Paused,
    Resumed,
    AutoplayTriggered {
        seed: Track,
        added: Vec<Track>,
        history_reset: bool,
    },
    Departed(DepartReason),
}

impl MusicEventKind {
    /// Events that answer a command and are already shown as its reply.
    pub fn is_command_ack(&self) -> bool {
        matches!(
            self,
            MusicEventKind::Enqueued { .. }
                | MusicEventKind::Skipped(_)
                | MusicEventKind::Stopped
                | MusicEventKind::Paused
                | MusicEventKind::Resumed
        )
    }
}

/// A notification for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicEvent {
    pub guild_id: GuildId,
    pub kind: MusicEventKind,
}

/// Posts player events to the text channel each guild last used for a music
/// command.
pub fn spawn_notifier(
    http: Arc<serenity::Http>,
    channels: Arc<DashMap<GuildId, ChannelId>>,
    mut events: UnboundedReceiver<MusicEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if event.kind.is_command_ack() {
                continue;
            }

            let Some(channel_id) = channels.get(&event.guild_id).map(|entry| *entry.value())
            else {
                debug!("No music channel stored for guild {}", event.guild_id);
                continue;
            };

            if let MusicEventKind::Departed(reason) = &event.kind {
                info!("Guild {} departed: {}", event.guild_id, reason);
                channels.remove(&event.guild_id);
            }

            let Some(embed) = embedded_messages::event_embed(&event.kind) else {
                continue;
            };

            let message = CreateMessage::new().embed(embed);
            if let Err(e) = channel_id.send_message(&http, message).await {
                warn!(
                    "Failed to post music notification in guild {}: {}",
                    event.guild_id, e
                );
            }
        }
        info!("Music notification stream closed");
    })
}
