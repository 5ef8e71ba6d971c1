use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use serenity::model::id::GuildId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::Track;
use crate::commands::music::audio_sources::related_songs::RecommendationSource;

use super::autoplay_manager::{CandidateSampler, RandomSampler};
use super::guild_player::{EnqueueOutcome, GuildMessage, GuildPlayer, PlayerServices, PlayerSettings};
use super::notifications::MusicEvent;
use super::playback_sink::{SinkConnector, SinkStatus};
use super::queue_manager::QueueSnapshot;
use super::stream_source::StreamOpener;

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("No track found for '{0}'")]
    NotFound(String),

    #[error("Failed to open stream: {0}")]
    OpenFailed(String),

    #[error("Stream process failed: {0}")]
    ProcessFault(String),

    #[error("Player is {actual}, expected {expected}")]
    PreconditionMismatch {
        expected: SinkStatus,
        actual: SinkStatus,
    },

    #[error("No active queue")]
    NoActiveQueue,

    #[error("Audio source error: {0}")]
    AudioSourceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// How many times an enqueue is retried when it races a guild teardown.
const SPAWN_RETRIES: usize = 2;

type SamplerFactory = dyn Fn() -> Box<dyn CandidateSampler> + Send + Sync;

/// Registry entry for a running guild worker.
#[derive(Clone)]
pub(crate) struct GuildHandle {
    pub(crate) session: u64,
    mailbox: UnboundedSender<GuildMessage>,
}

/// Owns the per-guild players and routes requests to them.
///
/// A player is created on the first enqueue for a guild and removes itself
/// from the registry when it is torn down. All other requests for a guild
/// without a player fail with `MusicError::NoActiveQueue` and create nothing.
pub struct MusicManager {
    guilds: Arc<DashMap<GuildId, GuildHandle>>,
    connector: Arc<dyn SinkConnector>,
    services: Arc<PlayerServices>,
    sampler_factory: Arc<SamplerFactory>,
    next_session: AtomicU64,
}

impl MusicManager {
    /// Creates the manager and the stream of events emitted by every guild.
    pub fn new(
        connector: Arc<dyn SinkConnector>,
        opener: Arc<dyn StreamOpener>,
        recommender: Arc<dyn RecommendationSource>,
        settings: PlayerSettings,
    ) -> (Self, UnboundedReceiver<MusicEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let services = PlayerServices {
            opener,
            recommender,
            events,
            settings,
        };

        let manager = Self {
            guilds: Arc::new(DashMap::new()),
            connector,
            services: Arc::new(services),
            sampler_factory: Arc::new(|| Box::new(RandomSampler::new())),
            next_session: AtomicU64::new(1),
        };
        (manager, receiver)
    }

    /// Replaces the autoplay sampler used by players created from now on.
    pub fn with_sampler<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn CandidateSampler> + Send + Sync + 'static,
    {
        self.sampler_factory = Arc::new(factory);
        self
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.services.settings
    }

    /// Whether the guild currently has a player.
    pub fn has_queue(&self, guild_id: GuildId) -> bool {
        self.guilds.contains_key(&guild_id)
    }

    /// Number of guilds with a player.
    pub fn active_guilds(&self) -> usize {
        self.guilds.len()
    }

    /// Appends a track, creating the guild's player if needed.
    pub async fn enqueue(&self, guild_id: GuildId, track: Track) -> MusicResult<EnqueueOutcome> {
        for attempt in 0..=SPAWN_RETRIES {
            let handle = self.lookup_or_create(guild_id).await?;
            let (reply, outcome) = oneshot::channel();
            let message = GuildMessage::Enqueue {
                track: track.clone(),
                reply,
            };

            if handle.mailbox.send(message).is_ok() {
                if let Ok(outcome) = outcome.await {
                    return Ok(outcome);
                }
            }

            debug!(
                "Guild {} player (session {}) closed during enqueue, attempt {}",
                guild_id, handle.session, attempt
            );
            self.forget(guild_id, handle.session);
        }

        warn!("Guild {} could not get a running player", guild_id);
        Err(MusicError::NoActiveQueue)
    }

    /// Skips the current track. Returns the skipped track, or `None` when
    /// nothing was playing.
    pub async fn skip(&self, guild_id: GuildId) -> MusicResult<Option<Track>> {
        self.request(guild_id, |reply| GuildMessage::Skip { reply })
            .await
    }

    /// Stops playback and clears the queue. The player stays alive until the
    /// idle timeout.
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        self.request(guild_id, |reply| GuildMessage::Stop { reply })
            .await
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        self.request(guild_id, |reply| GuildMessage::Pause { reply })
            .await?
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        self.request(guild_id, |reply| GuildMessage::Resume { reply })
            .await?
    }

    /// Tears the guild's player down and disconnects it.
    pub async fn leave(&self, guild_id: GuildId) -> MusicResult<()> {
        self.request(guild_id, |reply| GuildMessage::Leave { reply })
            .await
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> MusicResult<QueueSnapshot> {
        self.request(guild_id, |reply| GuildMessage::Snapshot { reply })
            .await
    }

    /// Reports how many listeners remain in the bot's voice channel.
    pub fn presence_changed(&self, guild_id: GuildId, listeners: usize) {
        let Some(handle) = self.handle(guild_id) else {
            return;
        };
        if handle
            .mailbox
            .send(GuildMessage::Presence { listeners })
            .is_err()
        {
            self.forget(guild_id, handle.session);
        }
    }

    /// Tears down every guild and waits for the players to finish.
    pub async fn shutdown(&self) {
        let handles: Vec<(GuildId, GuildHandle)> = self
            .guilds
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        info!("Shutting down {} guild players", handles.len());

        let pending = handles.into_iter().filter_map(|(guild_id, handle)| {
            let (reply, done) = oneshot::channel();
            handle
                .mailbox
                .send(GuildMessage::Leave { reply })
                .ok()
                .map(|_| async move {
                    if done.await.is_err() {
                        debug!("Guild {} player exited before shutdown", guild_id);
                    }
                })
        });
        join_all(pending).await;
    }

    async fn request<T>(
        &self,
        guild_id: GuildId,
        build: impl FnOnce(oneshot::Sender<T>) -> GuildMessage,
    ) -> MusicResult<T> {
        let handle = self.handle(guild_id).ok_or(MusicError::NoActiveQueue)?;
        let (reply, response) = oneshot::channel();
        if handle.mailbox.send(build(reply)).is_err() {
            self.forget(guild_id, handle.session);
            return Err(MusicError::NoActiveQueue);
        }
        response.await.map_err(|_| MusicError::NoActiveQueue)
    }

    fn handle(&self, guild_id: GuildId) -> Option<GuildHandle> {
        self.guilds.get(&guild_id).map(|entry| entry.value().clone())
    }

    fn forget(&self, guild_id: GuildId, session: u64) {
        self.guilds
            .remove_if(&guild_id, |_, handle| handle.session == session);
    }

    async fn lookup_or_create(&self, guild_id: GuildId) -> MusicResult<GuildHandle> {
        if let Some(handle) = self.handle(guild_id) {
            return Ok(handle);
        }

        // Connect before touching the map so no shard lock is held across an await.
        let sink = self.connector.connect(guild_id).await?;

        let handle = match self.guilds.entry(guild_id) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let session = self.next_session.fetch_add(1, Ordering::Relaxed);
                let (mailbox, inbox) = mpsc::unbounded_channel();
                let player = GuildPlayer::new(
                    guild_id,
                    session,
                    sink,
                    (self.sampler_factory)(),
                    Arc::clone(&self.services),
                    mailbox.clone(),
                    Arc::clone(&self.guilds),
                );
                let handle = GuildHandle { session, mailbox };
                entry.insert(handle.clone());
                tokio::spawn(player.run(inbox));
                info!("Created player for guild {} (session {})", guild_id, session);
                handle
            }
        };
        Ok(handle)
    }
}
