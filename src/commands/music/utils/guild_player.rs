//! The per-guild worker.
//!
//! Every guild with a queue gets one `GuildPlayer` task. Commands, stream-end
//! signals, presence changes and the idle timer are all handled on that task,
//! one message at a time, so the queue state needs no locking.

use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::Track;
use crate::commands::music::audio_sources::related_songs::RecommendationSource;

use super::autoplay_manager::{
    CandidateSampler, DEFAULT_AUTOPLAY_FETCH_LIMIT, DEFAULT_AUTOPLAY_PICKS,
    DEFAULT_HISTORY_CAPACITY, select_autoplay,
};
use super::music_manager::{GuildHandle, MusicError, MusicResult};
use super::notifications::{DepartReason, MusicEvent, MusicEventKind};
use super::playback_sink::{PlaybackSink, SinkStatus, StreamEndSignal};
use super::queue_manager::{QueueSnapshot, QueueState};
use super::stream_source::{OpenedStream, ProcessHandle, StreamOpener};

/// Autoplay rounds attempted by a single transition before giving up.
const MAX_AUTOPLAY_ROUNDS: usize = 3;

/// Tunables for the guild workers.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSettings {
    /// Grace period before an idle guild is torn down.
    pub idle_timeout: Duration,
    pub history_capacity: usize,
    /// Maximum tracks injected per autoplay round.
    pub autoplay_picks: usize,
    /// Related tracks requested from the recommendation source.
    pub autoplay_fetch_limit: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            autoplay_picks: DEFAULT_AUTOPLAY_PICKS,
            autoplay_fetch_limit: DEFAULT_AUTOPLAY_FETCH_LIMIT,
        }
    }
}

/// Result of an enqueue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The track started playing immediately.
    Started,
    /// The track was appended behind `position` other tracks.
    Queued { position: usize },
    /// Nothing was playing, but the track's stream could not be opened.
    Unplayable,
}

/// Messages processed by a guild worker.
#[derive(Debug)]
pub enum GuildMessage {
    Enqueue {
        track: Track,
        reply: oneshot::Sender<EnqueueOutcome>,
    },
    Skip {
        reply: oneshot::Sender<Option<Track>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Pause {
        reply: oneshot::Sender<MusicResult<()>>,
    },
    Resume {
        reply: oneshot::Sender<MusicResult<()>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    StreamEnded {
        generation: u64,
    },
    Presence {
        listeners: usize,
    },
}

/// Collaborators shared by every guild worker.
pub(crate) struct PlayerServices {
    pub opener: Arc<dyn StreamOpener>,
    pub recommender: Arc<dyn RecommendationSource>,
    pub events: UnboundedSender<MusicEvent>,
    pub settings: PlayerSettings,
}

/// The stream currently attached to the sink.
struct ActiveStream {
    generation: u64,
    process: Box<dyn ProcessHandle>,
    skipping: bool,
}

impl ActiveStream {
    fn terminate(mut self) {
        self.process.terminate();
    }
}

enum Flow {
    Continue,
    Exit {
        reason: DepartReason,
        reply: Option<oneshot::Sender<()>>,
    },
}

pub(crate) struct GuildPlayer {
    guild_id: GuildId,
    session: u64,
    state: QueueState,
    sink: Box<dyn PlaybackSink>,
    active: Option<ActiveStream>,
    generation: u64,
    idle_deadline: Option<Instant>,
    sampler: Box<dyn CandidateSampler>,
    services: Arc<PlayerServices>,
    mailbox: UnboundedSender<GuildMessage>,
    registry: Arc<DashMap<GuildId, GuildHandle>>,
}

impl GuildPlayer {
    pub(crate) fn new(
        guild_id: GuildId,
        session: u64,
        sink: Box<dyn PlaybackSink>,
        sampler: Box<dyn CandidateSampler>,
        services: Arc<PlayerServices>,
        mailbox: UnboundedSender<GuildMessage>,
        registry: Arc<DashMap<GuildId, GuildHandle>>,
    ) -> Self {
        Self {
            guild_id,
            session,
            state: QueueState::new(services.settings.history_capacity),
            sink,
            active: None,
            generation: 0,
            idle_deadline: None,
            sampler,
            services,
            mailbox,
            registry,
        }
    }

    /// Process messages until the guild is torn down.
    pub(crate) async fn run(mut self, mut inbox: UnboundedReceiver<GuildMessage>) {
        info!("Guild {} player started (session {})", self.guild_id, self.session);

        loop {
            let message = match self.idle_deadline {
                Some(deadline) => tokio::select! {
                    message = inbox.recv() => message,
                    _ = tokio::time::sleep_until(deadline) => {
                        info!("Guild {} idle timeout reached", self.guild_id);
                        self.teardown(DepartReason::Inactivity).await;
                        break;
                    }
                },
                None => inbox.recv().await,
            };

            let Some(message) = message else {
                debug!("Guild {} mailbox closed", self.guild_id);
                self.teardown(DepartReason::Requested).await;
                break;
            };

            if let Flow::Exit { reason, reply } = self.handle(message).await {
                self.teardown(reason).await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                break;
            }
        }

        // Later requests see a closed worker and start a fresh session.
        self.registry
            .remove_if(&self.guild_id, |_, handle| handle.session == self.session);
        inbox.close();
        let mut dropped = 0;
        while inbox.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(
                "Guild {} dropped {} messages after teardown",
                self.guild_id, dropped
            );
        }
        info!("Guild {} player stopped (session {})", self.guild_id, self.session);
    }

    async fn handle(&mut self, message: GuildMessage) -> Flow {
        match message {
            GuildMessage::Enqueue { track, reply } => {
                let outcome = self.enqueue(track).await;
                let _ = reply.send(outcome);
            }
            GuildMessage::Skip { reply } => {
                let skipped = self.skip().await;
                let _ = reply.send(skipped);
            }
            GuildMessage::Stop { reply } => {
                self.stop().await;
                let _ = reply.send(());
            }
            GuildMessage::Pause { reply } => {
                let result = self.pause().await;
                let _ = reply.send(result);
            }
            GuildMessage::Resume { reply } => {
                let result = self.resume().await;
                let _ = reply.send(result);
            }
            GuildMessage::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot(self.idle_deadline.is_some()));
            }
            GuildMessage::StreamEnded { generation } => self.stream_ended(generation).await,
            GuildMessage::Leave { reply } => {
                return Flow::Exit {
                    reason: DepartReason::Requested,
                    reply: Some(reply),
                };
            }
            GuildMessage::Presence { listeners } => {
                if listeners == 0 {
                    info!("Guild {} has no listeners left", self.guild_id);
                    return Flow::Exit {
                        reason: DepartReason::NoListeners,
                        reply: None,
                    };
                }
                debug!("Guild {} has {} listeners", self.guild_id, listeners);
            }
        }
        Flow::Continue
    }

    async fn enqueue(&mut self, track: Track) -> EnqueueOutcome {
        self.disarm_idle_timer();
        let position = self.state.push(track.clone());

        if self.active.is_some() || self.state.status() != SinkStatus::Idle {
            info!(
                "Guild {} queued '{}' at position {}",
                self.guild_id, track.title, position
            );
            self.emit(MusicEventKind::Enqueued { track, position });
            return EnqueueOutcome::Queued { position };
        }

        self.run_transition(false).await;

        let started = self.active.is_some() && self.state.last_played() == Some(&track);
        if started {
            EnqueueOutcome::Started
        } else {
            EnqueueOutcome::Unplayable
        }
    }

    async fn skip(&mut self) -> Option<Track> {
        if self.active.is_none() {
            debug!("Guild {} has nothing to skip", self.guild_id);
            // Restart the grace period like any other idle request.
            self.disarm_idle_timer();
            self.state.mark_idle();
            self.arm_idle_timer();
            return None;
        }

        let active = match self.active.as_mut() {
            Some(active) if !active.skipping => active,
            _ => {
                debug!("Guild {} skip already in progress", self.guild_id);
                return None;
            }
        };

        // The generation stays current so the sink's end signal drives the
        // transition.
        active.skipping = true;
        active.process.terminate();
        self.sink.stop().await;

        let skipped = self.state.front().cloned();
        if let Some(track) = &skipped {
            info!("Guild {} skipped '{}'", self.guild_id, track.title);
            self.emit(MusicEventKind::Skipped(track.clone()));
        }
        skipped
    }

    async fn stop(&mut self) {
        self.kill_active();
        self.sink.stop().await;
        self.state.clear();
        self.state.mark_idle();
        info!("Guild {} stopped playback and cleared the queue", self.guild_id);
        self.emit(MusicEventKind::Stopped);
        self.arm_idle_timer();
    }

    async fn pause(&mut self) -> MusicResult<()> {
        self.expect_status(SinkStatus::Playing)?;
        self.sink.pause().await?;
        self.state.set_status(SinkStatus::Paused);
        self.emit(MusicEventKind::Paused);
        Ok(())
    }

    async fn resume(&mut self) -> MusicResult<()> {
        self.expect_status(SinkStatus::Paused)?;
        self.sink.resume().await?;
        self.state.set_status(SinkStatus::Playing);
        self.emit(MusicEventKind::Resumed);
        Ok(())
    }

    fn expect_status(&self, expected: SinkStatus) -> MusicResult<()> {
        let actual = self.state.status();
        if actual != expected {
            debug!(
                "Guild {} expected sink {} but it is {}",
                self.guild_id, expected, actual
            );
            return Err(MusicError::PreconditionMismatch { expected, actual });
        }
        Ok(())
    }

    async fn stream_ended(&mut self, generation: u64) {
        let current = self.active.as_ref().map(|active| active.generation);
        if current != Some(generation) {
            debug!(
                "Guild {} ignoring end of stale stream {} (current {:?})",
                self.guild_id, generation, current
            );
            return;
        }

        debug!("Guild {} stream {} ended", self.guild_id, generation);
        self.kill_active();
        self.state.mark_idle();
        self.run_transition(true).await;
    }

    /// Advance to the next playable track, injecting autoplay picks when the
    /// queue runs dry, or arm the idle timer when there is nothing to play.
    async fn run_transition(&mut self, mut drop_front: bool) {
        let mut autoplay_rounds = 0;

        loop {
            self.kill_active();
            if drop_front {
                self.state.pop_front();
            }
            drop_front = true;

            if let Some(next) = self.state.front().cloned() {
                match self.start_stream(&next).await {
                    Ok(()) => return,
                    Err(e) => {
                        warn!(
                            "Guild {} could not start '{}': {}",
                            self.guild_id, next.title, e
                        );
                        continue;
                    }
                }
            }

            if autoplay_rounds < MAX_AUTOPLAY_ROUNDS {
                autoplay_rounds += 1;
                if self.inject_autoplay().await {
                    drop_front = false;
                    continue;
                }
            }

            self.state.mark_idle();
            self.arm_idle_timer();
            return;
        }
    }

    async fn start_stream(&mut self, track: &Track) -> MusicResult<()> {
        self.kill_active();

        let OpenedStream {
            stream,
            mut process,
        } = self.services.opener.open(&track.url).await?;

        self.generation += 1;
        let signal = StreamEndSignal::new(self.generation, self.mailbox.clone());
        if let Err(e) = self.sink.play(stream, signal).await {
            process.terminate();
            self.sink.stop().await;
            return Err(e);
        }

        self.active = Some(ActiveStream {
            generation: self.generation,
            process,
            skipping: false,
        });
        self.state.mark_started(track);
        info!(
            "Guild {} now playing '{}' (stream {})",
            self.guild_id, track.title, self.generation
        );
        self.emit(MusicEventKind::NowPlaying(track.clone()));
        Ok(())
    }

    /// Append related tracks seeded by the last played track. Returns whether
    /// anything was added.
    async fn inject_autoplay(&mut self) -> bool {
        let Some(seed) = self.state.last_played().cloned() else {
            debug!("Guild {} has no track to seed autoplay", self.guild_id);
            return false;
        };

        let settings = &self.services.settings;
        let candidates = self
            .services
            .recommender
            .related(&seed.id, settings.autoplay_fetch_limit)
            .await;
        if candidates.is_empty() {
            info!("Guild {} found no autoplay candidates for '{}'", self.guild_id, seed.title);
            return false;
        }

        let selection = select_autoplay(
            candidates,
            self.state.history_mut(),
            self.sampler.as_mut(),
            settings.autoplay_picks,
        );
        if selection.picks.is_empty() {
            return false;
        }
        if selection.history_reset {
            info!(
                "Guild {} exhausted fresh autoplay candidates, history cleared",
                self.guild_id
            );
        }

        info!(
            "Guild {} autoplay added {} tracks after '{}'",
            self.guild_id,
            selection.picks.len(),
            seed.title
        );
        self.emit(MusicEventKind::AutoplayTriggered {
            seed,
            added: selection.picks.clone(),
            history_reset: selection.history_reset,
        });
        self.state.extend(selection.picks);
        true
    }

    async fn teardown(&mut self, reason: DepartReason) {
        info!("Guild {} tearing down: {}", self.guild_id, reason);
        self.idle_deadline = None;
        self.kill_active();
        self.sink.disconnect().await;
        self.state.reset();
        self.emit(MusicEventKind::Departed(reason));
    }

    fn kill_active(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(
                "Guild {} terminating stream {}",
                self.guild_id, active.generation
            );
            active.terminate();
        }
    }

    fn arm_idle_timer(&mut self) {
        let timeout = self.services.settings.idle_timeout;
        debug!("Guild {} idle timer armed for {:?}", self.guild_id, timeout);
        self.idle_deadline = Some(Instant::now() + timeout);
    }

    fn disarm_idle_timer(&mut self) {
        if self.idle_deadline.take().is_some() {
            debug!("Guild {} idle timer disarmed", self.guild_id);
        }
    }

    fn emit(&self, kind: MusicEventKind) {
        let event = MusicEvent {
            guild_id: self.guild_id,
            kind,
        };
        if self.services.events.send(event).is_err() {
            debug!("Guild {} event dropped, no listener", self.guild_id);
        }
    }
}
