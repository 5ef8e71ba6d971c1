//! The playback sink: whatever renders audio for a guild.
//!
//! The core only talks to the `PlaybackSink` trait. `SongbirdSink` is the
//! voice-channel implementation used by the bot.

use serenity::async_trait;
use serenity::model::id::GuildId;
use serenity::prelude::Mutex as SerenityMutex;
use songbird::input::{AudioStream as SongbirdStream, Input, LiveInput};
use songbird::tracks::TrackHandle;
use songbird::{Call, Event, Songbird, TrackEvent};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use symphonia::core::io::{MediaSource, ReadOnlySource};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::event_handlers::StreamEndNotifier;
use super::guild_player::GuildMessage;
use super::music_manager::{MusicError, MusicResult};
use super::stream_source::AudioStream;

/// Sink status as mirrored by the guild worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for SinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkStatus::Idle => f.write_str("idle"),
            SinkStatus::Playing => f.write_str("playing"),
            SinkStatus::Paused => f.write_str("paused"),
        }
    }
}

/// One-shot "stream ended" callback handed to the sink with every stream.
///
/// Cloning is allowed so a sink can register it for several events (end,
/// error); only the first `notify` is delivered.
#[derive(Clone)]
pub struct StreamEndSignal {
    generation: u64,
    fired: Arc<AtomicBool>,
    mailbox: UnboundedSender<GuildMessage>,
}

impl StreamEndSignal {
    pub(crate) fn new(generation: u64, mailbox: UnboundedSender<GuildMessage>) -> Self {
        Self {
            generation,
            fired: Arc::new(AtomicBool::new(false)),
            mailbox,
        }
    }

    /// Generation of the stream this signal belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Report the stream as finished, failed or stopped.
    pub fn notify(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        let message = GuildMessage::StreamEnded {
            generation: self.generation,
        };
        if self.mailbox.send(message).is_err() {
            debug!(
                "Stream {} ended after its guild worker shut down",
                self.generation
            );
        }
    }
}

impl fmt::Debug for StreamEndSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamEndSignal")
            .field("generation", &self.generation)
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// Renders one audio stream at a time.
///
/// `play` replaces whatever was playing. The sink must call
/// `on_end.notify()` once the stream is exhausted, fails, or is stopped.
#[async_trait]
pub trait PlaybackSink: Send {
    async fn play(&mut self, stream: AudioStream, on_end: StreamEndSignal) -> MusicResult<()>;
    async fn pause(&mut self) -> MusicResult<()>;
    async fn resume(&mut self) -> MusicResult<()>;
    async fn stop(&mut self);
    /// Release the underlying connection. The sink is not used afterwards.
    async fn disconnect(&mut self);
}

/// Creates the sink for a guild when its queue is first created.
#[async_trait]
pub trait SinkConnector: Send + Sync {
    async fn connect(&self, guild_id: GuildId) -> MusicResult<Box<dyn PlaybackSink>>;
}

/// Plays streams into a songbird voice call.
pub struct SongbirdSink {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<SerenityMutex<Call>>,
    current: Option<TrackHandle>,
}

impl SongbirdSink {
    fn input_from(stream: AudioStream) -> Input {
        let source: Box<dyn MediaSource> = Box::new(ReadOnlySource::new(stream.into_reader()));
        Input::Live(
            LiveInput::Raw(SongbirdStream {
                input: source,
                hint: None,
            }),
            None,
        )
    }

    fn current(&self) -> MusicResult<&TrackHandle> {
        self.current.as_ref().ok_or_else(|| {
            MusicError::ProcessFault("no track handle attached to the call".to_string())
        })
    }
}

#[async_trait]
impl PlaybackSink for SongbirdSink {
    async fn play(&mut self, stream: AudioStream, on_end: StreamEndSignal) -> MusicResult<()> {
        let input = Self::input_from(stream);
        let handle = {
            let mut call = self.call.lock().await;
            call.play_only_input(input)
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(Event::Track(event), StreamEndNotifier::new(on_end.clone()))
                .map_err(|e| MusicError::ProcessFault(e.to_string()))?;
        }

        debug!(
            "Guild {} now streaming generation {}",
            self.guild_id,
            on_end.generation()
        );
        self.current = Some(handle);
        Ok(())
    }

    async fn pause(&mut self) -> MusicResult<()> {
        self.current()?
            .pause()
            .map_err(|e| MusicError::ProcessFault(e.to_string()))
    }

    async fn resume(&mut self) -> MusicResult<()> {
        self.current()?
            .play()
            .map_err(|e| MusicError::ProcessFault(e.to_string()))
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            if let Err(e) = handle.stop() {
                debug!("Track for guild {} already gone: {}", self.guild_id, e);
            }
        }
        self.call.lock().await.stop();
    }

    async fn disconnect(&mut self) {
        self.stop().await;
        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("Failed to leave voice in guild {}: {}", self.guild_id, e);
        } else {
            info!("Left voice channel in guild {}", self.guild_id);
        }
    }
}

/// Hands out sinks for calls that were already joined by the `play` command.
pub struct SongbirdConnector {
    manager: Arc<Songbird>,
}

impl SongbirdConnector {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl SinkConnector for SongbirdConnector {
    async fn connect(&self, guild_id: GuildId) -> MusicResult<Box<dyn PlaybackSink>> {
        let call = self.manager.get(guild_id).ok_or(MusicError::NotConnected)?;
        Ok(Box::new(SongbirdSink {
            guild_id,
            manager: Arc::clone(&self.manager),
            call,
            current: None,
        }))
    }
}
