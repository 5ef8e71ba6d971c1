//! Fake collaborators for driving `MusicManager` without Discord or yt-dlp.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use serenity::model::id::GuildId;

use jukebox::commands::music::audio_sources::Track;
use jukebox::commands::music::audio_sources::related_songs::RecommendationSource;
use jukebox::commands::music::utils::music_manager::{MusicError, MusicResult};
use jukebox::commands::music::utils::playback_sink::{PlaybackSink, SinkConnector, StreamEndSignal};
use jukebox::commands::music::utils::stream_source::{
    AudioStream, OpenedStream, ProcessHandle, StreamOpener,
};

mock! {
    pub Recommender {}

    #[async_trait]
    impl RecommendationSource for Recommender {
        async fn related(&self, track_id: &str, limit: usize) -> Vec<Track>;
    }
}

/// A recommender that never has anything to suggest.
pub fn silent_recommender() -> MockRecommender {
    let mut recommender = MockRecommender::new();
    recommender.expect_related().returning(|_, _| Vec::new());
    recommender
}

#[derive(Default)]
struct ProbeState {
    current: Option<StreamEndSignal>,
    generations: Vec<u64>,
    stops: usize,
    pauses: usize,
    resumes: usize,
    disconnects: usize,
}

/// Shared view into a `FakeSink`.
#[derive(Clone, Default)]
pub struct SinkProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl SinkProbe {
    /// Simulates the current stream reaching its end.
    pub fn finish_current(&self) {
        let signal = self.state.lock().unwrap().current.take();
        if let Some(signal) = signal {
            signal.notify();
        }
    }

    /// Generations handed to `play`, in order.
    pub fn generations(&self) -> Vec<u64> {
        self.state.lock().unwrap().generations.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn pauses(&self) -> usize {
        self.state.lock().unwrap().pauses
    }

    pub fn resumes(&self) -> usize {
        self.state.lock().unwrap().resumes
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }
}

/// Records sink calls. Stopping reports the end of the current stream, the
/// same way a voice call does.
pub struct FakeSink {
    probe: SinkProbe,
}

#[async_trait]
impl PlaybackSink for FakeSink {
    async fn play(&mut self, _stream: AudioStream, on_end: StreamEndSignal) -> MusicResult<()> {
        let mut state = self.probe.state.lock().unwrap();
        state.generations.push(on_end.generation());
        state.current = Some(on_end);
        Ok(())
    }

    async fn pause(&mut self) -> MusicResult<()> {
        self.probe.state.lock().unwrap().pauses += 1;
        Ok(())
    }

    async fn resume(&mut self) -> MusicResult<()> {
        self.probe.state.lock().unwrap().resumes += 1;
        Ok(())
    }

    async fn stop(&mut self) {
        let signal = {
            let mut state = self.probe.state.lock().unwrap();
            state.stops += 1;
            state.current.take()
        };
        if let Some(signal) = signal {
            signal.notify();
        }
    }

    async fn disconnect(&mut self) {
        let mut state = self.probe.state.lock().unwrap();
        state.disconnects += 1;
        state.current = None;
    }
}

/// Hands out a fresh `FakeSink` per connection and keeps its probe.
#[derive(Default)]
pub struct FakeConnector {
    probes: Mutex<HashMap<GuildId, SinkProbe>>,
    connects: AtomicUsize,
    refuse: Mutex<HashSet<GuildId>>,
}

impl FakeConnector {
    /// Probe of the most recent sink created for `guild_id`.
    pub fn probe(&self, guild_id: GuildId) -> SinkProbe {
        self.probes
            .lock()
            .unwrap()
            .get(&guild_id)
            .cloned()
            .expect("no sink was created for this guild")
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make connections to `guild_id` fail as if the bot were not in voice.
    pub fn refuse(&self, guild_id: GuildId) {
        self.refuse.lock().unwrap().insert(guild_id);
    }
}

#[async_trait]
impl SinkConnector for FakeConnector {
    async fn connect(&self, guild_id: GuildId) -> MusicResult<Box<dyn PlaybackSink>> {
        if self.refuse.lock().unwrap().contains(&guild_id) {
            return Err(MusicError::NotConnected);
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let probe = SinkProbe::default();
        self.probes.lock().unwrap().insert(guild_id, probe.clone());
        Ok(Box::new(FakeSink { probe }))
    }
}

#[derive(Default)]
struct ProcessCounters {
    alive: AtomicUsize,
    max_alive: AtomicUsize,
    spawned: AtomicUsize,
}

struct FakeProcess {
    counters: Arc<ProcessCounters>,
    terminated: bool,
}

impl ProcessHandle for FakeProcess {
    fn terminate(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.counters.alive.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Opens empty streams and counts the "processes" it leaves running.
#[derive(Default)]
pub struct FakeOpener {
    counters: Arc<ProcessCounters>,
    failing: Mutex<HashSet<String>>,
    opened: Mutex<Vec<String>>,
}

impl FakeOpener {
    /// Opening `url` fails from now on.
    pub fn fail_url(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn alive(&self) -> usize {
        self.counters.alive.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running processes seen.
    pub fn max_alive(&self) -> usize {
        self.counters.max_alive.load(Ordering::SeqCst)
    }

    pub fn spawned(&self) -> usize {
        self.counters.spawned.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamOpener for FakeOpener {
    async fn open(&self, url: &str) -> MusicResult<OpenedStream> {
        self.opened.lock().unwrap().push(url.to_string());
        if self.failing.lock().unwrap().contains(url) {
            return Err(MusicError::OpenFailed(format!("refusing {}", url)));
        }

        self.counters.spawned.fetch_add(1, Ordering::SeqCst);
        let alive = self.counters.alive.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_alive.fetch_max(alive, Ordering::SeqCst);

        Ok(OpenedStream {
            stream: AudioStream::from_reader(Cursor::new(Vec::<u8>::new())),
            process: Box::new(FakeProcess {
                counters: Arc::clone(&self.counters),
                terminated: false,
            }),
        })
    }
}
