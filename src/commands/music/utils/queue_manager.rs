use super::autoplay_manager::TrackHistory;
use super::playback_sink::SinkStatus;
use crate::commands::music::audio_sources::Track;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Queue state owned by a single guild.
///
/// `pending[0]` is the current track while a stream is active, otherwise the
/// next track to start. All mutation happens on the guild's own worker.
#[derive(Debug)]
pub struct QueueState {
    pending: VecDeque<Track>,
    last_played: Option<Track>,
    history: TrackHistory,
    status: SinkStatus,
    /// Play time banked before the latest pause.
    played: Duration,
    /// Start of the running play segment, `None` while paused or idle.
    resumed_at: Option<Instant>,
}

impl QueueState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            last_played: None,
            history: TrackHistory::new(history_capacity),
            status: SinkStatus::Idle,
            played: Duration::ZERO,
            resumed_at: None,
        }
    }

    /// Append a track, returning its 0-based position in `pending`.
    pub fn push(&mut self, track: Track) -> usize {
        self.pending.push_back(track);
        self.pending.len() - 1
    }

    /// Append several tracks in order.
    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.pending.extend(tracks);
    }

    /// The track at the front of the queue.
    pub fn front(&self) -> Option<&Track> {
        self.pending.front()
    }

    /// Drop the front track (the one that just finished or failed).
    pub fn pop_front(&mut self) -> Option<Track> {
        let finished = self.pending.pop_front();
        if let Some(track) = &finished {
            debug!("Dropped finished track '{}' from queue", track.title);
        }
        finished
    }

    /// Record that `track` just started streaming.
    pub fn mark_started(&mut self, track: &Track) {
        self.history.record(&track.id);
        self.last_played = Some(track.clone());
        self.status = SinkStatus::Playing;
        self.played = Duration::ZERO;
        self.resumed_at = Some(Instant::now());
    }

    /// Record that nothing is streaming any more.
    pub fn mark_idle(&mut self) {
        self.status = SinkStatus::Idle;
        self.played = Duration::ZERO;
        self.resumed_at = None;
    }

    /// Move between playing and paused, freezing the play clock while paused.
    pub fn set_status(&mut self, status: SinkStatus) {
        match status {
            SinkStatus::Idle => {
                self.mark_idle();
                return;
            }
            SinkStatus::Paused => {
                if let Some(resumed) = self.resumed_at.take() {
                    self.played += resumed.elapsed();
                }
            }
            SinkStatus::Playing => {
                if self.resumed_at.is_none() {
                    self.resumed_at = Some(Instant::now());
                }
            }
        }
        self.status = status;
    }

    /// Clear pending tracks and forget the last played track.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.last_played = None;
    }

    /// Clear everything, including the history.
    pub fn reset(&mut self) {
        self.clear();
        self.history.clear();
        self.mark_idle();
    }

    pub fn pending(&self) -> &VecDeque<Track> {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn last_played(&self) -> Option<&Track> {
        self.last_played.as_ref()
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut TrackHistory {
        &mut self.history
    }

    pub fn status(&self) -> SinkStatus {
        self.status
    }

    /// Play time of the current track, excluding paused spans.
    pub fn elapsed(&self) -> Option<Duration> {
        if self.status == SinkStatus::Idle {
            return None;
        }
        let running = self
            .resumed_at
            .map(|resumed| resumed.elapsed())
            .unwrap_or_default();
        Some(self.played + running)
    }

    /// Copy of the state for display.
    pub fn snapshot(&self, idle_timer_armed: bool) -> QueueSnapshot {
        QueueSnapshot {
            pending: self.pending.iter().cloned().collect(),
            last_played: self.last_played.clone(),
            status: self.status,
            history: self.history.ids(),
            idle_timer_armed,
            elapsed: self.elapsed(),
        }
    }
}

/// Point-in-time view of a guild's queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub pending: Vec<Track>,
    pub last_played: Option<Track>,
    pub status: SinkStatus,
    pub history: Vec<String>,
    pub idle_timer_armed: bool,
    pub elapsed: Option<Duration>,
}

impl QueueSnapshot {
    /// The audible track, if the sink is not idle.
    pub fn now_playing(&self) -> Option<&Track> {
        match self.status {
            SinkStatus::Idle => None,
            _ => self.pending.first(),
        }
    }

    /// Tracks waiting behind the current one.
    pub fn upcoming(&self) -> &[Track] {
        match self.now_playing() {
            Some(_) => &self.pending[1..],
            None => &self.pending,
        }
    }

    pub fn pending_ids(&self) -> Vec<&str> {
        self.pending.iter().map(|t| t.id.as_str()).collect()
    }
}
