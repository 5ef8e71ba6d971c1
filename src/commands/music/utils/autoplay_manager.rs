//! Autoplay policy: the bounded play history used to avoid immediate repeats,
//! and the selection of related tracks to inject when the queue runs dry.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use tracing::debug;

use crate::commands::music::audio_sources::Track;

/// Number of ids kept before the history is wiped.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
/// Maximum number of tracks injected per autoplay round.
pub const DEFAULT_AUTOPLAY_PICKS: usize = 3;
/// Number of related tracks requested from the recommendation source.
pub const DEFAULT_AUTOPLAY_FETCH_LIMIT: usize = 15;

/// Set of recently started track ids.
///
/// The history never holds more than `capacity` ids. When a new id would push
/// it past capacity the whole set is cleared first; ids are never evicted one
/// at a time.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    ids: HashSet<String>,
    capacity: usize,
}

impl TrackHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records a started track id.
    pub fn record(&mut self, id: &str) {
        if self.ids.contains(id) {
            return;
        }
        if self.ids.len() >= self.capacity {
            debug!("History reached {} ids, clearing", self.capacity);
            self.ids.clear();
        }
        self.ids.insert(id.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ids currently held, sorted for stable output.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Chooses which autoplay candidates get queued.
///
/// Implementations select at most `amount` candidates without replacement and
/// return them in play order.
pub trait CandidateSampler: Send {
    fn sample(&mut self, candidates: Vec<Track>, amount: usize) -> Vec<Track>;
}

/// Uniform random selection without replacement.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    /// A sampler seeded from the thread-local generator.
    pub fn new() -> Self {
        Self::seeded(rand::random())
    }

    /// A reproducible sampler.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSampler for RandomSampler {
    fn sample(&mut self, candidates: Vec<Track>, amount: usize) -> Vec<Track> {
        let amount = amount.min(candidates.len());
        let mut slots: Vec<Option<Track>> = candidates.into_iter().map(Some).collect();
        rand::seq::index::sample(&mut self.rng, slots.len(), amount)
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}

/// Takes candidates in the order the provider ranked them.
#[derive(Debug, Default, Clone, Copy)]
pub struct RankedSampler;

impl CandidateSampler for RankedSampler {
    fn sample(&mut self, candidates: Vec<Track>, amount: usize) -> Vec<Track> {
        candidates.into_iter().take(amount).collect()
    }
}

/// Outcome of filtering candidates against the history.
#[derive(Debug, PartialEq)]
pub struct AutoplaySelection {
    /// Tracks to append, tagged as autoplay.
    pub picks: Vec<Track>,
    /// Whether every candidate was a recent repeat and the history was cleared.
    pub history_reset: bool,
}

/// Picks up to `amount` autoplay tracks from `candidates`.
///
/// Candidates already in `history` are dropped. If that leaves nothing, the
/// history is cleared and the unfiltered list is used instead, so a
/// non-empty candidate list always yields at least one pick.
pub fn select_autoplay(
    candidates: Vec<Track>,
    history: &mut TrackHistory,
    sampler: &mut dyn CandidateSampler,
    amount: usize,
) -> AutoplaySelection {
    let mut seen = HashSet::new();
    let candidates: Vec<Track> = candidates
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .collect();

    let (fresh, repeats): (Vec<Track>, Vec<Track>) = candidates
        .into_iter()
        .partition(|track| !history.contains(&track.id));

    let (pool, history_reset) = if fresh.is_empty() && !repeats.is_empty() {
        history.clear();
        (repeats, true)
    } else {
        (fresh, false)
    };

    let picks = sampler
        .sample(pool, amount)
        .into_iter()
        .map(Track::into_autoplay)
        .collect();

    AutoplaySelection {
        picks,
        history_reset,
    }
}
