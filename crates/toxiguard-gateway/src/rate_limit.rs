//! Fixed-window rate limiting per client identity
//!
//! Windows live in a fixed number of shards, each behind its own lock, so
//! the check-and-increment for one identity is a single critical section
//! and unrelated identities rarely contend. Each shard is capacity bounded:
//! a full shard drops expired windows first, then the oldest eighth of its
//! windows, so a stream of new identities pays for a sweep only once per
//! batch of inserts.

use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::time::{Duration, Instant};
use toxiguard_core::ClientIdentity;
use tracing::debug;

/// Admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted; `remaining` units left in the current window
    Allowed { remaining: u64 },

    /// Request rejected until the current window closes
    Rejected { retry_after: Duration },
}

impl Admission {
    /// Whether the request was admitted
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Per-identity counter for the active window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u64,
    pub window_start: Instant,
}

type Shard = HashMap<ClientIdentity, RateWindow>;

/// Fraction of a full shard dropped when no window has expired
const EVICTION_DIVISOR: usize = 8;

/// Sharded, bounded fixed-window rate limiter
pub struct RateLimiter {
    shards: Box<[Mutex<Shard>]>,
    shard_capacity: usize,
    hasher: RandomState,
}

impl RateLimiter {
    /// Create a limiter tracking at most `max_identities` identities over `shards` locks
    pub fn new(shards: usize, max_identities: usize) -> Self {
        let shards = shards.max(1);
        let shard_capacity = max_identities.div_ceil(shards).max(1);

        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
            shard_capacity,
            hasher: RandomState::new(),
        }
    }

    /// Admit one request costing `cost` units against `limit` per `window`
    pub fn admit(
        &self,
        identity: &ClientIdentity,
        limit: u64,
        window: Duration,
        cost: u64,
    ) -> Admission {
        self.admit_at(identity, limit, window, cost, Instant::now())
    }

    /// [`admit`](Self::admit) at an explicit instant
    pub fn admit_at(
        &self,
        identity: &ClientIdentity,
        limit: u64,
        window: Duration,
        cost: u64,
        now: Instant,
    ) -> Admission {
        let mut shard = self.shard(identity).lock();

        if !shard.contains_key(identity) && shard.len() >= self.shard_capacity {
            evict(&mut shard, self.shard_capacity, now, window);
        }

        let entry = shard.entry(identity.clone()).or_insert(RateWindow {
            count: 0,
            window_start: now,
        });

        // Reset before incrementing once the window has elapsed
        if now.saturating_duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(cost.max(1));

        if entry.count > limit {
            let elapsed = now.saturating_duration_since(entry.window_start);
            let retry_after = window.saturating_sub(elapsed);
            debug!(
                "Rate limit exceeded for {}: {}/{}",
                identity, entry.count, limit
            );
            Admission::Rejected { retry_after }
        } else {
            Admission::Allowed {
                remaining: limit - entry.count,
            }
        }
    }

    /// Current window for an identity, if tracked
    pub fn window(&self, identity: &ClientIdentity) -> Option<RateWindow> {
        self.shard(identity).lock().get(identity).copied()
    }

    /// Number of identities currently tracked
    pub fn tracked_identities(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    fn shard(&self, identity: &ClientIdentity) -> &Mutex<Shard> {
        let idx = (self.hasher.hash_one(identity) as usize) % self.shards.len();
        &self.shards[idx]
    }
}

/// Make room in a full shard
fn evict(shard: &mut Shard, capacity: usize, now: Instant, window: Duration) {
    shard.retain(|_, w| now.saturating_duration_since(w.window_start) < window);
    if shard.len() < capacity {
        return;
    }

    let batch = (capacity / EVICTION_DIVISOR).clamp(1, shard.len());
    let mut starts: Vec<Instant> = shard.values().map(|w| w.window_start).collect();
    let (_, cutoff, _) = starts.select_nth_unstable(batch - 1);
    let cutoff = *cutoff;

    let mut removed = 0;
    shard.retain(|_, w| {
        if removed < batch && w.window_start <= cutoff {
            removed += 1;
            false
        } else {
            true
        }
    });
    debug!("Evicted {} rate windows from a full shard", removed);
}
