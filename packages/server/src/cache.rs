//! In-process cache of the last on-demand pipeline run.
//!
//! One slot, guarded by an async mutex that stays locked while a refresh
//! runs. Concurrent misses therefore queue behind a single upstream run and
//! then read its result. A failed refresh leaves the slot as it was.
//!
//! The slot always holds the full ranking (no games threshold). Callers
//! filter per request, so the threshold never leaks between requests.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use leaderboard_stats_models::Snapshot;
use tokio::sync::Mutex;

/// How long a pipeline result is served before the next request refreshes it.
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    computed_at: Instant,
}

/// Result of [`LeaderboardCache::get_or_refresh`].
#[derive(Debug, Clone)]
pub struct CacheLookup {
    /// The full ranked snapshot.
    pub snapshot: Arc<Snapshot>,
    /// `true` if no refresh ran for this lookup.
    pub cached: bool,
}

/// Single-slot, single-flight snapshot cache.
#[derive(Debug)]
pub struct LeaderboardCache {
    ttl: Duration,
    slot: Mutex<Option<CacheEntry>>,
}

impl Default for LeaderboardCache {
    fn default() -> Self {
        Self::new(CACHE_TTL)
    }
}

impl LeaderboardCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached snapshot if it is younger than the TTL at `now`,
    /// otherwise awaits `refresh`, stores its result and returns it.
    ///
    /// A stored entry is stamped when `refresh` completes, or with `now` if
    /// that is later, so a slow upstream run does not eat into the TTL.
    ///
    /// # Errors
    ///
    /// Returns whatever `refresh` fails with. The cache is not modified.
    pub async fn get_or_refresh<F, Fut, E>(
        &self,
        now: Instant,
        refresh: F,
    ) -> Result<CacheLookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(entry) = slot.as_ref() {
            if now.saturating_duration_since(entry.computed_at) < self.ttl {
                return Ok(CacheLookup {
                    snapshot: entry.snapshot.clone(),
                    cached: true,
                });
            }
            log::debug!("Cached leaderboard expired, refreshing");
        }

        let snapshot = Arc::new(refresh().await?);
        *slot = Some(CacheEntry {
            snapshot: snapshot.clone(),
            computed_at: Instant::now().max(now),
        });

        Ok(CacheLookup {
            snapshot,
            cached: false,
        })
    }

    /// Drops the cached entry.
    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}
