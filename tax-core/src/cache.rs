//! Time-bounded cache in front of a [`BracketSource`].
//!
//! Entries expire lazily: a lookup older than the TTL is treated as a miss
//! and the stale entry stays in the map until a successful fetch replaces
//! it. Failed fetches are never cached and never fall back to stale data.
//!
//! Concurrent misses for the same year share one in-flight fetch and all
//! receive its outcome, success or failure. The fetch runs on its own task,
//! so a caller that stops waiting does not cancel the fetch or the cache
//! write that follows it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::models::BracketSet;
use crate::source::{BracketSource, SourceError};

/// How long a fetched schedule stays fresh unless configured otherwise.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

type FetchOutcome = Result<Arc<BracketSet>, SourceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age of an entry that may still be served.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    brackets: Arc<BracketSet>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_live(
        &self,
        ttl: Duration,
    ) -> bool {
        Instant::now().saturating_duration_since(self.fetched_at) <= ttl
    }
}

/// A fetch in progress. `outcome` holds `None` until the fetch settles.
struct Flight {
    id: u64,
    outcome: watch::Receiver<Option<FetchOutcome>>,
}

struct CacheInner {
    source: Arc<dyn BracketSource>,
    ttl: Duration,
    entries: RwLock<HashMap<i32, CacheEntry>>,
    // At most one per year; removed as soon as its fetch settles.
    flights: Mutex<HashMap<i32, Flight>>,
    next_flight: AtomicU64,
    // Bumped by `clear_cache`; fetches started before the bump are not stored.
    generation: AtomicU64,
}

/// Year-keyed cache of bracket schedules.
///
/// Cloning is cheap and every clone shares the same entries, so one cache
/// built at startup can be handed to each request handler.
#[derive(Clone)]
pub struct BracketCache {
    inner: Arc<CacheInner>,
}

impl BracketCache {
    pub fn new(
        source: Arc<dyn BracketSource>,
        config: CacheConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                source,
                ttl: config.ttl,
                entries: RwLock::new(HashMap::new()),
                flights: Mutex::new(HashMap::new()),
                next_flight: AtomicU64::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Returns the schedule for `year`, fetching it on a miss or expiry.
    ///
    /// # Errors
    ///
    /// Returns the [`SourceError`] of the failed fetch. Nothing is cached in
    /// that case, and an expired entry is not served in its place.
    pub async fn get(
        &self,
        year: i32,
    ) -> Result<Arc<BracketSet>, SourceError> {
        if let Some(brackets) = self.inner.lookup(year).await {
            debug!(year, "bracket cache hit");
            return Ok(brackets);
        }

        debug!(year, "bracket cache miss");
        let mut outcome = self.inner.join_flight(year);

        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|settled| (*settled).clone());

        settled.unwrap_or_else(|| {
            Err(SourceError::Task(
                "bracket fetch ended without a result".to_string(),
            ))
        })
    }

    /// Drops every entry. The next lookup for any year fetches again, even
    /// if a fetch for that year is still running.
    pub async fn clear_cache(&self) {
        let mut entries = self.inner.entries.write().await;
        entries.clear();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.lock_flights().clear();
        info!("bracket cache cleared");
    }

    /// Number of entries held, including expired ones not yet replaced.
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    fn flights_in_progress(&self) -> usize {
        self.inner.lock_flights().len()
    }
}

impl CacheInner {
    async fn lookup(
        &self,
        year: i32,
    ) -> Option<Arc<BracketSet>> {
        let entries = self.entries.read().await;
        entries
            .get(&year)
            .filter(|entry| entry.is_live(self.ttl))
            .map(|entry| Arc::clone(&entry.brackets))
    }

    fn lock_flights(&self) -> MutexGuard<'_, HashMap<i32, Flight>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to the running fetch for `year`, starting one if none is.
    fn join_flight(
        self: &Arc<Self>,
        year: i32,
    ) -> watch::Receiver<Option<FetchOutcome>> {
        let mut flights = self.lock_flights();
        if let Some(flight) = flights.get(&year) {
            debug!(year, "joining in-flight bracket fetch");
            return flight.outcome.clone();
        }

        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::SeqCst);
        let (sender, outcome) = watch::channel(None);
        flights.insert(
            year,
            Flight {
                id,
                outcome: outcome.clone(),
            },
        );
        drop(flights);

        let landing = FlightLanding {
            inner: Arc::clone(self),
            year,
            id,
        };
        tokio::spawn(async move {
            let result = landing.inner.fetch_and_store(year, generation).await;
            drop(landing);
            sender.send_replace(Some(result));
        });

        outcome
    }

    async fn fetch_and_store(
        &self,
        year: i32,
        generation: u64,
    ) -> FetchOutcome {
        // Filled by a flight that landed between our lookup and our start.
        if let Some(brackets) = self.lookup(year).await {
            return Ok(brackets);
        }

        info!(year, "fetching tax brackets");
        let brackets = match self.source.fetch_brackets(year).await {
            Ok(brackets) => Arc::new(brackets),
            Err(error) => {
                warn!(year, %error, "tax bracket fetch failed");
                return Err(error);
            }
        };

        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            entries.insert(
                year,
                CacheEntry {
                    brackets: Arc::clone(&brackets),
                    fetched_at: Instant::now(),
                },
            );
        } else {
            debug!(year, "cache cleared during fetch; result not stored");
        }

        Ok(brackets)
    }
}

/// Removes a flight from the map when its task finishes, panics included.
struct FlightLanding {
    inner: Arc<CacheInner>,
    year: i32,
    id: u64,
}

impl Drop for FlightLanding {
    fn drop(&mut self) {
        let mut flights = self.inner.lock_flights();
        if flights.get(&self.year).is_some_and(|flight| flight.id == self.id) {
            flights.remove(&self.year);
        }
    }
}
