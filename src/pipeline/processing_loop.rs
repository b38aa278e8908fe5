//! Unified ingest loop shared across all input modes.
//!
//! [`ProcessingLoop`] owns the [`SightingStore`] exclusively. Each payload
//! from a [`BatchSource`] is ingested, the resulting rarity events are handed
//! to the notifier (unless the store is still warming up), and a fresh
//! [`StoreSnapshot`] is published for readers.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::source::{BatchEvent, BatchSource};
use crate::notify::{render_summary, RarityNotifier};
use crate::rarity::Summary;
use crate::store::{SightingStore, StoreSnapshot};
use crate::types::RarityEvent;

/// Snapshot handle shared between the loop (writer) and readers.
pub type SharedSnapshot = Arc<ArcSwap<StoreSnapshot>>;

/// Create a shared handle seeded with the store's current state.
pub fn shared_snapshot(store: &SightingStore) -> SharedSnapshot {
    Arc::new(ArcSwap::from_pointee(store.snapshot()))
}

/// Counters returned when the loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub payloads: u64,
    pub rarity_events: u64,
    pub notified: u64,
    /// Events raised during warm-up and not delivered
    pub suppressed: u64,
    pub notify_failures: u64,
}

impl LoopStats {
    /// Events were raised after warm-up but none could be delivered.
    pub const fn delivery_broken(&self) -> bool {
        self.notify_failures > 0 && self.notified == 0
    }
}

// ============================================================================
// Processing Loop
// ============================================================================

/// Owns the store and the notifier for the lifetime of the run.
///
/// Built with [`new()`](ProcessingLoop::new), optionally given a warm-up with
/// [`with_warmup()`](ProcessingLoop::with_warmup), then consumed by
/// [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop<N: RarityNotifier> {
    store: SightingStore,
    notifier: N,
    published: SharedSnapshot,
    cancel_token: CancellationToken,
    warmup: Duration,
}

impl<N: RarityNotifier> ProcessingLoop<N> {
    /// A loop with no warm-up: notification starts with the first payload.
    pub fn new(
        store: SightingStore,
        notifier: N,
        published: SharedSnapshot,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            notifier,
            published,
            cancel_token,
            warmup: Duration::ZERO,
        }
    }

    /// Suppress notification until `warmup` has elapsed from the start of
    /// [`run()`](ProcessingLoop::run). Tallying is never suppressed.
    #[must_use]
    pub const fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Run until the source is exhausted or cancellation.
    pub async fn run<S: BatchSource>(mut self, source: &mut S) -> LoopStats {
        let mut stats = LoopStats::default();
        let started = Instant::now();

        if self.warmup.is_zero() {
            self.store.finish_warmup();
        } else {
            info!(
                warmup_secs = self.warmup.as_secs(),
                "⏳ Warm-up started, rarity notifications suppressed"
            );
        }

        info!(source = source.source_name(), "📡 Ingesting aircraft snapshots");

        loop {
            let event = tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("[ProcessingLoop] Shutdown signal received");
                    break;
                }
                result = source.next_batch() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!(error = %e, "[ProcessingLoop] Source error");
                            break;
                        }
                    }
                }
            };

            let payload = match event {
                BatchEvent::Payload(p) => p,
                BatchEvent::Eof => {
                    info!(
                        payloads = stats.payloads,
                        "[ProcessingLoop] Source reached end"
                    );
                    break;
                }
            };
            stats.payloads += 1;

            if self.store.is_warming_up() && started.elapsed() >= self.warmup {
                self.store.finish_warmup();
                info!(
                    sightings = self.store.sighting_count(),
                    "✅ Warm-up complete, rarity notifications enabled"
                );
            }

            let events = self.store.ingest_payload(&payload);
            stats.rarity_events += events.len() as u64;
            self.dispatch(&events, &mut stats);

            self.published.store(Arc::new(self.store.snapshot()));
        }

        let store_stats = self.store.stats();
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 FINAL STATISTICS");
        info!("   Payloads Received:    {}", stats.payloads);
        info!("   Batches Ingested:     {}", store_stats.cycles);
        info!("   Aircraft Observed:    {}", store_stats.observations);
        info!("   Distinct Airframes:   {}", self.store.sighting_count());
        info!("   Rarity Events:        {}", stats.rarity_events);
        info!("   Notified / Suppressed: {} / {}", stats.notified, stats.suppressed);
        info!("   Notify Failures:      {}", stats.notify_failures);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        stats
    }

    fn dispatch(&mut self, events: &[RarityEvent], stats: &mut LoopStats) {
        for event in events {
            if self.store.is_warming_up() {
                stats.suppressed += 1;
                continue;
            }
            match self.notifier.notify(event) {
                Ok(()) => stats.notified += 1,
                Err(e) => {
                    stats.notify_failures += 1;
                    warn!(hex = %event.hex, flag = %event.flag, error = %e, "Notification failed");
                }
            }
        }
    }
}

// ============================================================================
// Summary Task
// ============================================================================

/// Render the summary for whatever snapshot is currently published.
pub fn summary_text(published: &SharedSnapshot, location: &str) -> String {
    let snapshot = published.load();
    render_summary(&Summary::from_snapshot(&snapshot, location))
}

/// Print the summary every `every` until cancelled. The first summary is
/// printed one full interval after start.
pub async fn run_summary_task(
    published: SharedSnapshot,
    location: String,
    every: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                print!("{}", summary_text(&published, &location));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
