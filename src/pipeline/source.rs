//! Batch source abstraction for aircraft snapshot ingestion.
//!
//! Provides a unified trait for reading raw snapshot payloads from different
//! sources: the live aggregator (HTTP polling), stdin (JSON lines) and a
//! recorded file (replay). Payloads are handed to the store unparsed; the
//! store owns the malformed-payload policy.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use super::fetch::AdsbClient;

/// Events produced by a batch source.
#[derive(Debug)]
pub enum BatchEvent {
    /// One raw snapshot payload.
    Payload(Vec<u8>),
    /// Source reached end of data (EOF for files/stdin).
    Eof,
}

/// Trait abstracting where aircraft snapshots come from.
///
/// The processing loop calls [`next_batch`](BatchSource::next_batch) in a
/// `select!` with cancellation, so implementations may wait freely.
#[async_trait]
pub trait BatchSource: Send + 'static {
    /// Read the next payload from the source.
    ///
    /// Returns `BatchEvent::Eof` when no more data is available.
    async fn next_batch(&mut self) -> Result<BatchEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// HTTP Source (live aggregator polling)
// ============================================================================

/// Polls one aggregator URL on a fixed interval.
///
/// Fetch failures are logged and the source waits for the next tick; it
/// never reports EOF.
pub struct HttpSource {
    client: AdsbClient,
    url: String,
    ticker: Interval,
    failures: u64,
}

impl HttpSource {
    pub fn new(client: AdsbClient, url: String, every: Duration) -> Self {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            client,
            url,
            ticker,
            failures: 0,
        }
    }

    pub const fn failures(&self) -> u64 {
        self.failures
    }
}

#[async_trait]
impl BatchSource for HttpSource {
    async fn next_batch(&mut self) -> Result<BatchEvent> {
        loop {
            self.ticker.tick().await;
            match self.client.fetch(&self.url).await {
                Ok(body) => return Ok(BatchEvent::Payload(body)),
                Err(e) => {
                    self.failures += 1;
                    warn!(
                        url = %self.url,
                        error = %e,
                        failures = self.failures,
                        "Aircraft fetch failed, retrying next cycle"
                    );
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "adsb-http"
    }
}

// ============================================================================
// Stdin Source (one JSON payload per line)
// ============================================================================

/// Reads snapshot payloads from stdin, one JSON document per line.
///
/// `curl -s https://opendata.adsb.fi/api/v2/mil | airspottr --stdin`
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(64 * 1024),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchSource for StdinSource {
    async fn next_batch(&mut self) -> Result<BatchEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(BatchEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if !line.is_empty() {
                return Ok(BatchEvent::Payload(line.as_bytes().to_vec()));
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// Replay Source (recorded JSON lines)
// ============================================================================

/// Replays pre-loaded payloads with an optional inter-payload delay.
pub struct ReplaySource {
    payloads: std::vec::IntoIter<Vec<u8>>,
    delay_ms: u64,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(payloads: Vec<Vec<u8>>, delay_ms: u64) -> Self {
        Self {
            payloads: payloads.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }

    /// Load a recording with one JSON payload per non-blank line.
    pub fn from_file(path: &Path, delay_ms: u64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading replay file {}", path.display()))?;
        let payloads: Vec<Vec<u8>> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.as_bytes().to_vec())
            .collect();
        info!(path = %path.display(), payloads = payloads.len(), "Loaded replay recording");
        Ok(Self::new(payloads, delay_ms))
    }

    pub fn remaining(&self) -> usize {
        self.payloads.len()
    }
}

#[async_trait]
impl BatchSource for ReplaySource {
    async fn next_batch(&mut self) -> Result<BatchEvent> {
        // No delay before the first payload
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        match self.payloads.next() {
            Some(p) => {
                self.yielded_first = true;
                Ok(BatchEvent::Payload(p))
            }
            None => Ok(BatchEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}
