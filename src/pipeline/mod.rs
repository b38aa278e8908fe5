//! Ingest Pipeline
//!
//! ```text
//! BatchSource ──payload──▶ ProcessingLoop ──▶ SightingStore::ingest
//!   (http/stdin/replay)        │                    │
//!                              │◀──RarityEvent──────┘
//!                              ├──▶ RarityNotifier (after warm-up)
//!                              └──▶ ArcSwap<StoreSnapshot> ──▶ summary task, API
//! ```
//!
//! The store is only ever touched by the loop task. Everyone else reads the
//! published snapshot.

pub mod fetch;
pub mod processing_loop;
pub mod source;

pub use fetch::{aircraft_url, military_url, validate_url, AdsbClient, FetchError};
pub use processing_loop::{
    run_summary_task, shared_snapshot, summary_text, LoopStats, ProcessingLoop, SharedSnapshot,
};
pub use source::{BatchEvent, BatchSource, HttpSource, ReplaySource, StdinSource};
