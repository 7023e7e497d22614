//! Progress-callback trait for per-record enrichment events.
//!
//! Pass an [`Arc<dyn EnrichProgressCallback>`] to
//! [`crate::enrich::enrich_records`] to receive events as each record is
//! resolved. The CLI forwards them to an indicatif progress bar; a service
//! could forward them to a channel or a job table instead.
//!
//! # Example
//!
//! ```rust
//! use case_extract::EnrichProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counting(AtomicUsize);
//!
//! impl EnrichProgressCallback for Counting {
//!     fn on_record_complete(&self, index: usize, total: usize) {
//!         let done = self.0.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("record {} done ({}/{})", index + 1, done, total);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by [`crate::enrich::enrich_records`] as it processes records.
///
/// Records are enriched concurrently, so `on_record_start` and
/// `on_record_complete` may arrive out of order and from different tasks.
/// Protect shared state with atomics or a `Mutex`. Every method defaults to
/// a no-op.
pub trait EnrichProgressCallback: Send + Sync {
    /// Called once before the first record starts.
    fn on_enrich_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a record's lookups are issued.
    ///
    /// # Arguments
    /// * `index`: 0-based position in the input
    /// * `total`: number of records in the batch
    fn on_record_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a record's lookups have all finished.
    fn on_record_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called once after every record has been attempted.
    ///
    /// # Arguments
    /// * `total`: records in the batch
    /// * `resolved`: records that gained at least one identifier
    fn on_enrich_complete(&self, total: usize, resolved: usize) {
        let _ = (total, resolved);
    }
}

/// Used when the caller does not want progress events.
pub struct NoopProgressCallback;

impl EnrichProgressCallback for NoopProgressCallback {}

/// Shared handle passed to the batch API.
pub type ProgressCallback = Arc<dyn EnrichProgressCallback>;
