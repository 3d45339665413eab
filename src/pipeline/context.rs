//! Per-worker search context and the small pieces of state shared across the pool.

use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::hits::HitCollection;
use crate::scoring::ScoringEngine;

/// One worker's private scoring state: a shared, read-only engine plus scratch buffers that
/// only this worker touches.
pub struct SearchContext<'e, E: ScoringEngine> {
    engine: &'e E,
    scratch: E::Scratch,
}

impl<'e, E: ScoringEngine> SearchContext<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self {
            engine,
            scratch: engine.new_scratch(),
        }
    }

    pub fn engine(&self) -> &'e E {
        self.engine
    }

    pub fn query_name(&self, query: &E::Query) -> String {
        self.engine.query_name(query)
    }

    /// Search one query into a fresh accumulator. The accumulator is only returned when the
    /// engine succeeds, so a failed query never leaks partial hits into the worker's results.
    /// The query is counted in the accumulator's stats here, not by the engine.
    pub fn search(&mut self, query: &E::Query, targets: &[E::Target]) -> Result<HitCollection> {
        let mut hits = HitCollection::new();
        self.engine
            .search(&mut self.scratch, query, targets, &mut hits)?;
        hits.record_query(targets.len());
        Ok(hits)
    }
}

/// Cooperative cancellation flag, checked by workers between queries.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Called with `1` each time a query settles (searched, failed, or skipped).
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Knobs for one [`Dispatcher`](super::Dispatcher) call.
#[derive(Clone, Default)]
pub struct SearchOpts {
    /// Worker count. `None` autodetects; `Some(0)` is rejected.
    pub concurrency: Option<usize>,
    pub cancel: Option<CancelToken>,
    pub on_progress: Option<ProgressCallback>,
}

impl SearchOpts {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: Some(concurrency),
            ..Self::default()
        }
    }
}

impl fmt::Debug for SearchOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOpts")
            .field("concurrency", &self.concurrency)
            .field("cancel", &self.cancel)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}
