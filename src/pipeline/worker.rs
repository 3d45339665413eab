//! Worker loop: pull queries off the queue, search them, keep hits and failures local.

use log::{debug, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use super::context::{CancelToken, ProgressCallback, SearchContext};
use super::queue::{WorkItem, WorkQueue};
use crate::error::{QueryFailure, SearchResult, SkippedQuery};
use crate::hits::HitCollection;
use crate::scoring::ScoringEngine;

/// Everything a worker produced, handed back to the dispatcher after it terminates.
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub id: usize,
    pub hits: HitCollection,
    pub failures: Vec<QueryFailure>,
    pub skipped: Vec<SkippedQuery>,
    /// Queries searched successfully.
    pub searched: usize,
    /// Time spent inside the engine.
    pub busy: Duration,
}

/// One pool member: a private search context plus the results it accumulates.
pub struct Worker<'e, E: ScoringEngine> {
    context: SearchContext<'e, E>,
    report: WorkerReport,
}

/// Shared, read-only inputs every worker loop needs.
pub struct WorkerShared<'a, E: ScoringEngine> {
    pub queue: &'a WorkQueue<E::Query>,
    pub targets: &'a [E::Target],
    pub cancel: Option<&'a CancelToken>,
    pub on_progress: Option<&'a ProgressCallback>,
}

/// Aborts the queue if the worker unwinds, so `join` reports the failure instead of hanging.
struct AbortOnUnwind<'a, Q> {
    queue: &'a WorkQueue<Q>,
    id: usize,
}

impl<Q> Drop for AbortOnUnwind<'_, Q> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.queue
                .abort(format!("worker {} panicked outside the scoring engine", self.id));
        }
    }
}

fn ack_or_abort<Q>(queue: &WorkQueue<Q>) -> SearchResult<()> {
    queue.ack().inspect_err(|e| queue.abort(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<'e, E: ScoringEngine> Worker<'e, E> {
    pub fn new(id: usize, engine: &'e E) -> Self {
        Self {
            context: SearchContext::new(engine),
            report: WorkerReport {
                id,
                ..WorkerReport::default()
            },
        }
    }

    pub fn id(&self) -> usize {
        self.report.id
    }

    /// Engine-reported name of `query`. A panicking `query_name` falls back to the index.
    fn query_name(&self, index: usize, query: &E::Query) -> String {
        panic::catch_unwind(AssertUnwindSafe(|| self.context.query_name(query)))
            .unwrap_or_else(|_| format!("<query #{index}>"))
    }

    /// Search one query. Engine errors and engine panics both become a [`QueryFailure`];
    /// a panic also rebuilds the scratch state, since it may have been left half-written.
    fn process(&mut self, index: usize, query: E::Query, targets: &[E::Target]) {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.context.search(&query, targets)));
        self.report.busy += started.elapsed();

        let error = match outcome {
            Ok(Ok(hits)) => {
                self.report.hits.combine(hits);
                self.report.searched += 1;
                return;
            }
            Ok(Err(e)) => e,
            Err(payload) => {
                self.context = SearchContext::new(self.context.engine());
                anyhow::anyhow!("scoring engine panicked: {}", panic_message(payload.as_ref()))
            }
        };
        let name = self.query_name(index, &query);
        warn!("worker {}: query #{} ({}) failed: {:#}", self.id(), index, name, error);
        self.report.failures.push(QueryFailure {
            index,
            query: name,
            error,
        });
    }

    /// Pull loop. Returns after consuming exactly one shutdown sentinel. Every dequeued item is
    /// acked whatever happens to it, so the queue's `join` is never stranded by a bad query.
    pub fn run(mut self, shared: &WorkerShared<'_, E>) -> SearchResult<WorkerReport> {
        let _guard = AbortOnUnwind {
            queue: shared.queue,
            id: self.id(),
        };
        debug!("worker {} started", self.id());
        loop {
            let item = match shared.queue.get() {
                Ok(item) => item,
                Err(e) => {
                    shared.queue.abort(e.to_string());
                    return Err(e);
                }
            };
            match item {
                WorkItem::Shutdown => {
                    ack_or_abort(shared.queue)?;
                    break;
                }
                WorkItem::Query { index, query } => {
                    if shared.cancel.is_some_and(CancelToken::is_cancelled) {
                        let name = self.query_name(index, &query);
                        self.report.skipped.push(SkippedQuery { index, query: name });
                    } else {
                        self.process(index, query, shared.targets);
                    }
                    if let Some(cb) = shared.on_progress {
                        cb(1);
                    }
                    ack_or_abort(shared.queue)?;
                }
            }
        }
        debug!(
            "worker {} terminated: {} searched, {} failed, {} skipped, {:?} busy",
            self.id(),
            self.report.searched,
            self.report.failures.len(),
            self.report.skipped.len(),
            self.report.busy
        );
        Ok(self.report)
    }
}
