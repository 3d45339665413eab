//! Dispatcher: worker pool lifecycle, queue feeding, and result merging.

use log::{debug, warn};
use std::thread;
use std::time::Instant;

use super::context::SearchOpts;
use super::error_handler::{JoinedReports, collect_worker_outcomes, into_search_result};
use super::queue::WorkQueue;
use super::worker::{Worker, WorkerShared};
use crate::error::{SearchError, SearchResult};
use crate::hits::HitCollection;
use crate::scoring::ScoringEngine;
use crate::utils::config::{PackagePaths, WorkerThreadLimits};

/// Puts one shutdown sentinel per started worker when dropped. Dropped explicitly once every
/// query is queued; on an early return or unwind it still runs, so no worker is left blocked
/// in `get` and the thread scope can exit.
struct ShutdownOnDrop<'q, Q> {
    queue: &'q WorkQueue<Q>,
    workers: usize,
}

impl<Q> Drop for ShutdownOnDrop<'_, Q> {
    fn drop(&mut self) {
        for _ in 0..self.workers {
            let _ = self.queue.put_shutdown();
        }
    }
}

/// Resolve the worker count: `None` autodetects (at least one), `Some(0)` is an error.
pub fn resolve_concurrency(requested: Option<usize>) -> SearchResult<usize> {
    match requested {
        Some(0) => Err(SearchError::ConcurrencyConfig { requested: 0 }),
        Some(n) => Ok(n),
        None => Ok(WorkerThreadLimits::available()),
    }
}

/// Map a signed job count (CLI style) to a concurrency request: `0` autodetects, negative
/// values are rejected.
pub fn concurrency_from_jobs(jobs: i64) -> SearchResult<Option<usize>> {
    match jobs {
        j if j < 0 => Err(SearchError::ConcurrencyConfig { requested: j }),
        0 => Ok(None),
        j => usize::try_from(j)
            .map(Some)
            .map_err(|_| SearchError::ConcurrencyConfig { requested: j }),
    }
}

/// Fans queries out over a fixed pool of workers and merges their hits.
///
/// Holds nothing between calls but a reference to the engine: the queue, workers and
/// per-worker results are created for each [`search`](Self::search) and dropped afterwards.
pub struct Dispatcher<'e, E: ScoringEngine> {
    engine: &'e E,
}

impl<'e, E: ScoringEngine> Dispatcher<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    /// Search every query against `targets` with `concurrency` workers (`None` = one per
    /// logical CPU).
    ///
    /// # Partial failure
    ///
    /// A query the engine fails on does not stop the search. When any query fails, the result
    /// is [`SearchError::EngineFailures`], which lists each failed query and still carries the
    /// merged hits of all the others.
    pub fn search<I>(
        &self,
        queries: I,
        targets: &[E::Target],
        concurrency: Option<usize>,
    ) -> SearchResult<HitCollection>
    where
        I: IntoIterator<Item = E::Query>,
    {
        self.search_with(
            queries,
            targets,
            &SearchOpts {
                concurrency,
                ..SearchOpts::default()
            },
        )
    }

    /// [`search`](Self::search) with cancellation and progress reporting.
    ///
    /// When the cancel token fires, queries still in the queue are acked without being searched
    /// and the call returns [`SearchError::Cancelled`] with the hits gathered so far.
    pub fn search_with<I>(
        &self,
        queries: I,
        targets: &[E::Target],
        opts: &SearchOpts,
    ) -> SearchResult<HitCollection>
    where
        I: IntoIterator<Item = E::Query>,
    {
        let workers = resolve_concurrency(opts.concurrency)?;
        let started = Instant::now();
        debug!(
            "dispatching over {} workers against {} targets",
            workers,
            targets.len()
        );

        let queue: WorkQueue<E::Query> = WorkQueue::new();
        let shared = WorkerShared {
            queue: &queue,
            targets,
            cancel: opts.cancel.as_ref(),
            on_progress: opts.on_progress.as_ref(),
        };

        let reports = thread::scope(|scope| -> SearchResult<JoinedReports> {
            let shared = &shared;
            let mut shutdown = ShutdownOnDrop {
                queue: &queue,
                workers: 0,
            };
            let mut handles = Vec::with_capacity(workers);
            for id in 0..workers {
                let worker = Worker::new(id, self.engine);
                let handle = thread::Builder::new()
                    .name(PackagePaths::get().worker_thread_name(id))
                    .spawn_scoped(scope, move || worker.run(shared))
                    .map_err(|e| {
                        SearchError::queue_protocol(format!("failed to spawn worker {id}: {e}"))
                    })?;
                handles.push(handle);
                shutdown.workers += 1;
            }

            // Queries stream into the queue while the workers are already pulling.
            let mut queued = 0_usize;
            for (index, query) in queries.into_iter().enumerate() {
                queue.put_query(index, query)?;
                queued += 1;
            }
            drop(shutdown);
            debug!("queued {} queries and {} sentinels", queued, workers);

            let joined = queue.join();
            let reports = handles.into_iter().map(|h| h.join()).collect();
            joined?;
            Ok(reports)
        })?;

        let outcome = collect_worker_outcomes(reports)?;
        debug!(
            "search finished in {:?}: {} searched, {} failed, {} skipped",
            started.elapsed(),
            outcome.searched,
            outcome.failures.len(),
            outcome.skipped.len()
        );
        if !outcome.failures.is_empty() {
            warn!("{} queries failed", outcome.failures.len());
        }
        into_search_result(outcome)
    }
}
