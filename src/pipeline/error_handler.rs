use log::warn;
use std::thread;

use super::worker::WorkerReport;
use crate::error::{QueryFailure, SearchError, SearchResult, SkippedQuery};
use crate::hits::HitCollection;

/// Per-worker results as returned by joining the worker threads.
pub type JoinedReports = Vec<thread::Result<SearchResult<WorkerReport>>>;

/// Everything the pool produced, merged across workers.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub hits: HitCollection,
    /// Sorted by query index.
    pub failures: Vec<QueryFailure>,
    /// Sorted by query index.
    pub skipped: Vec<SkippedQuery>,
    pub searched: usize,
}

/// Merge joined worker reports. A worker thread that panicked or stopped on a queue error is an
/// internal fault and fails the whole call; engine failures are only gathered here.
pub fn collect_worker_outcomes(reports: JoinedReports) -> SearchResult<DispatchOutcome> {
    let mut outcome = DispatchOutcome::default();
    let mut collections = Vec::with_capacity(reports.len());
    for (id, joined) in reports.into_iter().enumerate() {
        let report = joined
            .map_err(|_| SearchError::queue_protocol(format!("worker {id} thread panicked")))??;
        collections.push(report.hits);
        outcome.failures.extend(report.failures);
        outcome.skipped.extend(report.skipped);
        outcome.searched += report.searched;
    }
    outcome.hits = HitCollection::merge_all(collections);
    outcome.failures.sort_by_key(|f| f.index);
    outcome.skipped.sort_by_key(|s| s.index);
    Ok(outcome)
}

/// Apply the partial-success policy: failures win over cancellation, and both still hand the
/// merged hits back to the caller.
pub fn into_search_result(outcome: DispatchOutcome) -> SearchResult<HitCollection> {
    let DispatchOutcome {
        hits,
        failures,
        skipped,
        ..
    } = outcome;
    if !failures.is_empty() {
        if !skipped.is_empty() {
            warn!(
                "{} queries were also skipped after cancellation",
                skipped.len()
            );
        }
        return Err(SearchError::EngineFailures { failures, hits });
    }
    if !skipped.is_empty() {
        return Err(SearchError::Cancelled { skipped, hits });
    }
    Ok(hits)
}
