//! Error types for a search call.
//!
//! [`SearchError`] is what [`Dispatcher::search`](crate::pipeline::Dispatcher::search) returns.
//! Two variants carry the merged hits of every query that did complete, so a caller can
//! still report partial results:
//!
//! - [`SearchError::EngineFailures`]: the scoring engine failed (or panicked) on one or more
//!   queries. Every other query was searched normally.
//! - [`SearchError::Cancelled`]: the [`CancelToken`](crate::pipeline::CancelToken) fired;
//!   queries dequeued after that point were skipped.
//!
//! Use [`SearchError::into_partial_hits`] to recover them.

use std::fmt;
use thiserror::Error;

use crate::hits::HitCollection;

/// One query the engine could not search.
#[derive(Debug)]
pub struct QueryFailure {
    /// Position of the query in the caller's input sequence.
    pub index: usize,
    /// Engine-reported name of the query.
    pub query: String,
    pub error: anyhow::Error,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query #{} ({}): {:#}", self.index, self.query, self.error)
    }
}

/// A query that was dequeued after cancellation and never searched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedQuery {
    pub index: usize,
    pub query: String,
}

#[derive(Error, Debug)]
pub enum SearchError {
    /// Explicit worker count was zero or negative. Raised before any worker starts.
    #[error("invalid concurrency: {requested} (expected a positive worker count, or 0/unset to autodetect)")]
    ConcurrencyConfig { requested: i64 },

    /// The engine failed on some queries. `hits` holds the merged results of the others.
    #[error("{} of {} queries failed:\n{}", .failures.len(), .failures.len() + .hits.stats().queries_searched, format_failures(.failures))]
    EngineFailures {
        failures: Vec<QueryFailure>,
        hits: HitCollection,
    },

    /// Search was cancelled. `hits` holds everything accumulated before the stop.
    #[error("search cancelled; {} queries skipped", .skipped.len())]
    Cancelled {
        skipped: Vec<SkippedQuery>,
        hits: HitCollection,
    },

    /// Internal invariant violation in the queue or worker pool. Not recoverable.
    #[error("work queue protocol violation: {0}")]
    QueueProtocol(String),
}

fn format_failures(failures: &[QueryFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl SearchError {
    pub fn queue_protocol<S: Into<String>>(msg: S) -> Self {
        SearchError::QueueProtocol(msg.into())
    }

    /// Merged hits of the queries that completed, for the variants that carry them.
    pub fn partial_hits(&self) -> Option<&HitCollection> {
        match self {
            SearchError::EngineFailures { hits, .. } | SearchError::Cancelled { hits, .. } => {
                Some(hits)
            }
            _ => None,
        }
    }

    pub fn into_partial_hits(self) -> Option<HitCollection> {
        match self {
            SearchError::EngineFailures { hits, .. } | SearchError::Cancelled { hits, .. } => {
                Some(hits)
            }
            _ => None,
        }
    }

    /// Failed queries, empty for every variant but [`SearchError::EngineFailures`].
    pub fn failures(&self) -> &[QueryFailure] {
        match self {
            SearchError::EngineFailures { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// Result alias for dispatcher operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
