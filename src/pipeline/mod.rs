//! Concurrent search dispatcher: queue, workers, orchestration, failure aggregation.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod queue;
pub mod worker;

pub use context::{CancelToken, ProgressCallback, SearchContext, SearchOpts};
pub use error_handler::{DispatchOutcome, collect_worker_outcomes, into_search_result};
pub use orchestrator::{Dispatcher, concurrency_from_jobs, resolve_concurrency};
pub use queue::{WorkItem, WorkQueue};
pub use worker::{Worker, WorkerReport, WorkerShared};
