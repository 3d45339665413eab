//! Homsearch: concurrent homology search dispatcher.
//!
//! Queries are fanned out over a fixed pool of worker threads, each running a
//! [`ScoringEngine`](scoring::ScoringEngine) against one shared, read-only target corpus.
//! Per-worker [`HitCollection`]s are merged into a single result whose contents do not depend
//! on the number of workers or on scheduling order.

pub mod engine;
pub mod error;
pub mod hits;
pub mod pipeline;
pub mod scoring;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{QueryFailure, SearchError, SearchResult, SkippedQuery};
pub use hits::{Domain, Hit, HitCollection, SearchStats};
pub use pipeline::{CancelToken, Dispatcher, SearchOpts};
pub use scoring::{Alphabet, DigitalSequence, Profile, ProfileEngine, ScoringEngine};
pub use types::Opts;

use log::debug;

/// Result alias used by the application layer (loaders, CLI).
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Search `models` against `sequences` with the reference engine and return the merged hits.
///
/// `jobs == 0` uses one worker per logical CPU. The engine's alphabet is taken from the
/// sequences (amino when there are none). See [`Dispatcher::search`] for the partial-failure
/// contract.
///
/// ```ignore
/// let models = homsearch::engine::load_profiles(hmm_path, Alphabet::Amino, &scheme)?;
/// let sequences = homsearch::engine::load_sequences(db_path, Alphabet::Amino)?;
/// let hits = homsearch::hmmsearch(models, &sequences, 0)?;
/// ```
pub fn hmmsearch<I>(models: I, sequences: &[DigitalSequence], jobs: usize) -> SearchResult<HitCollection>
where
    I: IntoIterator<Item = Profile>,
{
    let alphabet = sequences
        .first()
        .map(|s| s.alphabet)
        .unwrap_or_default();
    let engine = ProfileEngine::new(alphabet);
    let concurrency = (jobs > 0).then_some(jobs);
    debug!(
        "{} hmmsearch: {} sequences, jobs={:?}",
        env!("CARGO_PKG_NAME"),
        sequences.len(),
        concurrency
    );
    Dispatcher::new(&engine).search(models, sequences, concurrency)
}
