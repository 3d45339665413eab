//! Scoring engine seam plus the bundled reference engine.
//!
//! The dispatcher only knows about [`ScoringEngine`]. [`ProfileEngine`] is a small
//! consensus-profile aligner so the crate works end to end; any engine that satisfies the
//! trait contract can be plugged in instead.

pub mod alphabet;
pub mod profile;
pub mod reference;

pub use alphabet::{Alphabet, DigitalSequence};
pub use profile::{Profile, ScoringScheme};
pub use reference::{KarlinParams, ProfileEngine};

use anyhow::Result;

use crate::hits::HitCollection;

/// Contract between the dispatcher and a scoring engine.
///
/// The engine itself is shared by reference across all workers, so it must be `Sync` and
/// hold only read-only state (alphabet, parameters). Anything mutable during a search lives in
/// [`Self::Scratch`], of which each worker owns exactly one.
pub trait ScoringEngine: Sync {
    /// A query model. Moved into the queue and read by exactly one worker.
    type Query: Send;
    /// One entry of the shared target corpus.
    type Target: Sync;
    /// Per-worker mutable state (alignment buffers and the like).
    type Scratch: Send;

    /// Build fresh scratch state for one worker.
    fn new_scratch(&self) -> Self::Scratch;

    /// Identity used when reporting failures for `query`.
    fn query_name(&self, query: &Self::Query) -> String;

    /// Search `query` against every target, inserting hits into `hits`.
    ///
    /// Only hits are inserted; the dispatcher keeps the search statistics. On error it
    /// discards whatever was written to `hits`.
    fn search(
        &self,
        scratch: &mut Self::Scratch,
        query: &Self::Query,
        targets: &[Self::Target],
        hits: &mut HitCollection,
    ) -> Result<()>;
}
