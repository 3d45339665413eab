//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

use crate::scoring::{KarlinParams, ScoringScheme};

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    worker_thread_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                worker_thread_prefix: format!("{pkg}-worker"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Settings file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Name of worker thread `i`.
    pub fn worker_thread_name(&self, i: usize) -> String {
        format!("{}-{i}", self.worker_thread_prefix)
    }
}

// ---- Worker threads ----

/// Worker pool sizing.
pub struct WorkerThreadLimits;

impl WorkerThreadLimits {
    /// Never run with fewer workers than this, whatever the environment reports.
    pub const FLOOR_THREADS: usize = 1;

    /// Logical CPUs available to this process. Queried on every call, never cached,
    /// so affinity or cgroup changes between searches are picked up.
    pub fn available() -> usize {
        num_cpus::get().max(Self::FLOOR_THREADS)
    }
}

// ---- Scoring ----

/// Default substitution and gap parameters per alphabet.
pub struct ScoringDefaults;

impl ScoringDefaults {
    pub const AMINO: ScoringScheme = ScoringScheme {
        match_score: 5,
        mismatch_score: -3,
        gap_open: 8,
        gap_extend: 2,
    };
    pub const DNA: ScoringScheme = ScoringScheme {
        match_score: 2,
        mismatch_score: -3,
        gap_open: 5,
        gap_extend: 2,
    };
    /// Score for any pairing involving an unknown residue (`X`, `N`, degenerate codes).
    pub const UNKNOWN_SCORE: i32 = -1;
    /// Largest accepted substitution score or gap penalty, in absolute value.
    pub const MAX_MAGNITUDE: i32 = 1 << 16;
}

/// Approximate extreme-value parameters for the default schemes.
pub struct KarlinDefaults;

impl KarlinDefaults {
    pub const AMINO: KarlinParams = KarlinParams {
        lambda: 0.22,
        k: 0.05,
    };
    pub const DNA: KarlinParams = KarlinParams {
        lambda: 0.625,
        k: 0.41,
    };
}

// ---- Reporting ----

pub struct ReportingDefaults;

impl ReportingDefaults {
    /// Report hits with an E-value at or below this (same default as `hmmsearch -E`).
    pub const EVALUE: f64 = 10.0;
}

// ---- Loading ----

pub struct LoaderConsts;

impl LoaderConsts {
    /// Sequence/model files above this size are memory-mapped instead of read (bytes). 64 MB.
    pub const MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;
}
