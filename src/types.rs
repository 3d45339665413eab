//! Options shared by the CLI, the settings file, and the library entry points.

use std::path::PathBuf;

use crate::scoring::{Alphabet, ScoringScheme};
use crate::utils::config::ReportingDefaults;

/// Full options for a CLI run. Filled from defaults, then `.homsearch.toml`, then flags.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Query model file (FASTA of consensus sequences, one model per record).
    pub hmmfile: PathBuf,
    /// Target sequence database (FASTA).
    pub seqdb: PathBuf,
    /// Worker count; `0` autodetects, negative is rejected by the dispatcher.
    pub jobs: i64,
    /// Report hits at or below this E-value.
    pub evalue: f64,
    pub alphabet: Alphabet,
    /// Scoring parameters. `None` uses the alphabet's defaults.
    pub scheme: Option<ScoringScheme>,
    /// Print hits as JSON instead of a table.
    pub json: bool,
    /// Also write the hit table to this file.
    pub tblout: Option<PathBuf>,
    /// Debug logging and a progress bar.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            hmmfile: PathBuf::new(),
            seqdb: PathBuf::new(),
            jobs: 0,
            evalue: ReportingDefaults::EVALUE,
            alphabet: Alphabet::default(),
            scheme: None,
            json: false,
            tblout: None,
            verbose: false,
        }
    }
}

impl Opts {
    /// Scoring scheme in effect: explicit one, or the alphabet default.
    pub fn scheme(&self) -> ScoringScheme {
        self.scheme
            .unwrap_or_else(|| ScoringScheme::for_alphabet(self.alphabet))
    }
}

/// Partial scoring parameters from the settings file or the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchemeOverrides {
    pub match_score: Option<i32>,
    pub mismatch_score: Option<i32>,
    pub gap_open: Option<i32>,
    pub gap_extend: Option<i32>,
}

impl SchemeOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn overlay(self, other: SchemeOverrides) -> SchemeOverrides {
        SchemeOverrides {
            match_score: other.match_score.or(self.match_score),
            mismatch_score: other.mismatch_score.or(self.mismatch_score),
            gap_open: other.gap_open.or(self.gap_open),
            gap_extend: other.gap_extend.or(self.gap_extend),
        }
    }

    /// Fill unset fields from `base`.
    pub fn resolve(&self, base: ScoringScheme) -> ScoringScheme {
        ScoringScheme {
            match_score: self.match_score.unwrap_or(base.match_score),
            mismatch_score: self.mismatch_score.unwrap_or(base.mismatch_score),
            gap_open: self.gap_open.unwrap_or(base.gap_open),
            gap_extend: self.gap_extend.unwrap_or(base.gap_extend),
        }
    }
}
