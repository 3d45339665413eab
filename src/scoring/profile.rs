//! Query profiles: position-specific score rows built from a consensus sequence.

use anyhow::{Result, bail};

use super::alphabet::Alphabet;
use crate::utils::config::ScoringDefaults;

/// Integer substitution and gap parameters used to build a [`Profile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoringScheme {
    pub match_score: i32,
    pub mismatch_score: i32,
    /// Penalty for opening a gap (charged once, on top of the first extension).
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl ScoringScheme {
    pub fn for_alphabet(alphabet: Alphabet) -> Self {
        match alphabet {
            Alphabet::Amino => ScoringDefaults::AMINO,
            Alphabet::Dna => ScoringDefaults::DNA,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let max = ScoringDefaults::MAX_MAGNITUDE;
        if self.match_score > max || self.mismatch_score < -max {
            bail!(
                "substitution scores must lie within +/-{} (got {}/{})",
                max,
                self.match_score,
                self.mismatch_score
            );
        }
        if self
            .gap_open
            .checked_add(self.gap_extend)
            .is_none_or(|gap| gap > max)
        {
            bail!(
                "gap open + extend must not exceed {} (got {}/{})",
                max,
                self.gap_open,
                self.gap_extend
            );
        }
        if self.match_score <= 0 {
            bail!("match score must be positive (got {})", self.match_score);
        }
        if self.mismatch_score >= 0 {
            bail!("mismatch score must be negative (got {})", self.mismatch_score);
        }
        if self.gap_open < 0 || self.gap_extend <= 0 {
            bail!(
                "gap penalties must be non-negative open and positive extend (got {}/{})",
                self.gap_open,
                self.gap_extend
            );
        }
        Ok(())
    }
}

/// A query model: one score row per consensus position, indexed by residue code.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub name: String,
    pub description: String,
    pub alphabet: Alphabet,
    consensus: Vec<u8>,
    /// `rows[i][code]` is the score of aligning target residue `code` to position `i`.
    rows: Vec<Vec<i32>>,
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Profile {
    /// Build a profile from a consensus sequence in text form.
    pub fn from_consensus(
        name: impl Into<String>,
        alphabet: Alphabet,
        consensus: &str,
        scheme: &ScoringScheme,
    ) -> Result<Self> {
        let digital = alphabet.digitize(consensus.as_bytes())?;
        Ok(Self::from_digital(name, alphabet, digital, scheme))
    }

    /// Build a profile from an already digitized consensus. An empty consensus yields an empty
    /// profile, which the engine rejects at search time.
    pub fn from_digital(
        name: impl Into<String>,
        alphabet: Alphabet,
        consensus: Vec<u8>,
        scheme: &ScoringScheme,
    ) -> Self {
        let width = alphabet.k() + 1;
        let rows = consensus
            .iter()
            .map(|&c| {
                (0..width as u8)
                    .map(|r| {
                        if alphabet.is_unknown(c) || alphabet.is_unknown(r) {
                            ScoringDefaults::UNKNOWN_SCORE
                        } else if r == c {
                            scheme.match_score
                        } else {
                            scheme.mismatch_score
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            name: name.into(),
            description: String::new(),
            alphabet,
            consensus,
            rows,
            gap_open: scheme.gap_open,
            gap_extend: scheme.gap_extend,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Number of consensus positions.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn score(&self, position: usize, residue: u8) -> i32 {
        self.rows[position][residue as usize]
    }

    pub fn consensus(&self) -> String {
        self.consensus
            .iter()
            .map(|&c| self.alphabet.decode(c))
            .collect()
    }
}
