//! Reference engine: local profile-to-sequence alignment (Smith-Waterman, affine gaps) with
//! Karlin-Altschul style significance.
//!
//! The statistics are approximate: lambda and K are fixed per alphabet rather than fitted to
//! the scoring scheme in use.

use anyhow::{Result, bail};

use super::ScoringEngine;
use super::alphabet::{Alphabet, DigitalSequence};
use super::profile::Profile;
use crate::hits::{Domain, Hit, HitCollection};
use crate::utils::config::{KarlinDefaults, ReportingDefaults};

const NEG_INF: i32 = i32::MIN / 2;

/// Extreme-value parameters used to turn raw scores into bit scores and E-values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KarlinParams {
    pub lambda: f64,
    pub k: f64,
}

impl KarlinParams {
    pub fn for_alphabet(alphabet: Alphabet) -> Self {
        match alphabet {
            Alphabet::Amino => KarlinDefaults::AMINO,
            Alphabet::Dna => KarlinDefaults::DNA,
        }
    }

    pub fn bit_score(&self, raw: i32) -> f64 {
        (self.lambda * raw as f64 - self.k.ln()) / std::f64::consts::LN_2
    }

    /// Expected number of chance hits scoring at least `raw` in an `m` x `n` search space.
    pub fn evalue(&self, raw: i32, m: usize, n: usize) -> f64 {
        self.k * m as f64 * n as f64 * (-self.lambda * raw as f64).exp()
    }
}

/// Dynamic-programming rows reused across every target a worker scores.
#[derive(Debug, Default)]
pub struct AlignScratch {
    h: Vec<i32>,
    e: Vec<i32>,
    h_start: Vec<(usize, usize)>,
    e_start: Vec<(usize, usize)>,
}

impl AlignScratch {
    fn reset(&mut self, m: usize) {
        for v in [&mut self.h, &mut self.e] {
            v.clear();
            v.resize(m + 1, 0);
        }
        for v in [&mut self.h_start, &mut self.e_start] {
            v.clear();
            v.resize(m + 1, (0, 0));
        }
    }
}

/// Best local alignment of a profile against one target. Coordinates are 1-based inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalAlignment {
    pub score: i32,
    pub query_from: usize,
    pub query_to: usize,
    pub target_from: usize,
    pub target_to: usize,
}

/// Consensus-profile engine. Holds only read-only parameters; all mutable state is in
/// [`AlignScratch`].
#[derive(Clone, Debug)]
pub struct ProfileEngine {
    alphabet: Alphabet,
    karlin: KarlinParams,
    evalue_threshold: f64,
}

impl ProfileEngine {
    pub fn new(alphabet: Alphabet) -> Self {
        Self {
            alphabet,
            karlin: KarlinParams::for_alphabet(alphabet),
            evalue_threshold: ReportingDefaults::EVALUE,
        }
    }

    /// Only hits with an E-value at or below `evalue` are reported.
    pub fn with_evalue_threshold(mut self, evalue: f64) -> Self {
        self.evalue_threshold = evalue;
        self
    }

    /// Gotoh local alignment of `profile` against `target`, linear memory.
    /// Returns `None` when no positive-scoring alignment exists. Gap arithmetic saturates, so
    /// profiles built from an unvalidated scheme cannot overflow.
    pub fn align(
        &self,
        scratch: &mut AlignScratch,
        profile: &Profile,
        target: &DigitalSequence,
    ) -> Option<LocalAlignment> {
        let m = profile.len();
        scratch.reset(m);
        let open = profile.gap_open.saturating_add(profile.gap_extend);
        let extend = profile.gap_extend;
        let mut best: Option<LocalAlignment> = None;

        for (j0, &residue) in target.residues.iter().enumerate() {
            let j = j0 + 1;
            let mut diag: i32 = 0;
            let mut diag_start = (1, j);
            let mut f = NEG_INF;
            let mut f_start = (0, 0);
            for i in 1..=m {
                // E: gap along the target (horizontal), from the previous column.
                let e_open = scratch.h[i].saturating_sub(open);
                let e_ext = scratch.e[i].saturating_sub(extend);
                let (e, e_start) = if e_open >= e_ext {
                    (e_open, scratch.h_start[i])
                } else {
                    (e_ext, scratch.e_start[i])
                };
                // F: gap along the profile (vertical), within this column.
                let f_open = scratch.h[i - 1].saturating_sub(open);
                let f_ext = f.saturating_sub(extend);
                let (f_new, f_new_start) = if f_open >= f_ext {
                    (f_open, scratch.h_start[i - 1])
                } else {
                    (f_ext, f_start)
                };

                let matched = diag.saturating_add(profile.score(i - 1, residue));
                let matched_start = if diag > 0 { diag_start } else { (i, j) };

                let (mut h, mut h_start) = (0, (i + 1, j + 1));
                if matched > h {
                    (h, h_start) = (matched, matched_start);
                }
                if e > h {
                    (h, h_start) = (e, e_start);
                }
                if f_new > h {
                    (h, h_start) = (f_new, f_new_start);
                }

                diag = scratch.h[i];
                diag_start = scratch.h_start[i];
                scratch.h[i] = h;
                scratch.h_start[i] = h_start;
                scratch.e[i] = e;
                scratch.e_start[i] = e_start;
                f = f_new;
                f_start = f_new_start;

                if h > 0 && best.is_none_or(|b| h > b.score) {
                    best = Some(LocalAlignment {
                        score: h,
                        query_from: h_start.0,
                        query_to: i,
                        target_from: h_start.1,
                        target_to: j,
                    });
                }
            }
        }
        best
    }
}

impl ScoringEngine for ProfileEngine {
    type Query = Profile;
    type Target = DigitalSequence;
    type Scratch = AlignScratch;

    fn new_scratch(&self) -> AlignScratch {
        AlignScratch::default()
    }

    fn query_name(&self, query: &Profile) -> String {
        query.name.clone()
    }

    fn search(
        &self,
        scratch: &mut AlignScratch,
        query: &Profile,
        targets: &[DigitalSequence],
        hits: &mut HitCollection,
    ) -> Result<()> {
        if query.is_empty() {
            bail!("profile {} has no consensus positions", query.name);
        }
        if query.alphabet != self.alphabet {
            bail!(
                "profile {} uses the {} alphabet, engine is configured for {}",
                query.name,
                query.alphabet,
                self.alphabet
            );
        }
        let search_space: usize = targets.iter().map(DigitalSequence::len).sum();
        for target in targets {
            if target.alphabet != self.alphabet {
                bail!(
                    "target {} uses the {} alphabet, engine is configured for {}",
                    target.name,
                    target.alphabet,
                    self.alphabet
                );
            }
            let Some(aln) = self.align(scratch, query, target) else {
                continue;
            };
            let evalue = self.karlin.evalue(aln.score, query.len(), search_space);
            if evalue > self.evalue_threshold {
                continue;
            }
            let score = self.karlin.bit_score(aln.score) as f32;
            hits.insert(Hit {
                query: query.name.clone(),
                target: target.name.clone(),
                score,
                evalue,
                domains: vec![Domain {
                    query_from: aln.query_from,
                    query_to: aln.query_to,
                    target_from: aln.target_from,
                    target_to: aln.target_to,
                    score,
                    evalue,
                }],
            });
        }
        Ok(())
    }
}
