use clap::Parser;
use std::path::PathBuf;

use crate::scoring::Alphabet;

/// Concurrent homology search: match query models against a sequence database.
#[derive(Clone, Debug, Parser)]
#[command(name = "homsearch")]
#[command(about = "Search query models against a sequence database using a pool of workers.")]
pub struct Cli {
    /// Query model file (FASTA; each record is one model consensus).
    #[arg(value_name = "HMMFILE")]
    pub hmmfile: PathBuf,

    /// Target sequence database (FASTA).
    #[arg(value_name = "SEQDB")]
    pub seqdb: PathBuf,

    /// Number of worker threads. 0 or unset: one per logical CPU.
    #[arg(long, short = 'j', allow_negative_numbers = true, value_parser = clap::value_parser!(i64))]
    pub jobs: Option<i64>,

    /// Report hits with an E-value at or below this.
    #[arg(long = "evalue", short = 'E', value_parser = clap::value_parser!(f64))]
    pub evalue: Option<f64>,

    /// Residue alphabet of models and sequences.
    #[arg(long, value_enum)]
    pub alphabet: Option<Alphabet>,

    /// Score for a consensus match.
    #[arg(long, allow_negative_numbers = true)]
    pub match_score: Option<i32>,

    /// Score for a consensus mismatch (negative).
    #[arg(long, allow_negative_numbers = true)]
    pub mismatch_score: Option<i32>,

    /// Gap open penalty.
    #[arg(long)]
    pub gap_open: Option<i32>,

    /// Gap extend penalty.
    #[arg(long)]
    pub gap_extend: Option<i32>,

    /// Also write the hit table to this file.
    #[arg(long, value_name = "PATH")]
    pub tblout: Option<PathBuf>,

    /// Print hits as JSON instead of a table.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Settings file. Default: `.homsearch.toml` in the working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logs and a progress bar).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
