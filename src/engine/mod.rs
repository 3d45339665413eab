//! Application layer: CLI, input loading, progress, and reports around the dispatcher.

pub mod arg_parser;
pub mod handlers;
pub mod loaders;
pub mod progress;
pub mod report;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use handlers::{build_opts, handle_run, run_search};
pub use loaders::{
    FastaRecord, load_profiles, load_sequences, parse_fasta, profiles_from_records,
    sequences_from_records,
};
pub use report::{write_json, write_table, write_tblout};
