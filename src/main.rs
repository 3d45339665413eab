//! Homsearch CLI: search query models against a sequence database.

use anyhow::Result;
use clap::Parser;
use homsearch::engine::arg_parser::Cli;
use homsearch::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
