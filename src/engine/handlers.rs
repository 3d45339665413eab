//! CLI command handler: load settings, models and sequences, dispatch, report.

use anyhow::{Context, Result};
use kdam::Animation;
use log::{debug, info, warn};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::engine::loaders::{load_profiles, load_sequences};
use crate::engine::progress::{
    ProgressBarConfig, create_progress_bar, finish_progress_bar, progress_callback,
};
use crate::engine::report::{write_json, write_table, write_tblout};
use crate::error::{QueryFailure, SearchError};
use crate::hits::HitCollection;
use crate::pipeline::{CancelToken, Dispatcher, SearchOpts, concurrency_from_jobs};
use crate::scoring::ProfileEngine;
use crate::types::SchemeOverrides;
use crate::utils::{apply_file_to_opts, load_homsearch_toml, setup_logging};

/// Build opts from defaults, then the settings file, then CLI flags.
pub fn build_opts(cli: &Cli, settings_dir: &Path) -> Result<Opts> {
    let mut opts = Opts {
        hmmfile: cli.hmmfile.clone(),
        seqdb: cli.seqdb.clone(),
        ..Opts::default()
    };
    let file_scheme = match load_homsearch_toml(cli.config.as_deref(), settings_dir)? {
        Some(file) => apply_file_to_opts(&file, &mut opts),
        None => SchemeOverrides::default(),
    };

    if let Some(j) = cli.jobs {
        opts.jobs = j;
    }
    if let Some(e) = cli.evalue {
        opts.evalue = e;
    }
    if let Some(a) = cli.alphabet {
        opts.alphabet = a;
    }
    if let Some(j) = cli.json {
        opts.json = j;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if cli.tblout.is_some() {
        opts.tblout = cli.tblout.clone();
    }

    let scheme = file_scheme.overlay(SchemeOverrides {
        match_score: cli.match_score,
        mismatch_score: cli.mismatch_score,
        gap_open: cli.gap_open,
        gap_extend: cli.gap_extend,
    });
    if !scheme.is_empty() {
        opts.scheme = Some(scheme.resolve(opts.scheme()));
    }
    Ok(opts)
}

/// Run a search from the command line. Partial results are printed before a failure is returned.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let opts = build_opts(cli, &cwd)?;
    setup_logging(opts.verbose);
    debug!("{:#?}", opts);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("set Ctrl+C handler")?;

    run_search(&opts, Some(cancel))
}

/// Load inputs, dispatch the search, and write the report for `opts`.
pub fn run_search(opts: &Opts, cancel: Option<CancelToken>) -> Result<()> {
    let concurrency = concurrency_from_jobs(opts.jobs)?;
    let scheme = opts.scheme();

    let load_start = Instant::now();
    let sequences = load_sequences(&opts.seqdb, opts.alphabet)?;
    let models = load_profiles(&opts.hmmfile, opts.alphabet, &scheme)?;
    info!(
        "Loaded {} models and {} sequences in {:?}",
        models.len(),
        sequences.len(),
        load_start.elapsed()
    );

    let engine = ProfileEngine::new(opts.alphabet).with_evalue_threshold(opts.evalue);
    let bar = opts
        .verbose
        .then(|| create_progress_bar(ProgressBarConfig::new(models.len(), "Searching", Animation::Classic)));
    let search_opts = SearchOpts {
        concurrency,
        cancel,
        on_progress: progress_callback(&bar),
    };

    let result = Dispatcher::new(&engine).search_with(models, &sequences, &search_opts);
    if let Some(bar) = &bar {
        finish_progress_bar(bar);
        eprintln!();
    }

    match result {
        Ok(hits) => {
            write_report(opts, &hits, &[])?;
            info!("{} hits", hits.len());
            Ok(())
        }
        Err(err) => {
            if let Some(hits) = err.partial_hits() {
                warn!("Reporting partial results");
                write_report(opts, hits, err.failures())?;
            }
            if matches!(err, SearchError::QueueProtocol(_)) {
                log::error!("internal dispatcher failure; this is a bug");
            }
            Err(err.into())
        }
    }
}

fn write_report(opts: &Opts, hits: &HitCollection, failures: &[QueryFailure]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if opts.json {
        write_json(&mut out, hits, failures)?;
    } else {
        write_table(&mut out, hits)?;
    }
    out.flush()?;
    if let Some(path) = &opts.tblout {
        write_tblout(path, hits)?;
    }
    Ok(())
}
