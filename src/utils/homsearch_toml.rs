//! Load `.homsearch.toml` (CLI only). Library callers pass options directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::scoring::Alphabet;
use crate::types::SchemeOverrides;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct HomsearchToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    jobs: Option<i64>,
    evalue: Option<f64>,
    alphabet: Option<Alphabet>,
    match_score: Option<i32>,
    mismatch_score: Option<i32>,
    gap_open: Option<i32>,
    gap_extend: Option<i32>,
    json: Option<bool>,
    tblout: Option<String>,
    verbose: Option<bool>,
}

/// Parse settings from a TOML string.
pub fn parse_homsearch_toml(s: &str) -> Result<HomsearchToml> {
    toml::from_str(s).context("parse settings")
}

/// Load settings. An explicit `path` must exist; otherwise `.homsearch.toml` in `dir` is used
/// when present and silently skipped when missing.
pub fn load_homsearch_toml(path: Option<&Path>, dir: &Path) -> Result<Option<HomsearchToml>> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (dir.join(PackagePaths::get().config_filename()), false),
    };
    if !required && !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    parse_homsearch_toml(&s)
        .with_context(|| format!("{}", path.display()))
        .map(Some)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($src:expr, $opts:expr, $src_field:ident => $opts_field:ident) => {
        if let Some(v) = $src.$src_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
/// Scoring fields are returned separately: they are resolved once the alphabet is final.
pub fn apply_file_to_opts(file: &HomsearchToml, opts: &mut Opts) -> SchemeOverrides {
    let s = &file.settings;
    apply_file_opt!(s, opts, jobs => jobs);
    apply_file_opt!(s, opts, evalue => evalue);
    apply_file_opt!(s, opts, alphabet => alphabet);
    apply_file_opt!(s, opts, json => json);
    apply_file_opt!(s, opts, verbose => verbose);
    if let Some(ref p) = s.tblout {
        opts.tblout = Some(PathBuf::from(p));
    }
    SchemeOverrides {
        match_score: s.match_score,
        mismatch_score: s.mismatch_score,
        gap_open: s.gap_open,
        gap_extend: s.gap_extend,
    }
}
