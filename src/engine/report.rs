//! Hit reports: aligned text table (like a `--tblout`) or JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::error::QueryFailure;
use crate::hits::{Hit, HitCollection, SearchStats};

/// Column headers of the hit table.
pub const TABLE_HEADER: [&str; 8] = [
    "target", "query", "evalue", "score", "domains", "qfrom", "qto", "tfrom-tto",
];

fn table_row(hit: &Hit) -> [String; 8] {
    let (qfrom, qto, trange) = match hit.best_domain() {
        Some(d) => (
            d.query_from.to_string(),
            d.query_to.to_string(),
            format!("{}-{}", d.target_from, d.target_to),
        ),
        None => ("-".into(), "-".into(), "-".into()),
    };
    [
        hit.target.clone(),
        hit.query.clone(),
        format!("{:.2e}", hit.evalue),
        format!("{:.1}", hit.score),
        hit.domains.len().to_string(),
        qfrom,
        qto,
        trange,
    ]
}

/// Write the ranked hit table. Lines starting with `#` are comments.
pub fn write_table<W: Write>(out: &mut W, hits: &HitCollection) -> Result<()> {
    let rows: Vec<[String; 8]> = hits.ranked().into_iter().map(table_row).collect();
    let mut widths = TABLE_HEADER.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }
    let header: Vec<String> = TABLE_HEADER
        .iter()
        .zip(widths)
        .map(|(h, w)| format!("{h:<w$}"))
        .collect();
    writeln!(out, "# {}", header.join(" "))?;
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (c, w))| if i < 2 { format!("{c:<w$}") } else { format!("{c:>w$}") })
            .collect();
        writeln!(out, "  {}", cells.join(" "))?;
    }
    let stats = hits.stats();
    writeln!(
        out,
        "# {} hits from {} queries ({} comparisons)",
        hits.len(),
        stats.queries_searched,
        stats.targets_searched
    )?;
    Ok(())
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    index: usize,
    query: &'a str,
    error: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    hits: Vec<&'a Hit>,
    stats: SearchStats,
    failures: Vec<JsonFailure<'a>>,
}

/// Write ranked hits, stats, and any failed queries as one JSON document.
pub fn write_json<W: Write>(out: &mut W, hits: &HitCollection, failures: &[QueryFailure]) -> Result<()> {
    let report = JsonReport {
        hits: hits.ranked(),
        stats: hits.stats(),
        failures: failures
            .iter()
            .map(|f| JsonFailure {
                index: f.index,
                query: &f.query,
                error: format!("{:#}", f.error),
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &report).context("serialize hits")?;
    writeln!(out)?;
    Ok(())
}

/// Write the hit table to `path`.
pub fn write_tblout(path: &Path, hits: &HitCollection) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);
    write_table(&mut out, hits)?;
    out.flush()
        .with_context(|| format!("write {}", path.display()))
}
