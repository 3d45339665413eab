//! FASTA loaders for the query models and the target corpus.
//!
//! Both files are read completely before dispatch. Digitization runs in parallel.

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::scoring::{Alphabet, DigitalSequence, Profile, ScoringScheme};
use crate::utils::config::LoaderConsts;

/// One raw FASTA record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastaRecord {
    pub name: String,
    pub description: String,
    pub sequence: Vec<u8>,
}

/// Parse FASTA text. Blank lines are ignored; anything before the first header is an error.
pub fn parse_fasta(data: &[u8]) -> Result<Vec<FastaRecord>> {
    let mut records: Vec<FastaRecord> = Vec::new();
    for (lineno, raw) in data.split(|&b| b == b'\n').enumerate() {
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if let Some(header) = line.strip_prefix(b">") {
            let header = String::from_utf8_lossy(header);
            let header = header.trim();
            let (name, description) = header
                .split_once(char::is_whitespace)
                .map(|(n, d)| (n, d.trim()))
                .unwrap_or((header, ""));
            if name.is_empty() {
                bail!("line {}: FASTA header without a name", lineno + 1);
            }
            records.push(FastaRecord {
                name: name.to_string(),
                description: description.to_string(),
                sequence: Vec::new(),
            });
        } else {
            match records.last_mut() {
                Some(rec) => rec.sequence.extend_from_slice(line),
                None => bail!("line {}: sequence data before the first '>' header", lineno + 1),
            }
        }
    }
    Ok(records)
}

/// Read a whole file, memory-mapping it above [`LoaderConsts::MMAP_THRESHOLD`].
fn read_records(path: &Path) -> Result<Vec<FastaRecord>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = file
        .metadata()
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    let records = if size > LoaderConsts::MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.display()))?;
        parse_fasta(&mmap)
    } else {
        let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        parse_fasta(&data)
    };
    records.with_context(|| format!("parse {}", path.display()))
}

fn check_unique_names<'a>(names: impl Iterator<Item = &'a str>, what: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            bail!("duplicate {} name {:?}", what, name);
        }
    }
    Ok(())
}

/// Digitize FASTA records into a target corpus. Names must be unique: hits are keyed by them.
pub fn sequences_from_records(
    records: Vec<FastaRecord>,
    alphabet: Alphabet,
) -> Result<Vec<DigitalSequence>> {
    check_unique_names(records.iter().map(|r| r.name.as_str()), "sequence")?;
    records
        .into_par_iter()
        .map(|r| -> Result<DigitalSequence> {
            let residues = alphabet
                .digitize(&r.sequence)
                .with_context(|| format!("sequence {}", r.name))?;
            Ok(DigitalSequence::new(r.name, alphabet, residues).with_description(r.description))
        })
        .collect()
}

/// Build one profile per FASTA record, treating each sequence as a model consensus.
pub fn profiles_from_records(
    records: Vec<FastaRecord>,
    alphabet: Alphabet,
    scheme: &ScoringScheme,
) -> Result<Vec<Profile>> {
    check_unique_names(records.iter().map(|r| r.name.as_str()), "model")?;
    records
        .into_par_iter()
        .map(|r| -> Result<Profile> {
            let consensus = alphabet
                .digitize(&r.sequence)
                .with_context(|| format!("model {}", r.name))?;
            Ok(Profile::from_digital(r.name, alphabet, consensus, scheme)
                .with_description(r.description))
        })
        .collect()
}

/// Load and digitize the target database at `path`.
pub fn load_sequences(path: &Path, alphabet: Alphabet) -> Result<Vec<DigitalSequence>> {
    let records = read_records(path)?;
    sequences_from_records(records, alphabet).with_context(|| format!("load {}", path.display()))
}

/// Load query models from `path`.
pub fn load_profiles(path: &Path, alphabet: Alphabet, scheme: &ScoringScheme) -> Result<Vec<Profile>> {
    scheme.validate()?;
    let records = read_records(path)?;
    profiles_from_records(records, alphabet, scheme)
        .with_context(|| format!("load {}", path.display()))
}
