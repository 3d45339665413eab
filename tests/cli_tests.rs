use clap::Parser;
use homsearch::engine::report::TABLE_HEADER;
use homsearch::engine::{
    Cli, build_opts, load_profiles, load_sequences, parse_fasta, run_search, write_json,
    write_table,
};
use homsearch::scoring::ScoringScheme;
use homsearch::utils::{load_homsearch_toml, parse_homsearch_toml};
use homsearch::{Alphabet, Domain, Hit, HitCollection, Opts, QueryFailure};
use std::fs;
use std::path::Path;

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn sample_hits() -> HitCollection {
    let mut c = HitCollection::new();
    c.insert(Hit {
        query: "motif".into(),
        target: "planted".into(),
        score: 31.4,
        evalue: 2.5e-7,
        domains: vec![Domain {
            query_from: 1,
            query_to: 19,
            target_from: 11,
            target_to: 29,
            score: 31.4,
            evalue: 2.5e-7,
        }],
    });
    c.record_query(3);
    c
}

// --- parse_fasta ---

#[test]
fn test_parse_fasta_multiline_records() {
    let recs = parse_fasta(b">a first one\nACGT\nAC\n\n>b\r\nGG\r\n").unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].name, "a");
    assert_eq!(recs[0].description, "first one");
    assert_eq!(recs[0].sequence, b"ACGTAC");
    assert_eq!(recs[1].name, "b");
    assert_eq!(recs[1].sequence, b"GG");
}

#[test]
fn test_parse_fasta_empty_input() {
    assert!(parse_fasta(b"").unwrap().is_empty());
    assert!(parse_fasta(b"\n\n").unwrap().is_empty());
}

#[test]
fn test_parse_fasta_data_before_header() {
    let err = parse_fasta(b"ACGT\n>a\nAC\n").unwrap_err();
    assert!(err.to_string().contains("line 1"));
}

#[test]
fn test_parse_fasta_header_without_name() {
    assert!(parse_fasta(b">\nACGT\n").is_err());
}

// --- loaders ---

#[test]
fn test_load_sequences_digitizes_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "db.fa", ">s1 desc\nACGT\n>s2\nacgu\n");
    let seqs = load_sequences(&path, Alphabet::Dna).unwrap();
    assert_eq!(seqs.len(), 2);
    assert_eq!(seqs[0].description, "desc");
    assert_eq!(seqs[1].to_text(), "ACGT");
}

#[test]
fn test_load_sequences_rejects_duplicate_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "db.fa", ">s\nACGT\n>s\nGG\n");
    let err = load_sequences(&path, Alphabet::Dna).unwrap_err();
    assert!(format!("{err:#}").contains("duplicate sequence name"));
}

#[test]
fn test_load_sequences_reports_invalid_residue() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "db.fa", ">s\nAC*T\n");
    let err = load_sequences(&path, Alphabet::Dna).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("sequence s"));
    assert!(msg.contains("invalid dna residue"));
}

#[test]
fn test_load_sequences_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_sequences(&dir.path().join("nope.fa"), Alphabet::Dna).is_err());
}

#[test]
fn test_load_profiles_builds_one_model_per_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "models.fa", ">m1\nWHEAT\n>m2 second\nCYKL\n");
    let scheme = ScoringScheme::for_alphabet(Alphabet::Amino);
    let models = load_profiles(&path, Alphabet::Amino, &scheme).unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].consensus(), "WHEAT");
    assert_eq!(models[1].description, "second");
}

#[test]
fn test_load_profiles_rejects_invalid_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "models.fa", ">m1\nWHEAT\n");
    let mut scheme = ScoringScheme::for_alphabet(Alphabet::Amino);
    scheme.match_score = 0;
    assert!(load_profiles(&path, Alphabet::Amino, &scheme).is_err());
}

// --- settings file ---

#[test]
fn test_parse_settings_rejects_unknown_key() {
    assert!(parse_homsearch_toml("[settings]\nthreads = 4\n").is_err());
    assert!(parse_homsearch_toml("[settings]\njobs = 4\n").is_ok());
    assert!(parse_homsearch_toml("").is_ok());
}

#[test]
fn test_missing_default_settings_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_homsearch_toml(None, dir.path()).unwrap().is_none());
}

#[test]
fn test_missing_explicit_settings_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("custom.toml");
    assert!(load_homsearch_toml(Some(missing.as_path()), dir.path()).is_err());
}

// --- build_opts layering ---

#[test]
fn test_build_opts_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli::parse_from(["homsearch", "q.fa", "db.fa"]);
    let opts = build_opts(&cli, dir.path()).unwrap();
    let defaults = Opts::default();
    assert_eq!(opts.jobs, 0);
    assert_eq!(opts.evalue, defaults.evalue);
    assert_eq!(opts.alphabet, Alphabet::Amino);
    assert!(opts.scheme.is_none());
    assert!(!opts.json);
}

#[test]
fn test_build_opts_file_then_cli() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        ".homsearch.toml",
        "[settings]\njobs = 3\nevalue = 0.5\nalphabet = \"dna\"\nmatch_score = 3\ngap_open = 6\njson = true\n",
    );
    let cli = Cli::parse_from(["homsearch", "q.fa", "db.fa", "-j", "7", "--match-score", "4"]);
    let opts = build_opts(&cli, dir.path()).unwrap();
    assert_eq!(opts.jobs, 7);
    assert_eq!(opts.evalue, 0.5);
    assert_eq!(opts.alphabet, Alphabet::Dna);
    assert!(opts.json);
    let dna = ScoringScheme::for_alphabet(Alphabet::Dna);
    assert_eq!(
        opts.scheme(),
        ScoringScheme {
            match_score: 4,
            gap_open: 6,
            ..dna
        }
    );
}

#[test]
fn test_build_opts_explicit_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_file(dir.path(), "custom.toml", "[settings]\nevalue = 1e-3\n");
    let cfg = cfg.to_str().unwrap();
    let cli = Cli::parse_from(["homsearch", "q.fa", "db.fa", "--config", cfg, "-E", "0.01"]);
    let opts = build_opts(&cli, dir.path()).unwrap();
    assert_eq!(opts.evalue, 0.01);
}

#[test]
fn test_cli_accepts_negative_jobs() {
    let cli = Cli::parse_from(["homsearch", "q.fa", "db.fa", "-j", "-2"]);
    assert_eq!(cli.jobs, Some(-2));
}

// --- reports ---

#[test]
fn test_write_table_layout() {
    let mut out = Vec::new();
    write_table(&mut out, &sample_hits()).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(&format!("# {}", TABLE_HEADER[0])));
    assert!(lines[1].contains("planted"));
    assert!(lines[1].contains("11-29"));
    assert_eq!(lines[2], "# 1 hits from 1 queries (3 comparisons)");
}

#[test]
fn test_write_json_includes_failures() {
    let failures = vec![QueryFailure {
        index: 2,
        query: "broken".into(),
        error: anyhow::anyhow!("no consensus positions"),
    }];
    let mut out = Vec::new();
    write_json(&mut out, &sample_hits(), &failures).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["hits"][0]["target"], "planted");
    assert_eq!(v["hits"][0]["domains"][0]["target_from"], 11);
    assert_eq!(v["stats"]["targets_searched"], 3);
    assert_eq!(v["failures"][0]["query"], "broken");
}

// --- run_search end to end ---

#[test]
fn test_run_search_writes_tblout() {
    let dir = tempfile::tempdir().unwrap();
    let hmm = write_file(dir.path(), "q.fa", ">motif\nWHEATCYKLMNPQRSTVWY\n");
    let db = write_file(
        dir.path(),
        "db.fa",
        ">planted\nGGGGGGGGGGWHEATCYKLMNPQRSTVWYGGGGGGGG\n>decoy\nGGGGGGGGGGGGGGGGGGGG\n",
    );
    let tbl = dir.path().join("hits.tbl");
    let opts = Opts {
        hmmfile: hmm,
        seqdb: db,
        jobs: 2,
        evalue: 1.0,
        tblout: Some(tbl.clone()),
        ..Opts::default()
    };
    run_search(&opts, None).unwrap();
    let text = fs::read_to_string(&tbl).unwrap();
    assert!(text.contains("planted"));
    assert!(!text.contains("decoy"));
}

#[test]
fn test_run_search_rejects_negative_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let opts = Opts {
        hmmfile: dir.path().join("q.fa"),
        seqdb: dir.path().join("db.fa"),
        jobs: -1,
        ..Opts::default()
    };
    let err = run_search(&opts, None).unwrap_err();
    assert!(err.to_string().contains("invalid concurrency"));
}
