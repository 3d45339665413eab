//! Residue alphabets and digitized sequences.

use anyhow::{Result, bail};
use serde::Deserialize;
use std::fmt;

/// Biological alphabet shared (read-only) by every worker of a search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    #[default]
    Amino,
    Dna,
}

impl Alphabet {
    const AMINO: &'static [u8] = b"ACDEFGHIKLMNPQRSTVWYX";
    const DNA: &'static [u8] = b"ACGTN";

    /// Canonical symbols followed by the single "unknown" symbol.
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            Alphabet::Amino => Self::AMINO,
            Alphabet::Dna => Self::DNA,
        }
    }

    /// Number of canonical residues (excludes the unknown symbol).
    pub fn k(&self) -> usize {
        self.symbols().len() - 1
    }

    /// Code of the unknown residue (`X` or `N`).
    pub fn unknown(&self) -> u8 {
        self.k() as u8
    }

    pub fn is_unknown(&self, code: u8) -> bool {
        code as usize >= self.k()
    }

    /// Map one text residue to its code. Degenerate IUPAC symbols map to the unknown code.
    pub fn encode(&self, residue: u8) -> Option<u8> {
        let r = residue.to_ascii_uppercase();
        if let Some(pos) = self.symbols().iter().position(|&s| s == r) {
            return Some(pos as u8);
        }
        let degenerate = match self {
            Alphabet::Amino => matches!(r, b'B' | b'Z' | b'J' | b'U' | b'O'),
            Alphabet::Dna => {
                if r == b'U' {
                    return Some(3);
                }
                matches!(
                    r,
                    b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B' | b'D' | b'H' | b'V'
                )
            }
        };
        degenerate.then(|| self.unknown())
    }

    pub fn decode(&self, code: u8) -> char {
        self.symbols()
            .get(code as usize)
            .copied()
            .unwrap_or(self.symbols()[self.k()]) as char
    }

    /// Digitize `text`, skipping whitespace. Fails on the first residue outside the alphabet.
    pub fn digitize(&self, text: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len());
        for (i, &c) in text.iter().enumerate() {
            if c.is_ascii_whitespace() {
                continue;
            }
            match self.encode(c) {
                Some(code) => out.push(code),
                None => bail!(
                    "invalid {} residue {:?} at position {}",
                    self,
                    c as char,
                    i + 1
                ),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alphabet::Amino => write!(f, "amino"),
            Alphabet::Dna => write!(f, "dna"),
        }
    }
}

/// A named sequence in digital form. Targets of a search are a `&[DigitalSequence]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigitalSequence {
    pub name: String,
    pub description: String,
    pub alphabet: Alphabet,
    pub residues: Vec<u8>,
}

impl DigitalSequence {
    pub fn new(name: impl Into<String>, alphabet: Alphabet, residues: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            alphabet,
            residues,
        }
    }

    /// Digitize a text sequence.
    pub fn from_text(name: impl Into<String>, alphabet: Alphabet, text: &str) -> Result<Self> {
        Ok(Self::new(name, alphabet, alphabet.digitize(text.as_bytes())?))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn to_text(&self) -> String {
        self.residues.iter().map(|&c| self.alphabet.decode(c)).collect()
    }
}
