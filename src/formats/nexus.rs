//! NEXUS reader and writer for the DATA / CHARACTERS block.
//!
//! ## NEXUS Format
//!
//! NEXUS files start with `#NEXUS` and contain blocks:
//! ```text
//! #NEXUS
//! BEGIN DATA;
//!   DIMENSIONS NTAX=3 NCHAR=10;
//!   FORMAT DATATYPE=DNA GAP=- MISSING=?;
//!   MATRIX
//!     seq1 ACGTACGTAC
//!     seq2 TGCATGCATG
//!     seq3 AAAACCCCGG
//!   ;
//! END;
//! ```
//!
//! Metadata blocks (ASSUMPTIONS, SETS, CODONS) are handled by
//! [`super::meta_blocks`].
//!
//! ## Relaxed Parsing
//!
//! - Case insensitive commands
//! - Flexible whitespace
//! - Quoted and unquoted taxon names
//! - Sequential and interleaved matrices, MATCHCHAR substitution

use std::collections::HashMap;
use std::io::{self, Write};
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use super::meta_blocks::quote_name;
use crate::model::{Sequence, SequenceType};

/// Errors that can occur during NEXUS parsing.
#[derive(Error, Debug)]
pub enum NexusError {
    #[error("Not a NEXUS file (must start with #NEXUS)")]
    NotNexus,

    #[error("Empty NEXUS file")]
    EmptyFile,

    #[error("No DATA or CHARACTERS block found")]
    NoDataBlock,
}

/// Result type for NEXUS operations.
pub type NexusResult<T> = Result<T, NexusError>;

/// `DATATYPE` written in the FORMAT command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Dna,
    Protein,
}

impl DataType {
    pub fn keyword(self) -> &'static str {
        match self {
            DataType::Dna => "DNA",
            DataType::Protein => "PROTEIN",
        }
    }
}

impl From<SequenceType> for DataType {
    fn from(sequence_type: SequenceType) -> Self {
        match sequence_type {
            SequenceType::Nucleotide => DataType::Dna,
            SequenceType::AminoAcid => DataType::Protein,
        }
    }
}

/// A lexical unit of a NEXUS file. Comments are dropped by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(Word),
    Semicolon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    text: String,
    quoted: bool,
}

impl Word {
    fn is_keyword(&self, keyword: &str) -> bool {
        !self.quoted && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Splits NEXUS text into words and `;`. Bracketed comments (nested ones
/// too) are skipped outside quotes; `''` inside single quotes is a quote.
struct Tokens<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            chars: content.chars().peekable(),
        }
    }

    fn skip_comment(&mut self) {
        let mut depth = 0usize;
        for c in self.chars.by_ref() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn quoted(&mut self, quote: char) -> Word {
        let mut text = String::new();
        while let Some(c) = self.chars.next() {
            if c != quote {
                text.push(c);
            } else if quote == '\'' && self.chars.peek() == Some(&'\'') {
                self.chars.next();
                text.push('\'');
            } else {
                break;
            }
        }
        Word { text, quoted: true }
    }

    fn word(&mut self) -> Word {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || c == ';' || c == '[' {
                break;
            }
            text.push(c);
            self.chars.next();
        }
        Word { text, quoted: false }
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let c = *self.chars.peek()?;
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '[' => self.skip_comment(),
                ';' => {
                    self.chars.next();
                    return Some(Token::Semicolon);
                }
                '\'' | '"' => {
                    self.chars.next();
                    return Some(Token::Word(self.quoted(c)));
                }
                _ => return Some(Token::Word(self.word())),
            }
        }
    }
}

/// Groups tokens into commands, each the words up to a `;`.
fn commands(tokens: Tokens<'_>) -> impl Iterator<Item = Vec<Word>> + '_ {
    let mut tokens = tokens.peekable();
    std::iter::from_fn(move || {
        tokens.peek()?;
        let mut words = Vec::new();
        for token in tokens.by_ref() {
            match token {
                Token::Word(word) => words.push(word),
                Token::Semicolon => break,
            }
        }
        Some(words)
    })
}

/// Shape of the matrix, from DIMENSIONS and FORMAT.
#[derive(Debug, Default)]
struct Layout {
    ntax: usize,
    nchar: usize,
    interleave: bool,
    matchchar: Option<u8>,
}

impl Layout {
    fn read(&mut self, args: &[Word]) {
        for (key, value) in settings(args) {
            match (key.as_str(), value) {
                ("NTAX", Some(v)) => self.ntax = v.parse().unwrap_or(0),
                ("NCHAR", Some(v)) => self.nchar = v.parse().unwrap_or(0),
                ("INTERLEAVE", v) => self.interleave = !v.is_some_and(|v| v.eq_ignore_ascii_case("NO")),
                ("MATCHCHAR", Some(v)) => self.matchchar = v.bytes().next(),
                _ => {}
            }
        }
    }
}

/// `KEY=VALUE` pairs and bare flags of a command; keys are uppercased.
/// Whitespace around `=` is allowed.
fn settings(args: &[Word]) -> Vec<(String, Option<String>)> {
    let joined = args.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
    let spaced = joined.replace('=', " = ");
    let mut parts = spaced.split_whitespace().peekable();
    let mut pairs = Vec::new();
    while let Some(key) = parts.next() {
        let value = if parts.peek() == Some(&"=") {
            parts.next();
            parts.next().map(str::to_string)
        } else {
            None
        };
        pairs.push((key.to_ascii_uppercase(), value));
    }
    pairs
}

struct Row {
    name: String,
    bases: Vec<u8>,
}

/// Parses the sequences of a NEXUS file: the MATRIX of its first DATA or
/// CHARACTERS block.
pub fn parse_nexus_str(content: &str) -> NexusResult<Vec<Sequence>> {
    let mut tokens = Tokens::new(content);
    match tokens.next() {
        None => return Err(NexusError::EmptyFile),
        Some(Token::Word(word)) if word.text.eq_ignore_ascii_case("#NEXUS") => {}
        Some(_) => return Err(NexusError::NotNexus),
    }

    let mut layout = Layout::default();
    let mut matrix: Option<Vec<Word>> = None;
    let mut in_data = false;

    for command in commands(tokens) {
        let Some((head, args)) = command.split_first() else {
            continue;
        };
        if head.is_keyword("BEGIN") {
            in_data = args
                .first()
                .is_some_and(|w| w.is_keyword("DATA") || w.is_keyword("CHARACTERS"));
        } else if head.is_keyword("END") || head.is_keyword("ENDBLOCK") {
            if in_data && matrix.is_some() {
                break;
            }
            in_data = false;
        } else if in_data && (head.is_keyword("DIMENSIONS") || head.is_keyword("FORMAT")) {
            layout.read(args);
        } else if in_data && head.is_keyword("MATRIX") {
            matrix = Some(args.to_vec());
        }
    }

    let words = matrix.ok_or(NexusError::NoDataBlock)?;
    let mut rows = if layout.interleave && layout.ntax > 0 {
        read_interleaved(&words, &layout)
    } else {
        read_sequential(&words, &layout)
    };
    if rows.is_empty() {
        return Err(NexusError::NoDataBlock);
    }
    if let Some(matchchar) = layout.matchchar {
        apply_matchchar(&mut rows, matchchar);
    }

    Ok(rows
        .into_iter()
        .map(|row| Sequence::from_bytes(row.name, row.bases))
        .collect())
}

/// Each name is followed by all of its data. NCHAR ends a row; without it,
/// a name-like word starts the next one.
fn read_sequential(words: &[Word], layout: &Layout) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut words = words.iter().peekable();

    while layout.ntax == 0 || rows.len() < layout.ntax {
        let Some(name) = words.next() else {
            break;
        };
        let mut bases = Vec::with_capacity(layout.nchar);
        while let Some(word) = words.peek() {
            let complete = if layout.nchar > 0 {
                bases.len() >= layout.nchar
            } else {
                !bases.is_empty() && looks_like_name(word)
            };
            if complete {
                break;
            }
            bases.extend_from_slice(word.text.as_bytes());
            words.next();
        }
        rows.push(Row {
            name: name.text.clone(),
            bases,
        });
    }
    rows
}

/// Blocks of `name data` lines. The first block introduces the names;
/// later blocks repeat them and extend the rows.
fn read_interleaved(words: &[Word], layout: &Layout) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::with_capacity(layout.ntax);
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut current: Option<usize> = None;
    // The current row got no data since its name was read
    let mut fresh = false;

    for word in words {
        let complete = layout.nchar > 0
            && rows.len() == layout.ntax
            && rows.iter().all(|row| row.bases.len() >= layout.nchar);
        if complete {
            break;
        }

        if let Some(&i) = index.get(word.text.as_str()) {
            current = Some(i);
            fresh = true;
            continue;
        }
        match current {
            Some(i) if fresh || rows.len() == layout.ntax => {
                rows[i].bases.extend_from_slice(word.text.as_bytes());
                fresh = false;
            }
            _ => {
                index.insert(word.text.as_str(), rows.len());
                current = Some(rows.len());
                fresh = true;
                rows.push(Row {
                    name: word.text.clone(),
                    bases: Vec::with_capacity(layout.nchar),
                });
            }
        }
    }
    rows
}

/// Replaces MATCHCHAR with the symbol of the first row in the same column.
fn apply_matchchar(rows: &mut [Row], matchchar: u8) {
    let Some((first, rest)) = rows.split_first_mut() else {
        return;
    };
    for row in rest {
        for (byte, reference) in row.bases.iter_mut().zip(&first.bases) {
            if *byte == matchchar {
                *byte = *reference;
            }
        }
    }
}

/// Only used when NCHAR is not available.
fn looks_like_name(word: &Word) -> bool {
    // Letters mixed with digits ("seq1", "AelongD09") or an underscore
    let has_letters = word.text.chars().any(|c| c.is_ascii_alphabetic());
    let has_digits = word.text.chars().any(|c| c.is_ascii_digit());
    word.quoted || (has_letters && has_digits) || word.text.contains('_')
}

/// Writes `#NEXUS` and a DATA block. Rows are padded to the longest row.
pub fn write_nexus<W: Write>(out: &mut W, sequences: &[Sequence], datatype: DataType) -> io::Result<()> {
    let width = sequences.iter().map(Sequence::len).max().unwrap_or(0);
    let names: Vec<String> = sequences.iter().map(|s| quote_name(&s.name)).collect();
    let name_width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0) + 1;

    writeln!(out, "#NEXUS")?;
    writeln!(out)?;
    writeln!(out, "BEGIN DATA;")?;
    writeln!(out, "DIMENSIONS NTAX={} NCHAR={};", sequences.len(), width)?;
    writeln!(out, "FORMAT DATATYPE={} GAP=- MISSING=?;", datatype.keyword())?;
    writeln!(out, "MATRIX")?;
    for (seq, name) in sequences.iter().zip(&names) {
        write!(out, "{:<width$}", name, width = name_width)?;
        seq.write_bases(out)?;
        for _ in seq.len()..width {
            out.write_all(b"-")?;
        }
        writeln!(out)?;
    }
    writeln!(out, ";")?;
    writeln!(out, "END;")?;
    writeln!(out)
}
