//! FASTA reader and writer.
//!
//! ## FASTA Format
//!
//! ```text
//! >sequence name, may contain spaces
//! ACGTACGTACGT...
//! >another_sequence
//! TGCATGCATGCA...
//! ```
//!
//! The whole header line is kept as the sequence name so that names survive
//! a round trip unchanged. Sequences may span several lines.

use std::io::{self, Write};

use thiserror::Error;

use crate::model::Sequence;

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Empty FASTA file")]
    EmptyFile,

    #[error("Invalid FASTA format: {0}")]
    InvalidFormat(String),

    #[error("Sequence without header at line {0}")]
    SequenceWithoutHeader(usize),
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// Accumulates records line by line.
#[derive(Default)]
struct RecordBuilder {
    sequences: Vec<Sequence>,
    current_name: Option<String>,
    current_seq: Vec<u8>,
    // Alignments have uniform length, so the previous row sizes the next
    prev_seq_len: usize,
}

impl RecordBuilder {
    fn line(&mut self, line_number: usize, line: &str) -> FastaResult<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        if let Some(header) = line.strip_prefix('>') {
            self.finish_record();
            let name = header.trim();
            if name.is_empty() {
                return Err(FastaError::InvalidFormat(format!(
                    "Empty sequence name at line {}",
                    line_number
                )));
            }
            self.current_name = Some(name.to_string());
            self.current_seq = Vec::with_capacity(self.prev_seq_len);
        } else {
            if self.current_name.is_none() {
                return Err(FastaError::SequenceWithoutHeader(line_number));
            }
            if line.bytes().all(|b| !b.is_ascii_whitespace()) {
                self.current_seq.extend_from_slice(line.as_bytes());
            } else {
                self.current_seq
                    .extend(line.bytes().filter(|b| !b.is_ascii_whitespace()));
            }
        }
        Ok(())
    }

    fn finish_record(&mut self) {
        if let Some(name) = self.current_name.take() {
            self.prev_seq_len = self.current_seq.len();
            let mut bases = std::mem::take(&mut self.current_seq);
            bases.shrink_to_fit();
            self.sequences.push(Sequence::from_bytes(name, bases));
        }
    }

    fn finish(mut self) -> FastaResult<Vec<Sequence>> {
        self.finish_record();
        if self.sequences.is_empty() {
            return Err(FastaError::EmptyFile);
        }
        self.sequences.shrink_to_fit();
        Ok(self.sequences)
    }
}

/// Parses FASTA records from a string.
pub fn parse_fasta_str(content: &str) -> FastaResult<Vec<Sequence>> {
    let mut builder = RecordBuilder::default();
    for (i, line) in content.lines().enumerate() {
        builder.line(i + 1, line)?;
    }
    builder.finish()
}

/// Writes `>name` and the residues on one line for every sequence.
pub fn write_fasta<'a, W, I>(out: &mut W, sequences: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Sequence>,
{
    for seq in sequences {
        writeln!(out, ">{}", seq.name)?;
        seq.write_bases(out)?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_fasta() {
        let content = ">seq1\nACGT\n>seq2\nTGCA\n";
        let sequences = parse_fasta_str(content).unwrap();

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].name, "seq1");
        assert_eq!(sequences[0].as_string(), "ACGT");
        assert_eq!(sequences[1].name, "seq2");
        assert_eq!(sequences[1].as_string(), "TGCA");
    }

    #[test]
    fn test_parse_multiline_sequence() {
        let content = ">seq1\nACGT\nTGCA\nAAAA\n";
        let sequences = parse_fasta_str(content).unwrap();

        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].as_string(), "ACGTTGCAAAAA");
    }

    #[test]
    fn test_header_is_kept_whole() {
        let content = ">seq1 Homo sapiens \nACGT\n";
        let sequences = parse_fasta_str(content).unwrap();
        assert_eq!(sequences[0].name, "seq1 Homo sapiens");
    }

    #[test]
    fn test_parse_with_empty_lines() {
        let content = ">seq1\nACGT\n\n>seq2\n\nTGCA\n";
        let sequences = parse_fasta_str(content).unwrap();

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].as_string(), "ACGT");
        assert_eq!(sequences[1].as_string(), "TGCA");
    }

    #[test]
    fn test_record_without_residues_is_kept() {
        let sequences = parse_fasta_str(">empty\n>full\nAC\n").unwrap();
        assert_eq!(sequences.len(), 2);
        assert!(sequences[0].is_empty());
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse_fasta_str(""), Err(FastaError::EmptyFile)));
        assert!(matches!(parse_fasta_str("\n\n"), Err(FastaError::EmptyFile)));
    }

    #[test]
    fn test_sequence_without_header() {
        let content = "ACGT\n>seq1\nTGCA\n";
        assert!(matches!(
            parse_fasta_str(content),
            Err(FastaError::SequenceWithoutHeader(1))
        ));
    }

    #[test]
    fn test_empty_name() {
        assert!(matches!(
            parse_fasta_str(">\nACGT\n"),
            Err(FastaError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_multiline_records() {
        let sequences = parse_fasta_str(">a\nAC\nGT\n>b\nTT\n").unwrap();
        assert_eq!(sequences[0].as_string(), "ACGT");
        assert_eq!(sequences[1].as_string(), "TT");
    }

    #[test]
    fn test_case_is_preserved() {
        let sequences = parse_fasta_str(">seq1\nacgt\n").unwrap();
        assert_eq!(sequences[0].as_string(), "acgt");
    }

    #[test]
    fn test_write_then_parse() {
        let sequences = vec![Sequence::new("one two", "AC-GT"), Sequence::new("three", "ACNGT")];
        let mut out = Vec::new();
        write_fasta(&mut out, &sequences).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, ">one two\nAC-GT\n>three\nACNGT\n");
        assert_eq!(parse_fasta_str(&text).unwrap(), sequences);
    }
}
