//! Nucleotide to amino acid translation of alignment rows.
//!
//! A row is translated along the alignment's codon positions: only columns
//! that are coding and not excluded take part, starting at the first column
//! in codon position 1. Those columns are grouped into codons by their
//! positions; a codon missing a position translates to `X`.

use std::io::{self, Write};

use crate::genetic_code::{GeneticCode, UNKNOWN_AA};
use crate::meta::AlignmentMeta;
use crate::model::Sequence;

/// Translates rows against one alignment's metadata.
///
/// The translator borrows nothing from the rows; it only caches the codon
/// columns derived from the metadata, so one translator serves every row of
/// an alignment as long as the metadata does not change.
#[derive(Debug, Clone)]
pub struct Translator {
    code: GeneticCode,
    codons: Vec<Vec<usize>>,
}

impl Translator {
    pub fn new(meta: &AlignmentMeta, code: GeneticCode) -> Self {
        Self {
            code,
            codons: meta.translated_codons(),
        }
    }

    pub fn genetic_code(&self) -> GeneticCode {
        self.code
    }

    /// Number of amino acids every translated row has.
    pub fn translated_len(&self) -> usize {
        self.codons.len()
    }

    /// Translated residues of `seq`. Columns past the end of a short row
    /// read as gaps.
    pub fn translate(&self, seq: &Sequence) -> Vec<u8> {
        self.codons
            .iter()
            .map(|codon| match codon[..] {
                [x1, x2, x3] => self.code.translate_codon([
                    base_or_gap(seq, x1),
                    base_or_gap(seq, x2),
                    base_or_gap(seq, x3),
                ]),
                _ => UNKNOWN_AA,
            })
            .collect()
    }

    /// Translated copy of `seq` with the same name and no selection.
    pub fn translate_sequence(&self, seq: &Sequence) -> Sequence {
        Sequence::from_bytes(seq.name.clone(), self.translate(seq))
    }

    /// Streams the translation of `seq` into `out`.
    pub fn write_translation<W: Write>(&self, seq: &Sequence, out: &mut W) -> io::Result<()> {
        out.write_all(&self.translate(seq))
    }
}

fn base_or_gap(seq: &Sequence, x: usize) -> u8 {
    seq.base_at(x).unwrap_or(crate::nucleotide::GAP_SYMBOL)
}
