//! Per-column alignment metadata.
//!
//! [`AlignmentMeta`] keeps three column-parallel structures:
//! - excluded columns
//! - codon positions (with the reading frame)
//! - named character sets
//!
//! Their length always equals the alignment width. Any structural column
//! edit applied to the sequences must be applied here with the same
//! arguments, which is what [`AlignmentMeta::remove_from_mask`],
//! [`AlignmentMeta::reverse`], [`AlignmentMeta::insert_columns`] and
//! [`AlignmentMeta::resize`] are for.

pub mod charset;
pub mod codon_positions;
pub mod columns;
pub mod range;

use thiserror::Error;

pub use charset::CharSet;
pub use codon_positions::{CodonPositions, NON_CODING};
pub use columns::ColumnMask;
pub use range::ColumnRange;

/// Excluded columns.
pub type Excludes = ColumnMask;

/// Errors raised while building or re-indexing metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("Invalid range list: '{0}'")]
    InvalidRange(String),

    #[error("Position {position} is outside the alignment (width {width})")]
    OutOfBounds { position: usize, width: usize },

    #[error("Mask covers {found} columns but the alignment width is {expected}")]
    MaskLength { expected: usize, found: usize },

    #[error("Metadata width {found} does not match alignment width {expected}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("Invalid codon position '{0}' (expected N, 1, 2 or 3)")]
    InvalidCodonPosition(String),

    #[error("Malformed {command} command: {message}")]
    MalformedCommand { command: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentMeta {
    excludes: Excludes,
    codon_positions: CodonPositions,
    charsets: Vec<CharSet>,
}

impl AlignmentMeta {
    /// Default metadata: nothing excluded, fully coding, no charsets.
    pub fn new(width: usize) -> Self {
        Self {
            excludes: Excludes::new(width),
            codon_positions: CodonPositions::new(width),
            charsets: Vec::new(),
        }
    }

    /// Assembles metadata from parts that must all have the same width.
    pub fn from_parts(
        excludes: Excludes,
        codon_positions: CodonPositions,
        charsets: Vec<CharSet>,
    ) -> Result<Self, MetaError> {
        let width = excludes.len();
        let widths = std::iter::once(codon_positions.len())
            .chain(charsets.iter().map(|c| c.columns().len()));
        for found in widths {
            if found != width {
                return Err(MetaError::WidthMismatch {
                    expected: width,
                    found,
                });
            }
        }
        Ok(Self {
            excludes,
            codon_positions,
            charsets,
        })
    }

    pub fn width(&self) -> usize {
        self.excludes.len()
    }

    pub fn excludes(&self) -> &Excludes {
        &self.excludes
    }

    pub fn codon_positions(&self) -> &CodonPositions {
        &self.codon_positions
    }

    pub fn charsets(&self) -> &[CharSet] {
        &self.charsets
    }

    pub fn charset(&self, name: &str) -> Option<&CharSet> {
        self.charsets.iter().find(|c| c.name == name)
    }

    /// Adds a charset, replacing one with the same name.
    pub fn add_charset(&mut self, mut charset: CharSet) {
        charset.columns_mut().resize(self.width());
        match self.charsets.iter_mut().find(|c| c.name == charset.name) {
            Some(existing) => *existing = charset,
            None => self.charsets.push(charset),
        }
    }

    pub fn remove_charset(&mut self, name: &str) -> bool {
        let before = self.charsets.len();
        self.charsets.retain(|c| c.name != name);
        self.charsets.len() != before
    }

    pub fn is_excluded(&self, x: usize) -> bool {
        self.excludes.get(x)
    }

    pub fn exclude_position(&mut self, x: usize) {
        self.excludes.set(x, true);
    }

    pub fn include_position(&mut self, x: usize) {
        self.excludes.set(x, false);
    }

    pub fn codon_pos_at(&self, x: usize) -> u8 {
        self.codon_positions.position_at(x)
    }

    pub fn set_codon_position(&mut self, x: usize, position: u8) {
        self.codon_positions.set_position(x, position);
    }

    pub fn reading_frame(&self) -> u8 {
        self.codon_positions.reading_frame()
    }

    pub fn set_reading_frame(&mut self, frame: u8) -> bool {
        self.codon_positions.set_reading_frame(frame)
    }

    /// Removes the masked columns from excludes, codon positions and every
    /// charset. Nothing is changed when the mask length differs from the
    /// width.
    pub fn remove_from_mask(&mut self, mask: &[bool]) -> Result<(), MetaError> {
        if mask.len() != self.width() {
            return Err(MetaError::MaskLength {
                expected: self.width(),
                found: mask.len(),
            });
        }
        self.excludes.remove_from_mask(mask);
        self.codon_positions.remove_from_mask(mask);
        for charset in self.charsets.iter_mut() {
            charset.columns_mut().remove_from_mask(mask);
        }
        Ok(())
    }

    /// Reverses column order, in lockstep with a reverse complement.
    pub fn reverse(&mut self) {
        self.excludes.reverse();
        self.codon_positions.reverse();
        for charset in self.charsets.iter_mut() {
            charset.columns_mut().reverse();
        }
    }

    /// Grows (with defaults) or truncates every structure at the end.
    pub fn resize(&mut self, width: usize) {
        self.excludes.resize(width);
        self.codon_positions.resize(width);
        for charset in self.charsets.iter_mut() {
            charset.columns_mut().resize(width);
        }
    }

    /// Inserts `count` columns before `at`: included, non-coding and in no
    /// charset.
    pub fn insert_columns(&mut self, at: usize, count: usize) {
        self.excludes.insert_columns(at, count);
        self.codon_positions.insert_columns(at, count);
        for charset in self.charsets.iter_mut() {
            charset.columns_mut().insert_columns(at, count);
        }
    }

    /// True iff `x, x+1, x+2` are included and in codon positions 1, 2, 3.
    pub fn is_full_codon_starting_at(&self, x: usize) -> bool {
        (0..3).all(|i| {
            let col = x + i;
            col < self.width()
                && !self.is_excluded(col)
                && self.codon_pos_at(col) == i as u8 + 1
        })
    }

    /// Translated columns grouped into codons, one per amino acid column.
    /// Codons with fewer than three columns translate to `X`.
    pub fn translated_codons(&self) -> Vec<Vec<usize>> {
        self.codon_positions.translated_codons(&self.excludes)
    }

    /// Width of the amino acid alignment produced by translation.
    pub fn translated_length(&self) -> usize {
        self.translated_codons().len()
    }

    /// Maps a nucleotide column to the amino acid column it falls into.
    /// Columns between codons map to the next one.
    pub fn amino_acid_pos_from_nucleotide_pos(&self, nuc_pos: usize) -> usize {
        self.translated_codons()
            .partition_point(|codon| codon.last().is_some_and(|&x| x < nuc_pos))
    }

    /// Columns in codon position `frame` (1, 2 or 3), optionally skipping
    /// excluded ones.
    pub fn all_codon_positions(
        &self,
        frame: u8,
        remove_excluded: bool,
    ) -> impl Iterator<Item = usize> + '_ {
        self.codon_positions
            .columns_at_position(frame)
            .filter(move |&x| !(remove_excluded && self.is_excluded(x)))
    }

    /// True when the metadata carries information worth writing to a file.
    pub fn is_meta_output_needed(&self) -> bool {
        self.excludes.any() || !self.codon_positions.is_default() || !self.charsets.is_empty()
    }

    /// Metadata for the translated amino acid alignment. Charset columns
    /// that take part in translation are re-indexed to the amino acid they
    /// fall into; codon positions are reset. Excluded columns never reach
    /// the translation, so the result has no excludes.
    pub fn translated(&self) -> AlignmentMeta {
        let codons = self.translated_codons();
        let width = codons.len();
        let mut translated = AlignmentMeta::new(width);
        for charset in &self.charsets {
            let mut aa_set = CharSet::new(charset.name.clone(), width);
            for (aa_pos, codon) in codons.iter().enumerate() {
                if codon.iter().any(|&x| charset.columns().get(x)) {
                    aa_set.add_position(aa_pos);
                }
            }
            translated.charsets.push(aa_set);
        }
        translated
    }
}
