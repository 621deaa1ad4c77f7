//! Data model for a single aligned sequence.
//!
//! A [`Sequence`] is a named row of the alignment grid. Residues are stored
//! as bytes; columns are addressed in grid coordinates, which include the
//! row's `x_offset` (leading gap columns that are not materialized until the
//! row is edited). Every row also carries its own per-column selection.

use std::io::{self, Write};
use std::ops::Range;

use crate::nucleotide::{self, is_gap, GAP_SYMBOL};

/// Type of sequences in an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceType {
    #[default]
    Nucleotide,
    AminoAcid,
}

impl SequenceType {
    /// Fraction of `ACGTUN` residues above which content is nucleotide.
    const NUCLEOTIDE_THRESHOLD: f64 = 0.9;
    /// Residues sampled when inferring the type of a large alignment.
    const SAMPLE_SIZE: usize = 10_000;

    /// Infers the type from the first residues of the given rows.
    ///
    /// Gaps and `?` are ignored. An alignment without residues is treated as
    /// nucleotide.
    pub fn infer<'a, I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = &'a Sequence>,
    {
        let mut total = 0usize;
        let mut nucleotides = 0usize;
        'rows: for seq in sequences {
            for &b in &seq.bases {
                if is_gap(b) || b == b'?' {
                    continue;
                }
                total += 1;
                if matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'U' | b'N') {
                    nucleotides += 1;
                }
                if total >= Self::SAMPLE_SIZE {
                    break 'rows;
                }
            }
        }
        if total == 0 || nucleotides as f64 / total as f64 >= Self::NUCLEOTIDE_THRESHOLD {
            SequenceType::Nucleotide
        } else {
            SequenceType::AminoAcid
        }
    }
}

impl std::fmt::Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceType::Nucleotide => write!(f, "nucleotide"),
            SequenceType::AminoAcid => write!(f, "amino acid"),
        }
    }
}

/// A single named row of an alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// The sequence name (FASTA header without '>', PHYLIP/NEXUS taxon)
    pub name: String,
    bases: Vec<u8>,
    /// Leading gap columns that are implied but not stored in `bases`.
    x_offset: usize,
    /// Selection flags indexed by grid column. May be shorter than the row;
    /// missing entries are unselected.
    selection: Vec<bool>,
}

impl Sequence {
    /// Creates a new sequence.
    pub fn new(name: impl Into<String>, data: impl AsRef<[u8]>) -> Self {
        Self::from_bytes(name, data.as_ref().to_vec())
    }

    /// Creates a new sequence taking ownership of the residue bytes.
    pub fn from_bytes(name: impl Into<String>, bases: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bases,
            x_offset: 0,
            selection: Vec::new(),
        }
    }

    /// Places the row `offset` columns to the right in the alignment grid.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.x_offset = offset;
        self
    }

    /// Returns the grid length of the row (offset included).
    pub fn len(&self) -> usize {
        self.x_offset + self.bases.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_offset(&self) -> usize {
        self.x_offset
    }

    /// Gets the symbol at a grid column.
    pub fn base_at(&self, x: usize) -> Option<u8> {
        if x < self.x_offset {
            Some(GAP_SYMBOL)
        } else {
            self.bases.get(x - self.x_offset).copied()
        }
    }

    /// Returns the row as bytes, with the offset materialized as gaps.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.resize(self.x_offset, GAP_SYMBOL);
        out.extend_from_slice(&self.bases);
        out
    }

    /// Returns the row as a string.
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    /// Gets a copy of the symbols in a column range (clamped to the row).
    pub fn slice(&self, range: Range<usize>) -> Vec<u8> {
        let end = range.end.min(self.len());
        (range.start.min(end)..end).filter_map(|x| self.base_at(x)).collect()
    }

    /// Writes the row symbols without a trailing newline.
    pub fn write_bases<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for _ in 0..self.x_offset {
            out.write_all(&[GAP_SYMBOL])?;
        }
        out.write_all(&self.bases)
    }

    /// Returns the residues with all gaps removed.
    pub fn residues(&self) -> Vec<u8> {
        self.bases.iter().copied().filter(|&b| !is_gap(b)).collect()
    }

    /// Number of non-gap residues.
    pub fn residue_count(&self) -> usize {
        self.bases.iter().filter(|&&b| !is_gap(b)).count()
    }

    /// Returns true if the row contains the symbol (exact byte match).
    pub fn contains(&self, symbol: u8) -> bool {
        self.bases.contains(&symbol) || (is_gap(symbol) && self.x_offset > 0)
    }

    /// Grid column of the last non-gap residue.
    pub fn last_residue_position(&self) -> Option<usize> {
        self.bases
            .iter()
            .rposition(|&b| !is_gap(b))
            .map(|i| i + self.x_offset)
    }

    /// Returns true if the symbol at `x` is a gap. Columns past the end of
    /// the row count as gaps since padding would fill them with one.
    pub fn is_gap_at(&self, x: usize) -> bool {
        self.base_at(x).map_or(true, is_gap)
    }

    // Selection

    pub fn is_selected(&self, x: usize) -> bool {
        self.selection.get(x).copied().unwrap_or(false)
    }

    /// Sets the selection flag of one column. Columns outside the row are
    /// ignored.
    pub fn set_selected(&mut self, x: usize, selected: bool) {
        if x >= self.len() {
            return;
        }
        if selected {
            if self.selection.len() <= x {
                self.selection.resize(x + 1, false);
            }
            self.selection[x] = true;
        } else if let Some(flag) = self.selection.get_mut(x) {
            *flag = false;
        }
    }

    /// Sets the selection flag of every column in `range`.
    pub fn set_selected_range(&mut self, range: Range<usize>, selected: bool) {
        for x in range {
            self.set_selected(x, selected);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = vec![true; self.len()];
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn has_selection(&self) -> bool {
        self.selection.iter().any(|&s| s)
    }

    pub fn selection_count(&self) -> usize {
        self.selection.iter().filter(|&&s| s).count()
    }

    pub fn is_fully_selected(&self) -> bool {
        !self.is_empty() && self.selection_count() == self.len()
    }

    pub fn selected_positions(&self) -> Vec<usize> {
        self.selection
            .iter()
            .enumerate()
            .filter_map(|(x, &s)| s.then_some(x))
            .collect()
    }

    pub fn first_selected_position(&self) -> Option<usize> {
        self.selection.iter().position(|&s| s)
    }

    pub fn last_selected_position(&self) -> Option<usize> {
        self.selection.iter().rposition(|&s| s)
    }

    /// Selected symbols in column order.
    pub fn selected_bases(&self) -> Vec<u8> {
        self.selected_positions()
            .into_iter()
            .filter_map(|x| self.base_at(x))
            .collect()
    }

    /// Copies the selection flags of another row onto this one.
    pub fn copy_selection_from(&mut self, other: &Sequence) {
        self.selection.clear();
        for x in other.selected_positions() {
            self.set_selected(x, true);
        }
    }

    /// Selects the run of residues around `x` bounded by gaps.
    /// Returns false when `x` is a gap or outside the row.
    pub fn select_within_gaps(&mut self, x: usize) -> bool {
        if x >= self.len() || self.is_gap_at(x) {
            return false;
        }
        let mut start = x;
        while start > 0 && !self.is_gap_at(start - 1) {
            start -= 1;
        }
        let mut end = x + 1;
        while end < self.len() && !self.is_gap_at(end) {
            end += 1;
        }
        self.set_selected_range(start..end, true);
        true
    }

    // Editing

    /// Stores the offset as real gap symbols so edits can index `bases`
    /// directly.
    fn materialize_offset(&mut self) {
        if self.x_offset > 0 {
            let mut bases = vec![GAP_SYMBOL; self.x_offset];
            bases.append(&mut self.bases);
            self.bases = bases;
            self.x_offset = 0;
        }
    }

    /// Replaces the residues and clears the selection.
    pub fn set_bases(&mut self, bases: Vec<u8>) {
        self.bases = bases;
        self.x_offset = 0;
        self.selection.clear();
    }

    /// Inserts a gap before column `x` (appends when `x` is past the end).
    pub fn insert_gap_at(&mut self, x: usize) {
        self.materialize_offset();
        let x = x.min(self.bases.len());
        self.bases.insert(x, GAP_SYMBOL);
        if x < self.selection.len() {
            self.selection.insert(x, false);
        }
    }

    /// Removes the symbol at column `x`.
    pub fn delete_at(&mut self, x: usize) -> bool {
        if x >= self.len() {
            return false;
        }
        self.materialize_offset();
        self.bases.remove(x);
        if x < self.selection.len() {
            self.selection.remove(x);
        }
        true
    }

    /// Removes every column whose mask entry is true. Mask entries past the
    /// end of the row are ignored; columns past the end of the mask are kept.
    pub fn delete_positions(&mut self, mask: &[bool]) -> bool {
        if !mask.iter().take(self.len()).any(|&m| m) {
            return false;
        }
        self.materialize_offset();
        let keep = |x: usize| !mask.get(x).copied().unwrap_or(false);
        self.bases = std::mem::take(&mut self.bases)
            .into_iter()
            .enumerate()
            .filter_map(|(x, b)| keep(x).then_some(b))
            .collect();
        self.selection = std::mem::take(&mut self.selection)
            .into_iter()
            .enumerate()
            .filter_map(|(x, s)| keep(x).then_some(s))
            .collect();
        true
    }

    /// Appends gaps until the row is `length` columns long.
    pub fn right_pad_to(&mut self, length: usize) -> bool {
        if self.len() >= length {
            return false;
        }
        let missing = length - self.len();
        self.bases.extend(std::iter::repeat(GAP_SYMBOL).take(missing));
        true
    }

    /// Prepends gaps until the row is `length` columns long. The added
    /// columns are kept as offset rather than stored.
    pub fn left_pad_to(&mut self, length: usize) -> bool {
        if self.len() >= length {
            return false;
        }
        let missing = length - self.len();
        self.x_offset += missing;
        if !self.selection.is_empty() {
            let mut selection = vec![false; missing];
            selection.append(&mut self.selection);
            self.selection = selection;
        }
        true
    }

    /// Shortens the row to `length` columns.
    pub fn truncate(&mut self, length: usize) -> bool {
        if self.len() <= length {
            return false;
        }
        self.materialize_offset();
        self.bases.truncate(length);
        self.selection.truncate(length);
        true
    }

    pub fn complement(&mut self) {
        for b in self.bases.iter_mut() {
            *b = nucleotide::complement(*b);
        }
    }

    /// Reverse-complements the row; the selection is mirrored with it.
    pub fn reverse_complement(&mut self) {
        self.materialize_offset();
        self.bases.reverse();
        self.complement();
        if !self.selection.is_empty() {
            self.selection.resize(self.bases.len(), false);
            self.selection.reverse();
        }
    }

    pub fn is_gap_left_of_selection(&self) -> bool {
        match self.first_selected_position() {
            Some(first) if first > 0 => self.is_gap_at(first - 1),
            _ => false,
        }
    }

    pub fn is_gap_right_of_selection(&self) -> bool {
        match self.last_selected_position() {
            Some(last) => last + 1 < self.len() && self.is_gap_at(last + 1),
            None => false,
        }
    }

    /// Moves the selected block one column left by moving the gap in front
    /// of it to its right end. Length and residues are unchanged.
    pub fn move_selection_left_if_gap(&mut self) -> bool {
        if !self.is_gap_left_of_selection() {
            return false;
        }
        let (Some(first), Some(last)) = (self.first_selected_position(), self.last_selected_position())
        else {
            return false;
        };
        self.materialize_offset();
        let gap = self.bases.remove(first - 1);
        self.bases.insert(last, gap);
        self.selection.remove(first - 1);
        self.selection.insert(last, false);
        true
    }

    /// Moves the selected block one column right by moving the gap after it
    /// to its left end.
    pub fn move_selection_right_if_gap(&mut self) -> bool {
        if !self.is_gap_right_of_selection() {
            return false;
        }
        let (Some(first), Some(last)) = (self.first_selected_position(), self.last_selected_position())
        else {
            return false;
        };
        self.materialize_offset();
        let gap = self.bases.remove(last + 1);
        self.bases.insert(first, gap);
        if self.selection.len() > last + 1 {
            self.selection.remove(last + 1);
        }
        self.selection.insert(first, false);
        true
    }

    /// Inserts a gap at the first selected column, pushing the selected
    /// residues (and everything after them) one column right.
    pub fn insert_gap_left_of_selection(&mut self) -> bool {
        match self.first_selected_position() {
            Some(first) => {
                self.insert_gap_at(first);
                true
            }
            None => false,
        }
    }

    /// Inserts a gap right after the last selected column.
    pub fn insert_gap_right_of_selection(&mut self) -> bool {
        match self.last_selected_position() {
            Some(last) => {
                self.insert_gap_at(last + 1);
                true
            }
            None => false,
        }
    }

    /// Deletes the gap immediately left of the selection, pulling the
    /// selection and everything after it one column left.
    pub fn delete_gap_left_of_selection(&mut self) -> bool {
        if !self.is_gap_left_of_selection() {
            return false;
        }
        match self.first_selected_position() {
            Some(first) => self.delete_at(first - 1),
            None => false,
        }
    }

    /// Replaces every selected symbol with `symbol`.
    pub fn replace_selected_with(&mut self, symbol: u8) -> bool {
        let positions = self.selected_positions();
        if positions.is_empty() {
            return false;
        }
        self.materialize_offset();
        let mut changed = false;
        for x in positions {
            if let Some(b) = self.bases.get_mut(x) {
                if *b != symbol {
                    *b = symbol;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Removes the selected columns from this row only.
    pub fn delete_selected(&mut self) -> bool {
        let mask = self.selection.clone();
        let deleted = self.delete_positions(&mask);
        if deleted {
            self.selection.clear();
        }
        deleted
    }

    /// Removes every gap from the row.
    pub fn delete_all_gaps(&mut self) -> bool {
        let before = self.len();
        self.bases.retain(|&b| !is_gap(b));
        self.x_offset = 0;
        self.selection.clear();
        self.len() != before
    }
}
