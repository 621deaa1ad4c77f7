//! The ordered rows of an alignment.
//!
//! [`SequenceList`] owns the rows and implements every row-level operation:
//! padding and trimming, gap-aware editing, selection, find, sorting,
//! consensus and histograms. It knows nothing about column metadata or
//! notifications; the [`Alignment`](crate::alignment::Alignment) façade
//! keeps those in step.
//!
//! A list is either built in memory or backed by a file that is parsed on a
//! background thread. Until that load completes the list is empty and
//! [`SequenceList::is_fully_loaded`] returns false.

mod edit;
mod find;
pub mod loader;
mod selection;
mod stats;

use std::path::PathBuf;

use thiserror::Error;

use crate::meta::MetaError;
use crate::model::{Sequence, SequenceType};
use crate::nucleotide::is_gap;

pub use find::{FindCursor, FindMatch, FindRequest, FindTarget};
pub use loader::{LoadMessage, PendingLoad};
pub use selection::SelectionRect;
pub use stats::CharsetStats;

/// Errors for edits that would break the rectangular shape of the
/// alignment. Nothing is modified when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Mask covers {found} columns but the alignment width is {expected}")]
    MaskLength { expected: usize, found: usize },

    #[error("Row {row} is out of range ({count} sequences)")]
    RowOutOfRange { row: usize, count: usize },

    #[error("Sequences are still loading")]
    NotLoaded,

    #[error("Invalid find pattern: {0}")]
    InvalidPattern(String),

    #[error(transparent)]
    Meta(#[from] MetaError),
}

/// A row as it was before an edit, for undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSnapshot {
    pub index: usize,
    pub sequence: Sequence,
}

/// Prior state of the rows an edit changed. Empty when nothing changed.
pub type PriorState = Vec<RowSnapshot>;

/// Where the rows come from.
#[derive(Debug)]
pub enum Source {
    Memory,
    File {
        path: PathBuf,
        pending: Option<PendingLoad>,
    },
}

#[derive(Debug)]
pub struct SequenceList {
    rows: Vec<Sequence>,
    sequence_type: SequenceType,
    source: Source,
    find_cursor: FindCursor,
}

impl Default for SequenceList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Clone for SequenceList {
    /// Clones the rows into an in-memory list. A pending file load stays
    /// with the original.
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            sequence_type: self.sequence_type,
            source: Source::Memory,
            find_cursor: self.find_cursor,
        }
    }
}

impl SequenceList {
    /// Creates an in-memory list, inferring the sequence type from content.
    pub fn new(rows: Vec<Sequence>) -> Self {
        let sequence_type = SequenceType::infer(&rows);
        Self {
            rows,
            sequence_type,
            source: Source::Memory,
            find_cursor: FindCursor::default(),
        }
    }

    /// Creates an empty list whose rows arrive from `path` in the
    /// background.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let pending = loader::spawn(path.clone());
        Self {
            rows: Vec::new(),
            sequence_type: SequenceType::default(),
            source: Source::File {
                path,
                pending: Some(pending),
            },
            find_cursor: FindCursor::default(),
        }
    }

    pub fn is_fully_loaded(&self) -> bool {
        !matches!(self.source, Source::File { pending: Some(_), .. })
    }

    pub fn is_file_backed(&self) -> bool {
        matches!(self.source, Source::File { .. })
    }

    /// Takes the result of a finished background load, if any. Never
    /// blocks.
    pub fn poll_load(&mut self) -> Option<LoadMessage> {
        let Source::File { pending, .. } = &mut self.source else {
            return None;
        };
        let message = pending.as_mut()?.try_take()?;
        *pending = None;
        Some(message)
    }

    /// Blocks until the background load finishes.
    pub fn wait_load(&mut self) -> Option<LoadMessage> {
        let Source::File { pending, .. } = &mut self.source else {
            return None;
        };
        let message = pending.take()?.wait();
        Some(message)
    }

    /// Replaces every row and re-infers the sequence type.
    pub fn set_rows(&mut self, rows: Vec<Sequence>) {
        self.sequence_type = SequenceType::infer(&rows);
        self.rows = rows;
        self.find_cursor = FindCursor::default();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.rows.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Sequence> {
        self.rows.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[Sequence] {
        &self.rows
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    pub fn set_sequence_type(&mut self, sequence_type: SequenceType) {
        self.sequence_type = sequence_type;
    }

    pub fn is_nucleotide(&self) -> bool {
        self.sequence_type == SequenceType::Nucleotide
    }

    pub fn longest_sequence_length(&self) -> usize {
        self.rows.iter().map(Sequence::len).max().unwrap_or(0)
    }

    pub fn longest_name_length(&self) -> usize {
        self.rows.iter().map(|s| s.name.len()).max().unwrap_or(0)
    }

    pub fn base_at(&self, x: usize, y: usize) -> Option<u8> {
        self.rows.get(y)?.base_at(x)
    }

    pub fn is_position_valid(&self, x: usize, y: usize) -> bool {
        self.rows.get(y).is_some_and(|s| x < s.len())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|s| s.name == name)
    }

    pub fn sequence_by_name(&self, name: &str) -> Option<&Sequence> {
        self.rows.iter().find(|s| s.name == name)
    }

    pub fn push(&mut self, sequence: Sequence) {
        self.rows.push(sequence);
    }

    /// Inserts rows before `index` (appends when past the end).
    pub fn insert_all(&mut self, index: usize, rows: Vec<Sequence>) {
        let index = index.min(self.rows.len());
        self.rows.splice(index..index, rows);
    }

    /// Removes and returns row `index`.
    pub fn remove(&mut self, index: usize) -> Result<Sequence, EditError> {
        if index >= self.rows.len() {
            return Err(EditError::RowOutOfRange {
                row: index,
                count: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Puts back rows captured before an edit. Snapshots for rows that no
    /// longer exist are skipped.
    pub fn restore(&mut self, prior: PriorState) -> bool {
        let mut restored = false;
        for snapshot in prior {
            if let Some(row) = self.rows.get_mut(snapshot.index) {
                *row = snapshot.sequence;
                restored = true;
            }
        }
        restored
    }

    /// Appends gaps to every row shorter than the longest one.
    pub fn right_pad_with_gap_until_equal_length(&mut self) -> bool {
        let longest = self.longest_sequence_length();
        let mut padded = false;
        for row in self.rows.iter_mut() {
            padded |= row.right_pad_to(longest);
        }
        padded
    }

    /// Prepends gaps to every row shorter than the longest one.
    pub fn left_pad_with_gap_until_equal_length(&mut self) -> bool {
        let longest = self.longest_sequence_length();
        let mut padded = false;
        for row in self.rows.iter_mut() {
            padded |= row.left_pad_to(longest);
        }
        padded
    }

    /// Cuts the trailing columns that are gaps in every row.
    pub fn right_trim_sequences_remove_gaps_until_equal_length(&mut self) -> bool {
        let keep = self
            .rows
            .iter()
            .filter_map(Sequence::last_residue_position)
            .max()
            .map_or(0, |last| last + 1);
        let mut trimmed = false;
        for row in self.rows.iter_mut() {
            trimmed |= row.truncate(keep);
        }
        trimmed
    }

    pub fn sort_sequences_by_name(&mut self) -> bool {
        let before: Vec<String> = self.rows.iter().map(|s| s.name.clone()).collect();
        self.rows.sort_by(|a, b| a.name.cmp(&b.name));
        self.rows.iter().map(|s| &s.name).ne(before.iter())
    }

    /// Reorders rows to follow `reference`, matching rows by name. Rows not
    /// found in the reference keep their relative order at the end.
    pub fn sort_sequences_by_this_model(&mut self, reference: &[Sequence]) -> bool {
        let rank = |name: &str| {
            reference
                .iter()
                .position(|r| r.name == name)
                .unwrap_or(usize::MAX)
        };
        let before: Vec<String> = self.rows.iter().map(|s| s.name.clone()).collect();
        self.rows.sort_by_cached_key(|s| rank(&s.name));
        self.rows.iter().map(|s| &s.name).ne(before.iter())
    }

    /// Symbols that do not belong to the list's alphabet, in order of first
    /// appearance. Empty when every character is valid.
    pub fn invalid_characters(&self) -> Vec<char> {
        let valid: fn(u8) -> bool = match self.sequence_type {
            SequenceType::Nucleotide => crate::nucleotide::is_nucleotide_symbol,
            SequenceType::AminoAcid => {
                |b| b.is_ascii_alphabetic() || is_gap(b) || b == b'*' || b == b'?'
            }
        };
        let mut found: Vec<char> = Vec::new();
        for row in &self.rows {
            for b in row.to_bytes() {
                if !valid(b) && !found.contains(&(b as char)) {
                    found.push(b as char);
                }
            }
        }
        found
    }

    pub fn is_all_characters_valid(&self) -> bool {
        self.invalid_characters().is_empty()
    }

    pub(crate) fn snapshot(&self, index: usize) -> Option<RowSnapshot> {
        self.rows.get(index).map(|s| RowSnapshot {
            index,
            sequence: s.clone(),
        })
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Sequence> {
        &mut self.rows
    }

    pub(crate) fn find_cursor_mut(&mut self) -> &mut FindCursor {
        &mut self.find_cursor
    }

    pub fn find_cursor(&self) -> FindCursor {
        self.find_cursor
    }

    pub fn clear_find_cursor(&mut self) {
        self.find_cursor = FindCursor::default();
    }
}

impl<'a> IntoIterator for &'a SequenceList {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
