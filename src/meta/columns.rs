//! Column-indexed storage shared by excludes, codon positions and charsets.
//!
//! All three are vectors parallel to the alignment width and must see the
//! exact same structural edits as the sequences.

use super::range::ColumnRange;

/// Removes the entries whose mask flag is set. Entries past the end of the
/// mask are kept.
pub(crate) fn remove_masked<T>(values: &mut Vec<T>, mask: &[bool]) {
    let mut x = 0;
    values.retain(|_| {
        let keep = !mask.get(x).copied().unwrap_or(false);
        x += 1;
        keep
    });
}

/// Inserts `count` copies of `fill` before column `at`.
pub(crate) fn insert_filled<T: Clone>(values: &mut Vec<T>, at: usize, count: usize, fill: T) {
    let at = at.min(values.len());
    values.splice(at..at, std::iter::repeat(fill).take(count));
}

/// A boolean flag per alignment column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMask {
    flags: Vec<bool>,
}

impl ColumnMask {
    pub fn new(width: usize) -> Self {
        Self {
            flags: vec![false; width],
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn get(&self, x: usize) -> bool {
        self.flags.get(x).copied().unwrap_or(false)
    }

    /// Sets one flag. Columns outside the mask are ignored.
    pub fn set(&mut self, x: usize, value: bool) {
        if let Some(flag) = self.flags.get_mut(x) {
            *flag = value;
        }
    }

    pub fn set_range(&mut self, range: &ColumnRange, value: bool) {
        for x in range.positions() {
            self.set(x, value);
        }
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }

    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    pub fn any(&self) -> bool {
        self.flags.iter().any(|&f| f)
    }

    /// Set columns, in increasing order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(x, &f)| f.then_some(x))
    }

    /// Set columns as contiguous ranges.
    pub fn as_ranges(&self) -> Vec<ColumnRange> {
        let positions: Vec<usize> = self.positions().collect();
        ColumnRange::compress(&positions, 1)
    }

    pub fn remove_from_mask(&mut self, mask: &[bool]) {
        remove_masked(&mut self.flags, mask);
    }

    pub fn reverse(&mut self) {
        self.flags.reverse();
    }

    /// Grows with unset columns or truncates at the end.
    pub fn resize(&mut self, width: usize) {
        self.flags.resize(width, false);
    }

    pub fn insert_columns(&mut self, at: usize, count: usize) {
        insert_filled(&mut self.flags, at, count, false);
    }
}
