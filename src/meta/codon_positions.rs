//! Codon position assignment per alignment column.
//!
//! Each column stores a base assignment: 0 for non-coding, or 1, 2, 3. The
//! position reported for a column depends on the reading frame: frame `f`
//! shifts the triplet grouping so that codons start `f - 1` columns later.

use super::columns::{insert_filled, remove_masked};
use super::ColumnMask;

/// Codon position of a non-coding column.
pub const NON_CODING: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodonPositions {
    positions: Vec<u8>,
    reading_frame: u8,
}

impl CodonPositions {
    /// Creates a fully coding assignment `1,2,3,1,2,3,...` in frame 1.
    pub fn new(width: usize) -> Self {
        Self {
            positions: (0..width).map(default_position).collect(),
            reading_frame: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn reading_frame(&self) -> u8 {
        self.reading_frame
    }

    /// Sets the reading frame. Values outside `1..=3` are rejected.
    pub fn set_reading_frame(&mut self, frame: u8) -> bool {
        if (1..=3).contains(&frame) && frame != self.reading_frame {
            self.reading_frame = frame;
            true
        } else {
            false
        }
    }

    /// Position of column `x` under the current reading frame. Columns
    /// outside the alignment are non-coding.
    pub fn position_at(&self, x: usize) -> u8 {
        match self.positions.get(x).copied() {
            None | Some(NON_CODING) => NON_CODING,
            Some(raw) => ((raw + 3 - self.reading_frame) % 3) + 1,
        }
    }

    pub fn is_coding(&self, x: usize) -> bool {
        self.position_at(x) != NON_CODING
    }

    /// Assigns the position column `x` should report under the current
    /// reading frame.
    pub fn set_position(&mut self, x: usize, position: u8) {
        let Some(slot) = self.positions.get_mut(x) else {
            return;
        };
        *slot = match position {
            1..=3 => ((position + self.reading_frame - 2) % 3) + 1,
            _ => NON_CODING,
        };
    }

    /// Columns reporting `position`, in increasing order.
    pub fn columns_at_position(&self, position: u8) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&x| self.position_at(x) == position)
    }

    /// True when the assignment equals what [`CodonPositions::new`] creates.
    pub fn is_default(&self) -> bool {
        self.positions
            .iter()
            .enumerate()
            .all(|(x, &p)| p == default_position(x))
    }

    /// Groups the translated columns into codons. Translated columns are
    /// the coding, non-excluded ones from the first column in position 1
    /// on. A codon opens at every position 1 and at every break in the
    /// 1, 2, 3 run, so groups shorter than three columns are incomplete.
    pub fn translated_codons(&self, excludes: &ColumnMask) -> Vec<Vec<usize>> {
        let mut codons: Vec<Vec<usize>> = Vec::new();
        let mut previous = NON_CODING;
        for x in (0..self.len()).filter(|&x| !excludes.get(x)) {
            let position = self.position_at(x);
            if position == NON_CODING || (codons.is_empty() && position != 1) {
                continue;
            }
            match codons.last_mut() {
                Some(codon) if position == previous + 1 && codon.len() < 3 => codon.push(x),
                _ => codons.push(vec![x]),
            }
            previous = position;
        }
        codons
    }

    pub fn remove_from_mask(&mut self, mask: &[bool]) {
        remove_masked(&mut self.positions, mask);
    }

    /// Reverses the column order. Positions 1 and 3 are swapped so that
    /// codons still read 1,2,3 from left to right after a reverse
    /// complement.
    pub fn reverse(&mut self) {
        self.positions.reverse();
        for p in self.positions.iter_mut() {
            *p = match *p {
                1 => 3,
                3 => 1,
                other => other,
            };
        }
    }

    /// Grows with the default pattern or truncates at the end.
    pub fn resize(&mut self, width: usize) {
        let old = self.positions.len();
        if width <= old {
            self.positions.truncate(width);
        } else {
            self.positions.extend((old..width).map(default_position));
        }
    }

    /// Inserts non-coding columns before `at`.
    pub fn insert_columns(&mut self, at: usize, count: usize) {
        insert_filled(&mut self.positions, at, count, NON_CODING);
    }
}

fn default_position(x: usize) -> u8 {
    (x % 3) as u8 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern() {
        let codons = CodonPositions::new(7);
        let positions: Vec<u8> = (0..7).map(|x| codons.position_at(x)).collect();
        assert_eq!(positions, vec![1, 2, 3, 1, 2, 3, 1]);
        assert!(codons.is_default());
        assert_eq!(codons.position_at(100), NON_CODING);
    }

    #[test]
    fn test_reading_frame_shifts_positions() {
        let mut codons = CodonPositions::new(6);
        assert!(codons.set_reading_frame(2));
        let positions: Vec<u8> = (0..6).map(|x| codons.position_at(x)).collect();
        assert_eq!(positions, vec![3, 1, 2, 3, 1, 2]);
        assert!(codons.set_reading_frame(3));
        let positions: Vec<u8> = (0..6).map(|x| codons.position_at(x)).collect();
        assert_eq!(positions, vec![2, 3, 1, 2, 3, 1]);
        assert!(!codons.set_reading_frame(4));
        assert!(!codons.set_reading_frame(3));
    }

    #[test]
    fn test_set_position_is_frame_aware() {
        let mut codons = CodonPositions::new(3);
        codons.set_reading_frame(3);
        codons.set_position(0, 1);
        assert_eq!(codons.position_at(0), 1);
        codons.set_position(1, 0);
        assert!(!codons.is_coding(1));
    }

    #[test]
    fn test_translated_codons_skip_leading_partial_codon() {
        let mut codons = CodonPositions::new(7);
        codons.set_reading_frame(2);
        let excludes = ColumnMask::new(7);
        assert_eq!(codons.translated_codons(&excludes), vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn test_translated_codons_split_at_broken_runs() {
        let mut codons = CodonPositions::new(9);
        codons.set_position(4, 0);
        let mut excludes = ColumnMask::new(9);
        excludes.set(8, true);
        assert_eq!(
            codons.translated_codons(&excludes),
            vec![vec![0, 1, 2], vec![3], vec![5], vec![6, 7]]
        );
    }

    #[test]
    fn test_translated_codons_restart_at_position_one() {
        let mut codons = CodonPositions::new(8);
        for (x, position) in [1, 2, 3, 1, 2, 1, 2, 3].into_iter().enumerate() {
            codons.set_position(x, position);
        }
        let excludes = ColumnMask::new(8);
        assert_eq!(
            codons.translated_codons(&excludes),
            vec![vec![0, 1, 2], vec![3, 4], vec![5, 6, 7]]
        );
    }

    #[test]
    fn test_reverse_keeps_codon_order() {
        let mut codons = CodonPositions::new(6);
        codons.reverse();
        let positions: Vec<u8> = (0..6).map(|x| codons.position_at(x)).collect();
        assert_eq!(positions, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_resize_and_insert() {
        let mut codons = CodonPositions::new(3);
        codons.resize(5);
        assert_eq!(codons.position_at(3), 1);
        assert_eq!(codons.position_at(4), 2);
        codons.insert_columns(0, 1);
        assert_eq!(codons.len(), 6);
        assert_eq!(codons.position_at(0), NON_CODING);
        assert_eq!(codons.position_at(1), 1);
    }
}
