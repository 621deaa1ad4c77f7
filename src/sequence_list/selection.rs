//! Selection over the (column, row) grid.

use std::collections::BTreeSet;
use std::io::{self, Write};

use super::SequenceList;

/// An inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl SelectionRect {
    pub fn new(x1: usize, y1: usize, x2: usize, y2: usize) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

impl SequenceList {
    pub fn is_base_selected(&self, x: usize, y: usize) -> bool {
        self.get(y).is_some_and(|s| s.is_selected(x))
    }

    /// Sets one cell. Returns true when the flag changed.
    pub fn set_selection_at(&mut self, x: usize, y: usize, selected: bool) -> bool {
        match self.get_mut(y) {
            Some(row) if x < row.len() && row.is_selected(x) != selected => {
                row.set_selected(x, selected);
                true
            }
            _ => false,
        }
    }

    pub fn set_selection_within(&mut self, rect: SelectionRect, selected: bool) {
        for row in self.rows_mut().iter_mut().skip(rect.min_y).take(rect.height()) {
            row.set_selected_range(rect.min_x..rect.max_x + 1, selected);
        }
    }

    pub fn select_column(&mut self, x: usize, selected: bool) {
        for row in self.rows_mut().iter_mut() {
            row.set_selected(x, selected);
        }
    }

    pub fn select_all(&mut self) {
        for row in self.rows_mut().iter_mut() {
            row.select_all();
        }
    }

    /// Clears every selection. Returns true if anything was selected.
    pub fn clear_selection(&mut self) -> bool {
        let had = self.has_selection();
        for row in self.rows_mut().iter_mut() {
            row.clear_selection();
        }
        had
    }

    pub fn set_all_horizontal_selection_at(&mut self, y: usize, selected: bool) -> bool {
        let Some(row) = self.get_mut(y) else {
            return false;
        };
        if selected {
            row.select_all();
        } else {
            row.clear_selection();
        }
        true
    }

    /// Fully selects the given rows, clearing everything else.
    pub fn select_rows(&mut self, indices: &[usize]) {
        for (y, row) in self.rows_mut().iter_mut().enumerate() {
            if indices.contains(&y) {
                row.select_all();
            } else {
                row.clear_selection();
            }
        }
    }

    /// Extends the selected columns to every row below the first selected
    /// row.
    pub fn expand_selection_down(&mut self) -> bool {
        let Some(first_row) = self.first_selected_sequence_index() else {
            return false;
        };
        let columns: BTreeSet<usize> = self
            .iter()
            .flat_map(|s| s.selected_positions())
            .collect();
        for row in self.rows_mut().iter_mut().skip(first_row) {
            for &x in &columns {
                row.set_selected(x, true);
            }
        }
        true
    }

    pub fn copy_selection_from_into(&mut self, from: usize, to: usize) -> bool {
        let Some(source) = self.get(from).cloned() else {
            return false;
        };
        match self.get_mut(to) {
            Some(target) => {
                target.copy_selection_from(&source);
                true
            }
            None => false,
        }
    }

    /// In every row, selects column `x2` if column `x1` is selected.
    pub fn copy_selection_from_pos_x1_to_x2(&mut self, x1: usize, x2: usize) {
        for row in self.rows_mut().iter_mut() {
            if row.is_selected(x1) {
                row.set_selected(x2, true);
            }
        }
    }

    pub fn select_everything_within_gaps(&mut self, x: usize, y: usize) -> bool {
        self.get_mut(y).is_some_and(|row| row.select_within_gaps(x))
    }

    pub fn has_selection(&self) -> bool {
        self.iter().any(|s| s.has_selection())
    }

    /// Number of selected cells.
    pub fn selection_size(&self) -> u64 {
        self.iter().map(|s| s.selection_count() as u64).sum()
    }

    /// Number of distinct columns with a selected cell.
    pub fn selected_column_count(&self) -> usize {
        self.selected_columns().len()
    }

    /// Distinct selected columns across all rows, ascending.
    pub fn selected_columns(&self) -> Vec<usize> {
        let columns: BTreeSet<usize> = self
            .iter()
            .flat_map(|s| s.selected_positions())
            .collect();
        columns.into_iter().collect()
    }

    pub fn selected_sequence_count(&self) -> usize {
        self.iter().filter(|s| s.has_selection()).count()
    }

    pub fn first_selected_sequence_index(&self) -> Option<usize> {
        self.iter().position(|s| s.has_selection())
    }

    /// First selected cell as `(x, y)`, scanning rows top to bottom.
    pub fn first_selected_position(&self) -> Option<(usize, usize)> {
        self.iter()
            .enumerate()
            .find_map(|(y, s)| s.first_selected_position().map(|x| (x, y)))
    }

    /// Smallest rectangle containing every selected cell.
    pub fn selection_min_rect(&self) -> Option<SelectionRect> {
        let mut rect: Option<SelectionRect> = None;
        for (y, row) in self.iter().enumerate() {
            let (Some(first), Some(last)) = (row.first_selected_position(), row.last_selected_position()) else {
                continue;
            };
            rect = Some(match rect {
                None => SelectionRect::new(first, y, last, y),
                Some(r) => SelectionRect {
                    min_x: r.min_x.min(first),
                    min_y: r.min_y,
                    max_x: r.max_x.max(last),
                    max_y: y,
                },
            });
        }
        rect
    }

    /// Selected symbols of each row with a selection, one row per line.
    pub fn selection_as_nucleotides(&self) -> String {
        let mut out = String::new();
        for row in self.iter().filter(|s| s.has_selection()) {
            out.push_str(&String::from_utf8_lossy(&row.selected_bases()));
            out.push('\n');
        }
        out
    }

    /// Writes the selected part of each row with a selection as FASTA.
    pub fn write_selection_as_fasta<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for row in self.iter().filter(|s| s.has_selection()) {
            writeln!(out, ">{}", row.name)?;
            out.write_all(&row.selected_bases())?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Writes whole rows as FASTA: the rows with a selection when `selected`
    /// is true, the others otherwise.
    pub fn write_sequences_as_fasta<W: Write>(&self, out: &mut W, selected: bool) -> io::Result<()> {
        for row in self.iter().filter(|s| s.has_selection() == selected) {
            writeln!(out, ">{}", row.name)?;
            row.write_bases(out)?;
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn selection_names(&self) -> Vec<String> {
        self.iter()
            .filter(|s| s.has_selection())
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn has_fully_selected_sequences(&self) -> bool {
        self.iter().any(|s| s.is_fully_selected())
    }

    pub fn first_selected_name(&self) -> Option<&str> {
        self.iter().find(|s| s.has_selection()).map(|s| s.name.as_str())
    }

    /// Renames the first row with a selection.
    pub fn set_first_selected_name(&mut self, name: impl Into<String>) -> bool {
        match self.rows_mut().iter_mut().find(|s| s.has_selection()) {
            Some(row) => {
                row.name = name.into();
                true
            }
            None => false,
        }
    }
}
