//! Row editing: masked column deletion, gap moves, merging and the bulk
//! residue rewrites.

use log::debug;

use super::{EditError, PriorState, SequenceList};
use crate::model::Sequence;
use crate::nucleotide::{is_gap, GAP_SYMBOL};

impl SequenceList {
    /// Removes the masked columns from every row. The mask must cover the
    /// full alignment width; otherwise nothing is removed.
    pub fn delete_bases_in_all_sequences_from_mask(&mut self, mask: &[bool]) -> Result<bool, EditError> {
        let width = self.longest_sequence_length();
        if mask.len() != width {
            return Err(EditError::MaskLength {
                expected: width,
                found: mask.len(),
            });
        }
        let mut deleted = false;
        for row in self.rows_mut().iter_mut() {
            deleted |= row.delete_positions(mask);
        }
        debug!("Deleted {} masked columns", mask.iter().filter(|&&m| m).count());
        Ok(deleted)
    }

    /// Applies `edit` to every row accepted by `applies`, returning the
    /// prior state of the rows it changed.
    fn edit_rows<A, E>(&mut self, applies: A, mut edit: E) -> PriorState
    where
        A: Fn(&Sequence) -> bool,
        E: FnMut(&mut Sequence) -> bool,
    {
        let mut prior = PriorState::new();
        for index in 0..self.len() {
            let Some(snapshot) = self.snapshot(index) else {
                continue;
            };
            if !applies(&snapshot.sequence) {
                continue;
            }
            let changed = self.rows_mut().get_mut(index).is_some_and(&mut edit);
            if changed {
                prior.push(snapshot);
            }
        }
        prior
    }

    pub fn is_gap_present_left_of_selection(&self) -> bool {
        self.iter().any(Sequence::is_gap_left_of_selection)
    }

    pub fn is_gap_present_right_of_selection(&self) -> bool {
        self.iter().any(Sequence::is_gap_right_of_selection)
    }

    /// Moves each row's selected block one column left where a gap is in
    /// the way; rows without such a gap are left alone.
    pub fn move_selection_left_if_gap_is_present(&mut self) -> PriorState {
        self.edit_rows(Sequence::is_gap_left_of_selection, Sequence::move_selection_left_if_gap)
    }

    pub fn move_selection_right_if_gap_is_present(&mut self) -> PriorState {
        self.edit_rows(Sequence::is_gap_right_of_selection, Sequence::move_selection_right_if_gap)
    }

    /// Moves the selection `diff` columns (negative is left), one step at a
    /// time, stopping per row at the first missing gap.
    pub fn move_selection_if_gap_is_present(&mut self, diff: isize) -> PriorState {
        let steps = diff.unsigned_abs();
        let left = diff < 0;
        self.edit_rows(
            |s| s.has_selection(),
            |s| {
                let mut moved = false;
                for _ in 0..steps {
                    let step = if left {
                        s.move_selection_left_if_gap()
                    } else {
                        s.move_selection_right_if_gap()
                    };
                    if !step {
                        break;
                    }
                    moved = true;
                }
                moved
            },
        )
    }

    /// Inserts a gap left of each row's selection. Rows become ragged until
    /// re-padded.
    pub fn insert_gap_left_of_selected_base(&mut self) -> PriorState {
        self.edit_rows(Sequence::has_selection, Sequence::insert_gap_left_of_selection)
    }

    pub fn insert_gap_right_of_selected_base(&mut self) -> PriorState {
        self.edit_rows(Sequence::has_selection, Sequence::insert_gap_right_of_selection)
    }

    /// Removes the gap immediately left of each row's selection.
    pub fn delete_gap_move_left(&mut self) -> PriorState {
        self.edit_rows(Sequence::is_gap_left_of_selection, Sequence::delete_gap_left_of_selection)
    }

    pub fn replace_selected_bases_with_gap(&mut self) -> PriorState {
        self.edit_rows(Sequence::has_selection, |s| s.replace_selected_with(GAP_SYMBOL))
    }

    pub fn delete_selected_bases(&mut self) -> PriorState {
        self.edit_rows(Sequence::has_selection, Sequence::delete_selected)
    }

    pub fn replace_selected_with_char(&mut self, symbol: u8) -> bool {
        !self
            .edit_rows(Sequence::has_selection, |s| s.replace_selected_with(symbol))
            .is_empty()
    }

    /// Merges row `b` into row `a` and removes `b`.
    ///
    /// At each column the merged row takes whichever input has a residue.
    /// When both have one the merge fails unless `allow_overlap` is set, in
    /// which case row `a` wins. Nothing changes on failure.
    pub fn merge_two_sequences(&mut self, a: usize, b: usize, allow_overlap: bool) -> bool {
        if a == b {
            return false;
        }
        let (Some(first), Some(second)) = (self.get(a), self.get(b)) else {
            return false;
        };
        let width = first.len().max(second.len());
        let mut merged = Vec::with_capacity(width);
        for x in 0..width {
            let pa = first.base_at(x).filter(|&c| !is_gap(c));
            let pb = second.base_at(x).filter(|&c| !is_gap(c));
            match (pa, pb) {
                (Some(_), Some(_)) if !allow_overlap => {
                    debug!("Merge of '{}' and '{}' overlaps at column {}", first.name, second.name, x);
                    return false;
                }
                (Some(c), _) | (None, Some(c)) => merged.push(c),
                (None, None) => merged.push(GAP_SYMBOL),
            }
        }
        let rows = self.rows_mut();
        rows[a].set_bases(merged);
        rows.remove(b);
        true
    }

    pub fn reverse_complement(&mut self) -> bool {
        for row in self.rows_mut().iter_mut() {
            row.reverse_complement();
        }
        !self.is_empty()
    }

    pub fn complement(&mut self) -> bool {
        for row in self.rows_mut().iter_mut() {
            row.complement();
        }
        !self.is_empty()
    }

    /// Removes rows without a single residue.
    pub fn delete_empty_sequences(&mut self) -> Vec<Sequence> {
        let (empty, kept): (Vec<Sequence>, Vec<Sequence>) = std::mem::take(self.rows_mut())
            .into_iter()
            .partition(|s| s.residue_count() == 0);
        *self.rows_mut() = kept;
        empty
    }

    pub fn delete_sequence(&mut self, index: usize) -> Result<Sequence, EditError> {
        self.remove(index)
    }

    /// Inserts `count` gap columns before column `at` of every row. Rows
    /// shorter than `at` get the gaps appended.
    pub fn insert_gap_columns(&mut self, at: usize, count: usize) {
        for row in self.rows_mut().iter_mut() {
            for _ in 0..count {
                row.insert_gap_at(at);
            }
        }
        debug!("Inserted {} gap columns at {}", count, at);
    }

    /// Removes every gap from every row.
    pub fn delete_all_gaps(&mut self) -> bool {
        let mut changed = false;
        for row in self.rows_mut().iter_mut() {
            changed |= row.delete_all_gaps();
        }
        changed
    }

    /// Re-gaps each nucleotide row after the amino acid row with the same
    /// name: every residue consumes one codon of the ungapped nucleotides and
    /// every gap becomes `---`. Leftover nucleotides are appended.
    pub fn realign_nucleotides_from_aa_template(&mut self, template: &SequenceList) -> bool {
        let mut changed = false;
        for row in self.rows_mut().iter_mut() {
            let Some(aa) = template.sequence_by_name(&row.name) else {
                continue;
            };
            let residues = row.residues();
            let mut codons = residues.chunks(3);
            let mut realigned = Vec::with_capacity(aa.len() * 3);
            for symbol in aa.to_bytes() {
                if is_gap(symbol) {
                    realigned.extend_from_slice(b"---");
                } else if let Some(codon) = codons.next() {
                    realigned.extend_from_slice(codon);
                    realigned.resize(realigned.len() + 3 - codon.len(), GAP_SYMBOL);
                }
            }
            for codon in codons {
                realigned.extend_from_slice(codon);
            }
            if realigned != row.to_bytes() {
                row.set_bases(realigned);
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::list;
    use super::*;

    fn bases(list: &SequenceList) -> Vec<String> {
        list.iter().map(Sequence::as_string).collect()
    }

    #[test]
    fn test_mask_delete_checks_width() {
        let mut seqs = list(&[("a", "ACGT"), ("b", "A-GT")]);
        let before = bases(&seqs);
        assert_eq!(
            seqs.delete_bases_in_all_sequences_from_mask(&[true, false]),
            Err(EditError::MaskLength {
                expected: 4,
                found: 2
            })
        );
        assert_eq!(bases(&seqs), before);

        assert_eq!(seqs.delete_bases_in_all_sequences_from_mask(&[false, true, false, false]), Ok(true));
        assert_eq!(bases(&seqs), vec!["AGT", "AGT"]);
    }

    #[test]
    fn test_move_right_into_gap() {
        let mut seqs = list(&[("a", "AC-T"), ("b", "ACGT")]);
        seqs.get_mut(0).unwrap().set_selected(1, true);
        seqs.get_mut(1).unwrap().set_selected(1, true);
        assert!(seqs.is_gap_present_right_of_selection());

        let prior = seqs.move_selection_right_if_gap_is_present();
        assert_eq!(prior.len(), 1);
        assert_eq!(prior[0].index, 0);
        assert_eq!(prior[0].sequence.as_string(), "AC-T");
        assert_eq!(bases(&seqs), vec!["A-CT", "ACGT"]);
        assert!(seqs.get(0).unwrap().is_selected(2));
        assert!(!seqs.get(0).unwrap().is_selected(1));
    }

    #[test]
    fn test_move_blocked_is_noop() {
        let mut seqs = list(&[("a", "ACGT")]);
        seqs.get_mut(0).unwrap().set_selected(1, true);
        assert!(seqs.move_selection_right_if_gap_is_present().is_empty());
        assert!(seqs.move_selection_left_if_gap_is_present().is_empty());
        assert_eq!(bases(&seqs), vec!["ACGT"]);
    }

    #[test]
    fn test_move_by_diff() {
        let mut seqs = list(&[("a", "---AC")]);
        seqs.get_mut(0).unwrap().set_selected_range(3..5, true);
        let prior = seqs.move_selection_if_gap_is_present(-2);
        assert_eq!(prior.len(), 1);
        assert_eq!(bases(&seqs), vec!["-AC--"]);
        assert!(seqs.restore(prior));
        assert_eq!(bases(&seqs), vec!["---AC"]);
    }

    #[test]
    fn test_insert_and_delete_gap() {
        let mut seqs = list(&[("a", "ACGT"), ("b", "ACGT")]);
        seqs.get_mut(0).unwrap().set_selected(2, true);
        let prior = seqs.insert_gap_left_of_selected_base();
        assert_eq!(prior.len(), 1);
        assert_eq!(bases(&seqs), vec!["AC-GT", "ACGT"]);
        seqs.right_pad_with_gap_until_equal_length();
        assert_eq!(bases(&seqs), vec!["AC-GT", "ACGT-"]);

        let prior = seqs.delete_gap_move_left();
        assert_eq!(prior.len(), 1);
        assert_eq!(seqs.get(0).unwrap().as_string(), "ACGT");
    }

    #[test]
    fn test_merge_conflict_leaves_rows_unchanged() {
        let mut seqs = list(&[("a", "AC--"), ("b", "-CGT")]);
        let before = bases(&seqs);
        assert!(!seqs.merge_two_sequences(0, 1, false));
        assert_eq!(bases(&seqs), before);

        assert!(seqs.merge_two_sequences(0, 1, true));
        assert_eq!(bases(&seqs), vec!["ACGT"]);
        assert_eq!(seqs.get(0).unwrap().name, "a");
    }

    #[test]
    fn test_merge_without_overlap() {
        let mut seqs = list(&[("a", "AC--"), ("b", "--GT"), ("c", "TTTT")]);
        assert!(seqs.merge_two_sequences(0, 1, false));
        assert_eq!(bases(&seqs), vec!["ACGT", "TTTT"]);
        assert!(!seqs.merge_two_sequences(0, 0, false));
        assert!(!seqs.merge_two_sequences(0, 9, false));
    }

    #[test]
    fn test_selected_bases_edits() {
        let mut seqs = list(&[("a", "ACGT"), ("b", "ACGT")]);
        seqs.get_mut(1).unwrap().set_selected_range(1..3, true);
        let prior = seqs.replace_selected_bases_with_gap();
        assert_eq!(prior.len(), 1);
        assert_eq!(bases(&seqs), vec!["ACGT", "A--T"]);

        assert!(seqs.replace_selected_with_char(b'N'));
        assert_eq!(seqs.get(1).unwrap().as_string(), "ANNT");

        let prior = seqs.delete_selected_bases();
        assert_eq!(prior.len(), 1);
        assert_eq!(seqs.get(1).unwrap().as_string(), "AT");
    }

    #[test]
    fn test_delete_empty_and_all_gaps() {
        let mut seqs = list(&[("a", "A-C"), ("b", "---"), ("c", "")]);
        let removed = seqs.delete_empty_sequences();
        assert_eq!(removed.len(), 2);
        assert!(seqs.delete_all_gaps());
        assert_eq!(bases(&seqs), vec!["AC"]);
    }

    #[test]
    fn test_insert_gap_columns() {
        let mut seqs = list(&[("a", "ACGT"), ("b", "TTAA")]);
        seqs.set_selection_at(2, 0, true);
        seqs.insert_gap_columns(1, 2);
        assert_eq!(bases(&seqs), vec!["A--CGT", "T--TAA"]);
        assert!(seqs.get(0).unwrap().is_selected(4));
        assert!(!seqs.get(0).unwrap().is_selected(2));
    }

    #[test]
    fn test_reverse_complement() {
        let mut seqs = list(&[("a", "AACG")]);
        assert!(seqs.reverse_complement());
        assert_eq!(bases(&seqs), vec!["CGTT"]);
        assert!(seqs.complement());
        assert_eq!(bases(&seqs), vec!["GCAA"]);
    }

    #[test]
    fn test_realign_from_aa_template() {
        let mut nuc = list(&[("a", "ATGGCCTAA"), ("b", "ATG---GCC")]);
        let aa = list(&[("a", "M-A*"), ("b", "MA-")]);
        assert!(nuc.realign_nucleotides_from_aa_template(&aa));
        assert_eq!(bases(&nuc), vec!["ATG---GCCTAA", "ATGGCC---"]);
    }
}
