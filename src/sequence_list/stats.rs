//! Column statistics: consensus, histograms, duplicates and charset
//! summaries.

use std::collections::HashMap;

use super::SequenceList;
use crate::histogram::Histogram;
use crate::meta::CharSet;
use crate::model::SequenceType;
use crate::nucleotide::{self, base_val, char_from_base_val, is_gap, GAP, GAP_SYMBOL};
use crate::translator::Translator;

/// Summary of the columns in one charset.
#[derive(Debug, Clone, PartialEq)]
pub struct CharsetStats {
    pub name: String,
    pub consensus: String,
    /// Columns with a single concrete base.
    pub invariable: usize,
    pub variable: usize,
    /// Gap or `N` cells, counted in rows with at least one residue.
    pub missing: usize,
    pub nonempty_sequences: usize,
}

impl CharsetStats {
    pub fn total(&self) -> usize {
        self.invariable + self.variable
    }

    /// Fraction of the charset's cells that are missing data.
    pub fn missing_fraction(&self) -> f64 {
        let cells = self.total() * self.nonempty_sequences;
        if cells == 0 {
            0.0
        } else {
            self.missing as f64 / cells as f64
        }
    }
}

impl SequenceList {
    /// Consensus of every column.
    ///
    /// Nucleotide columns combine to the most specific IUPAC code; a column
    /// is a gap only when every row has a gap there. Amino acid columns give
    /// the shared residue, `-` when all gaps, `X` otherwise.
    pub fn consensus(&self) -> Vec<u8> {
        let width = self.longest_sequence_length();
        match self.sequence_type() {
            SequenceType::Nucleotide => {
                let mut values = vec![0u8; width];
                for row in self.iter() {
                    for (x, value) in values.iter_mut().enumerate() {
                        *value |= row.base_at(x).map_or(GAP, base_val);
                    }
                }
                values.into_iter().map(char_from_base_val).collect()
            }
            SequenceType::AminoAcid => (0..width)
                .map(|x| {
                    let mut shared = None;
                    for row in self.iter() {
                        let symbol = row.base_at(x).unwrap_or(GAP_SYMBOL).to_ascii_uppercase();
                        if is_gap(symbol) {
                            continue;
                        }
                        match shared {
                            None => shared = Some(symbol),
                            Some(s) if s != symbol => return b'X',
                            Some(_) => {}
                        }
                    }
                    shared.unwrap_or(GAP_SYMBOL)
                })
                .collect(),
        }
    }

    /// Degenerate consensus of the selected cells, one symbol per selected
    /// column, together with those columns.
    pub fn selection_consensus(&self) -> Option<(Vec<usize>, Vec<u8>)> {
        let columns = self.selected_columns();
        if columns.is_empty() {
            return None;
        }
        let consensus = columns
            .iter()
            .map(|&x| {
                let value = self
                    .iter()
                    .filter(|s| s.is_selected(x))
                    .filter_map(|s| s.base_at(x))
                    .fold(0u8, |acc, b| acc | base_val(b));
                char_from_base_val(if value == 0 { GAP } else { value })
            })
            .collect();
        Some((columns, consensus))
    }

    /// Symbol counts per column.
    pub fn histogram(&self) -> Histogram {
        let mut histogram = Histogram::new(self.longest_sequence_length());
        for row in self.iter() {
            histogram.add_row(row.to_bytes());
        }
        histogram
    }

    /// Symbol counts per translated column.
    pub fn translated_histogram(&self, translator: &Translator) -> Histogram {
        let mut histogram = Histogram::new(translator.translated_len());
        for row in self.iter() {
            histogram.add_row(translator.translate(row));
        }
        histogram
    }

    /// Groups of rows with identical ungapped residues (case-insensitive),
    /// in order of first appearance. Rows without residues are ignored.
    pub fn find_duplicates(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
        for row in self.iter() {
            let key = row.residues().to_ascii_uppercase();
            if key.is_empty() {
                continue;
            }
            match index.get(&key) {
                Some(&i) => groups[i].push(row.name.clone()),
                None => {
                    index.insert(key, groups.len());
                    groups.push(vec![row.name.clone()]);
                }
            }
        }
        groups.retain(|g| g.len() > 1);
        groups
    }

    /// Consensus and variability of the columns in `charset`. `N` and gaps
    /// count as missing data and do not enter the consensus.
    pub fn charset_stats(&self, charset: &CharSet) -> CharsetStats {
        let columns: Vec<usize> = charset.columns().positions().collect();
        let mut values = vec![0u8; columns.len()];
        let mut missing = 0;
        let mut nonempty_sequences = 0;

        for row in self.iter() {
            let mut row_missing = 0;
            let mut row_empty = true;
            for (value, &x) in values.iter_mut().zip(&columns) {
                let v = row.base_at(x).map_or(GAP, base_val);
                if v == GAP || v == nucleotide::N {
                    row_missing += 1;
                } else {
                    *value |= v;
                    row_empty = false;
                }
            }
            if !row_empty {
                nonempty_sequences += 1;
                missing += row_missing;
            }
        }

        let invariable = values.iter().filter(|v| v.count_ones() == 1).count();
        CharsetStats {
            name: charset.name.clone(),
            consensus: values
                .iter()
                .map(|&v| char_from_base_val(if v == 0 { GAP } else { v }) as char)
                .collect(),
            invariable,
            variable: values.len() - invariable,
            missing,
            nonempty_sequences,
        }
    }
}
