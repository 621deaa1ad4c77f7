//! Find-next over names and residues.
//!
//! The list keeps a cursor so that repeated calls with the same request walk
//! through successive matches. When a search runs off the end of the list
//! the cursor is reset and nothing is returned; the next call starts over
//! from the top.

use regex::bytes::{Match, Regex, RegexBuilder};

use super::{EditError, SequenceList};
use crate::nucleotide::is_gap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FindTarget {
    #[default]
    Names,
    Sequences,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRequest {
    pub pattern: String,
    pub target: FindTarget,
    pub case_sensitive: bool,
    /// Treat `pattern` as a regular expression instead of plain text.
    pub regex: bool,
}

impl FindRequest {
    pub fn names(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            target: FindTarget::Names,
            case_sensitive: false,
            regex: false,
        }
    }

    pub fn sequences(pattern: impl Into<String>) -> Self {
        Self {
            target: FindTarget::Sequences,
            ..Self::names(pattern)
        }
    }

    fn compile(&self) -> Result<Regex, EditError> {
        let pattern = if self.regex {
            self.pattern.clone()
        } else {
            regex::escape(&self.pattern)
        };
        RegexBuilder::new(&pattern)
            .case_insensitive(!self.case_sensitive)
            .build()
            .map_err(|e| EditError::InvalidPattern(e.to_string()))
    }
}

/// Where the next search starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindCursor {
    pub next_sequence: usize,
    /// Residue index (gaps not counted) within `next_sequence`.
    pub next_start_pos: usize,
}

/// A hit: row `row`, grid columns `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindMatch {
    pub row: usize,
    pub start: usize,
    pub end: usize,
}

impl SequenceList {
    /// Dispatches on the request target.
    pub fn find(&mut self, request: &FindRequest) -> Result<Option<FindMatch>, EditError> {
        match request.target {
            FindTarget::Names => self.find_in_names(request),
            FindTarget::Sequences => self.find_and_select(request),
        }
    }

    /// Finds the next row whose name matches and selects it entirely.
    pub fn find_in_names(&mut self, request: &FindRequest) -> Result<Option<FindMatch>, EditError> {
        let re = request.compile()?;
        let start = self.find_cursor().next_sequence;
        let hit = self
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, s)| re.is_match(s.name.as_bytes()))
            .map(|(y, s)| FindMatch {
                row: y,
                start: 0,
                end: s.len().saturating_sub(1),
            });

        match hit {
            Some(found) => {
                self.select_rows(&[found.row]);
                *self.find_cursor_mut() = FindCursor {
                    next_sequence: found.row + 1,
                    next_start_pos: 0,
                };
                Ok(Some(found))
            }
            None => {
                self.clear_find_cursor();
                Ok(None)
            }
        }
    }

    /// Finds the next occurrence of the pattern in the ungapped residues and
    /// selects the columns it covers.
    pub fn find_and_select(&mut self, request: &FindRequest) -> Result<Option<FindMatch>, EditError> {
        let re = request.compile()?;
        let cursor = self.find_cursor();
        let mut hit = None;

        for (y, row) in self.iter().enumerate().skip(cursor.next_sequence) {
            let columns: Vec<usize> = (0..row.len())
                .filter(|&x| row.base_at(x).is_some_and(|b| !is_gap(b)))
                .collect();
            let residues = row.residues();
            let from = if y == cursor.next_sequence {
                cursor.next_start_pos
            } else {
                0
            };
            if from > residues.len() {
                continue;
            }
            if let Some(m) = first_non_empty_match(&re, &residues, from) {
                hit = Some((y, m.start(), columns[m.start()], columns[m.end() - 1]));
                break;
            }
        }

        match hit {
            Some((row, residue_start, start, end)) => {
                self.clear_selection();
                if let Some(seq) = self.get_mut(row) {
                    for x in start..=end {
                        if seq.base_at(x).is_some_and(|b| !is_gap(b)) {
                            seq.set_selected(x, true);
                        }
                    }
                }
                *self.find_cursor_mut() = FindCursor {
                    next_sequence: row,
                    next_start_pos: residue_start + 1,
                };
                Ok(Some(FindMatch { row, start, end }))
            }
            None => {
                self.clear_find_cursor();
                Ok(None)
            }
        }
    }
}

/// First match at or after `from` that covers at least one residue.
fn first_non_empty_match<'h>(re: &Regex, haystack: &'h [u8], mut from: usize) -> Option<Match<'h>> {
    while from <= haystack.len() {
        let m = re.find_at(haystack, from)?;
        if !m.is_empty() {
            return Some(m);
        }
        from = m.end() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::tests::list;
    use super::*;

    #[test]
    fn test_find_in_names_walks_matches() {
        let mut seqs = list(&[("Homo", "A"), ("Pan", "C"), ("homolog", "G")]);
        let request = FindRequest::names("HOMO");

        let first = seqs.find_in_names(&request).unwrap().unwrap();
        assert_eq!(first.row, 0);
        assert!(seqs.get(0).unwrap().is_fully_selected());

        let second = seqs.find_in_names(&request).unwrap().unwrap();
        assert_eq!(second.row, 2);
        assert!(!seqs.get(0).unwrap().has_selection());

        assert_eq!(seqs.find_in_names(&request).unwrap(), None);
        assert_eq!(seqs.find_cursor(), FindCursor::default());
        assert_eq!(seqs.find_in_names(&request).unwrap().unwrap().row, 0);
    }

    #[test]
    fn test_case_sensitive_names() {
        let mut seqs = list(&[("Homo", "A"), ("homolog", "G")]);
        let request = FindRequest {
            case_sensitive: true,
            ..FindRequest::names("homo")
        };
        assert_eq!(seqs.find_in_names(&request).unwrap().unwrap().row, 1);
    }

    #[test]
    fn test_find_in_sequences_skips_gaps() {
        let mut seqs = list(&[("a", "TTTT"), ("b", "AC-GTAC-G")]);
        let request = FindRequest::sequences("cg");

        let first = seqs.find_and_select(&request).unwrap().unwrap();
        assert_eq!(first, FindMatch { row: 1, start: 1, end: 3 });
        assert_eq!(seqs.get(1).unwrap().selected_positions(), vec![1, 3]);

        let second = seqs.find_and_select(&request).unwrap().unwrap();
        assert_eq!(second, FindMatch { row: 1, start: 6, end: 8 });
        assert_eq!(seqs.get(1).unwrap().selected_positions(), vec![6, 8]);

        assert_eq!(seqs.find_and_select(&request).unwrap(), None);
    }

    #[test]
    fn test_regex_find_and_invalid_pattern() {
        let mut seqs = list(&[("a", "AAGGTT")]);
        let request = FindRequest {
            regex: true,
            ..FindRequest::sequences("G+T")
        };
        let hit = seqs.find(&request).unwrap().unwrap();
        assert_eq!((hit.start, hit.end), (2, 4));

        let bad = FindRequest {
            regex: true,
            ..FindRequest::sequences("(")
        };
        assert!(matches!(seqs.find(&bad), Err(EditError::InvalidPattern(_))));
    }

    #[test]
    fn test_regex_skips_empty_matches() {
        let mut seqs = list(&[("a", "CC-AAT"), ("b", "GGA")]);
        let request = FindRequest {
            regex: true,
            ..FindRequest::sequences("A*")
        };
        let first = seqs.find(&request).unwrap().unwrap();
        assert_eq!(first, FindMatch { row: 0, start: 3, end: 4 });
        let second = seqs.find(&request).unwrap().unwrap();
        assert_eq!(second, FindMatch { row: 0, start: 4, end: 4 });
        let third = seqs.find(&request).unwrap().unwrap();
        assert_eq!(third, FindMatch { row: 1, start: 2, end: 2 });
    }

    #[test]
    fn test_literal_pattern_is_escaped() {
        let mut seqs = list(&[("a.b", "A"), ("axb", "C")]);
        let hit = seqs.find(&FindRequest::names("x.b")).unwrap();
        assert_eq!(hit, None);
        let hit = seqs.find(&FindRequest::names("a.b")).unwrap().unwrap();
        assert_eq!(hit.row, 0);
    }
}
