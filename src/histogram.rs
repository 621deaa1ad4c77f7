//! Per-column symbol counts and a version-keyed memo cell.

use crate::nucleotide::is_gap;

/// Slots per column: `A`..`Z`, gap, anything else.
pub const SLOTS: usize = 28;
pub const GAP_SLOT: usize = 26;
pub const OTHER_SLOT: usize = 27;

fn slot(symbol: u8) -> usize {
    match symbol {
        b'a'..=b'z' => (symbol - b'a') as usize,
        b'A'..=b'Z' => (symbol - b'A') as usize,
        s if is_gap(s) => GAP_SLOT,
        _ => OTHER_SLOT,
    }
}

/// Symbol counts for every column of an alignment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    columns: Vec<[u32; SLOTS]>,
    rows: usize,
}

impl Histogram {
    /// Creates an empty histogram with `width` columns.
    pub fn new(width: usize) -> Self {
        Self {
            columns: vec![[0; SLOTS]; width],
            rows: 0,
        }
    }

    /// Counts one row. Columns past the end of the row count as gaps; the
    /// histogram grows if the row is wider than it.
    pub fn add_row<I>(&mut self, symbols: I)
    where
        I: IntoIterator<Item = u8>,
    {
        let mut len = 0;
        for (x, symbol) in symbols.into_iter().enumerate() {
            if x >= self.columns.len() {
                let mut column = [0; SLOTS];
                column[GAP_SLOT] = self.rows as u32;
                self.columns.push(column);
            }
            self.columns[x][slot(symbol)] += 1;
            len = x + 1;
        }
        for column in self.columns.iter_mut().skip(len) {
            column[GAP_SLOT] += 1;
        }
        self.rows += 1;
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows counted.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, x: usize) -> Option<&[u32; SLOTS]> {
        self.columns.get(x)
    }

    /// Occurrences of `symbol` (case-insensitive) in column `x`.
    pub fn count(&self, x: usize, symbol: u8) -> u32 {
        self.columns.get(x).map_or(0, |c| c[slot(symbol)])
    }

    pub fn gap_count(&self, x: usize) -> u32 {
        self.columns.get(x).map_or(0, |c| c[GAP_SLOT])
    }

    /// Non-gap symbols in column `x`.
    pub fn residue_count(&self, x: usize) -> u32 {
        self.columns
            .get(x)
            .map_or(0, |c| c.iter().sum::<u32>() - c[GAP_SLOT])
    }

    /// Most frequent letter in column `x`; ties go to the earlier letter.
    pub fn most_common(&self, x: usize) -> Option<u8> {
        let column = self.columns.get(x)?;
        let (index, &count) = column[..26]
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))?;
        (count > 0).then_some(b'A' + index as u8)
    }

    /// Fraction of rows holding `symbol` in column `x`.
    pub fn frequency(&self, x: usize, symbol: u8) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        self.count(x, symbol) as f64 / self.rows as f64
    }

    /// Distinct non-gap symbols in column `x`.
    pub fn distinct_residues(&self, x: usize) -> usize {
        self.columns.get(x).map_or(0, |c| {
            c.iter()
                .enumerate()
                .filter(|&(i, &n)| i != GAP_SLOT && n > 0)
                .count()
        })
    }

    /// True when column `x` holds more than one distinct residue.
    pub fn is_variable(&self, x: usize) -> bool {
        self.distinct_residues(x) > 1
    }
}

/// A cached value tagged with the content version it was computed from.
#[derive(Debug, Clone, Default)]
pub struct Memo<T> {
    cached: Option<(u64, T)>,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Returns the cached value if it was computed at `version`, computing
    /// and storing it otherwise.
    pub fn get_or_compute<F>(&mut self, version: u64, compute: F) -> &T
    where
        F: FnOnce() -> T,
    {
        let stale = !matches!(self.cached, Some((v, _)) if v == version);
        if stale {
            self.cached = None;
        }
        let (_, value) = self.cached.get_or_insert_with(|| (version, compute()));
        value
    }

    pub fn is_fresh(&self, version: u64) -> bool {
        matches!(self.cached, Some((v, _)) if v == version)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
