use super::range::ColumnRange;
use super::ColumnMask;

/// A named, possibly non-contiguous set of alignment columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    pub name: String,
    columns: ColumnMask,
}

impl CharSet {
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            columns: ColumnMask::new(width),
        }
    }

    pub fn from_ranges(name: impl Into<String>, width: usize, ranges: &[ColumnRange]) -> Self {
        let mut charset = Self::new(name, width);
        for range in ranges {
            charset.add_range(range);
        }
        charset
    }

    pub fn add_range(&mut self, range: &ColumnRange) {
        self.columns.set_range(range, true);
    }

    pub fn add_position(&mut self, x: usize) {
        self.columns.set(x, true);
    }

    pub fn is_position_included(&self, x: usize) -> bool {
        self.columns.get(x)
    }

    pub fn columns(&self) -> &ColumnMask {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut ColumnMask {
        &mut self.columns
    }

    pub fn as_ranges(&self) -> Vec<ColumnRange> {
        self.columns.as_ranges()
    }

    pub fn len(&self) -> usize {
        self.columns.count()
    }

    pub fn is_empty(&self) -> bool {
        !self.columns.any()
    }
}
