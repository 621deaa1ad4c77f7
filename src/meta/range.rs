//! NEXUS-style column ranges.
//!
//! Internally ranges are 0-based and inclusive. Their textual form is the
//! NEXUS one: 1-based, inclusive, `a`, `a-b`, `a-b\s` (every `s`-th column)
//! or `a-.` (to the last column).

use std::fmt;

use super::MetaError;

/// An inclusive, 0-based range of alignment columns with a stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl ColumnRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self::with_step(start, end, 1)
    }

    pub fn with_step(start: usize, end: usize, step: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
            step: step.max(1),
        }
    }

    pub fn single(x: usize) -> Self {
        Self::new(x, x)
    }

    /// Columns covered by the range.
    pub fn positions(&self) -> impl Iterator<Item = usize> {
        (self.start..=self.end).step_by(self.step)
    }

    pub fn contains(&self, x: usize) -> bool {
        x >= self.start && x <= self.end && (x - self.start) % self.step == 0
    }

    /// Groups sorted, distinct positions into runs with the given stride.
    ///
    /// With `stride == 3`, `[0, 3, 6, 7]` becomes `1-7\3 8`.
    pub fn compress(positions: &[usize], stride: usize) -> Vec<ColumnRange> {
        let stride = stride.max(1);
        let mut ranges = Vec::new();
        let mut iter = positions.iter().copied();
        let Some(first) = iter.next() else {
            return ranges;
        };
        let (mut start, mut end) = (first, first);
        for x in iter {
            if x == end + stride {
                end = x;
            } else {
                ranges.push(ColumnRange::with_step(start, end, stride));
                start = x;
                end = x;
            }
        }
        ranges.push(ColumnRange::with_step(start, end, stride));
        ranges
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start + 1)
        } else if self.step == 1 {
            write!(f, "{}-{}", self.start + 1, self.end + 1)
        } else {
            write!(f, "{}-{}\\{}", self.start + 1, self.end + 1, self.step)
        }
    }
}

/// Formats ranges as a space separated NEXUS range list.
pub fn format_range_list(ranges: &[ColumnRange]) -> String {
    ranges
        .iter()
        .map(ColumnRange::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a NEXUS range list such as `1-10 15 20-.\3`.
///
/// `width` is the alignment width; it resolves `.` and bounds every range.
pub fn parse_range_list(text: &str, width: usize) -> Result<Vec<ColumnRange>, MetaError> {
    let spaced = text.replace('-', " - ").replace('\\', " \\ ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    let mut ranges = Vec::new();
    let mut i = 0;

    let position = |token: &str| -> Result<usize, MetaError> {
        if token == "." {
            return width
                .checked_sub(1)
                .ok_or_else(|| MetaError::InvalidRange(text.trim().to_string()));
        }
        let value: usize = token
            .parse()
            .map_err(|_| MetaError::InvalidRange(text.trim().to_string()))?;
        if value == 0 {
            return Err(MetaError::InvalidRange(text.trim().to_string()));
        }
        if value > width {
            return Err(MetaError::OutOfBounds {
                position: value,
                width,
            });
        }
        Ok(value - 1)
    };

    while i < tokens.len() {
        let start = position(tokens[i])?;
        i += 1;
        let mut end = start;
        let mut step = 1;
        if tokens.get(i) == Some(&"-") {
            let token = tokens
                .get(i + 1)
                .ok_or_else(|| MetaError::InvalidRange(text.trim().to_string()))?;
            end = position(token)?;
            i += 2;
            if tokens.get(i) == Some(&"\\") {
                let token = tokens
                    .get(i + 1)
                    .ok_or_else(|| MetaError::InvalidRange(text.trim().to_string()))?;
                step = token
                    .parse()
                    .ok()
                    .filter(|&s: &usize| s > 0)
                    .ok_or_else(|| MetaError::InvalidRange(text.trim().to_string()))?;
                i += 2;
            }
        }
        if end < start {
            return Err(MetaError::InvalidRange(text.trim().to_string()));
        }
        ranges.push(ColumnRange::with_step(start, end, step));
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(ColumnRange::single(0).to_string(), "1");
        assert_eq!(ColumnRange::new(0, 9).to_string(), "1-10");
        assert_eq!(ColumnRange::with_step(0, 9, 3).to_string(), "1-10\\3");
    }

    #[test]
    fn test_compress_with_stride() {
        let ranges = ColumnRange::compress(&[0, 3, 6, 7], 3);
        assert_eq!(format_range_list(&ranges), "1-7\\3 8");
        let ranges = ColumnRange::compress(&[1, 2, 3, 5], 1);
        assert_eq!(format_range_list(&ranges), "2-4 6");
        assert!(ColumnRange::compress(&[], 1).is_empty());
    }

    #[test]
    fn test_parse_range_list() {
        let ranges = parse_range_list("1-3 7 10-.\\2", 14).unwrap();
        assert_eq!(
            ranges,
            vec![
                ColumnRange::new(0, 2),
                ColumnRange::single(6),
                ColumnRange::with_step(9, 13, 2),
            ]
        );
        let positions: Vec<usize> = ranges[2].positions().collect();
        assert_eq!(positions, vec![9, 11, 13]);
    }

    #[test]
    fn test_parse_tolerates_spaces_around_dash() {
        let ranges = parse_range_list("2 - 4", 10).unwrap();
        assert_eq!(ranges, vec![ColumnRange::new(1, 3)]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_range_list("0-3", 10),
            Err(MetaError::InvalidRange(_))
        ));
        assert!(matches!(
            parse_range_list("5-11", 10),
            Err(MetaError::OutOfBounds { position: 11, width: 10 })
        ));
        assert!(matches!(
            parse_range_list("abc", 10),
            Err(MetaError::InvalidRange(_))
        ));
        assert!(matches!(
            parse_range_list("8-3", 10),
            Err(MetaError::InvalidRange(_))
        ));
    }
}
