//! IUPAC nucleotide bitmask encoding.
//!
//! Each concrete base owns one bit, ambiguity codes are the OR of the bases
//! they stand for, and the gap owns a bit of its own. Combining columns with
//! a bitwise OR therefore yields the most specific ambiguity code covering
//! every residue in the column:
//!
//! ```
//! use seqedit::nucleotide::{base_val, char_from_base_val};
//!
//! let column = base_val(b'C') | base_val(b'G');
//! assert_eq!(char_from_base_val(column), b'S');
//! ```

/// Adenine.
pub const A: u8 = 0b0000_0001;
/// Cytosine.
pub const C: u8 = 0b0000_0010;
/// Guanine.
pub const G: u8 = 0b0000_0100;
/// Thymine (and uracil).
pub const T: u8 = 0b0000_1000;
/// Any base. Unknown symbols decode to this value as well.
pub const N: u8 = A | C | G | T;
/// Alignment gap. Deliberately outside the base bits so an all-gap column
/// never collapses into `N`.
pub const GAP: u8 = 0b0001_0000;

/// The gap symbol written by every edit operation.
pub const GAP_SYMBOL: u8 = b'-';

/// Returns true for the gap symbols accepted on input (`-` and `.`).
#[inline]
pub fn is_gap(base: u8) -> bool {
    base == b'-' || base == b'.'
}

/// Encodes a residue symbol. Case-insensitive; `U` is treated as `T`.
/// Anything that is not a nucleotide or gap symbol encodes as `N`.
pub fn base_val(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => A,
        b'C' => C,
        b'G' => G,
        b'T' | b'U' => T,
        b'R' => A | G,
        b'Y' => C | T,
        b'S' => C | G,
        b'W' => A | T,
        b'K' => G | T,
        b'M' => A | C,
        b'B' => C | G | T,
        b'D' => A | G | T,
        b'H' => A | C | T,
        b'V' => A | C | G,
        b'-' | b'.' => GAP,
        _ => N,
    }
}

/// Decodes a bitmask back into an upper-case IUPAC symbol.
///
/// A value that is exactly [`GAP`] decodes to `-`. When the gap bit is mixed
/// with base bits the gap is ignored, so a column is only a gap when every
/// contributing residue was a gap.
pub fn char_from_base_val(val: u8) -> u8 {
    if val == GAP {
        return GAP_SYMBOL;
    }
    match val & N {
        x if x == A => b'A',
        x if x == C => b'C',
        x if x == G => b'G',
        x if x == T => b'T',
        x if x == A | G => b'R',
        x if x == C | T => b'Y',
        x if x == C | G => b'S',
        x if x == A | T => b'W',
        x if x == G | T => b'K',
        x if x == A | C => b'M',
        x if x == C | G | T => b'B',
        x if x == A | G | T => b'D',
        x if x == A | C | T => b'H',
        x if x == A | C | G => b'V',
        _ => b'N',
    }
}

/// Number of concrete bases a symbol stands for (1 for `A`, 4 for `N`).
/// Gaps count as 1 so they never inflate a degeneracy product.
pub fn degeneracy(base: u8) -> u32 {
    let bits = base_val(base) & N;
    if bits == 0 {
        1
    } else {
        bits.count_ones()
    }
}

/// Expands a symbol into the concrete bases it represents, in `ACGT` order.
pub fn expand(base: u8) -> impl Iterator<Item = u8> {
    let bits = base_val(base) & N;
    [(A, b'A'), (C, b'C'), (G, b'G'), (T, b'T')]
        .into_iter()
        .filter(move |(bit, _)| bits & bit != 0)
        .map(|(_, symbol)| symbol)
}

/// Watson-Crick complement preserving case. Ambiguity codes map to their
/// complementary code; gaps and unknown symbols are returned unchanged.
pub fn complement(base: u8) -> u8 {
    let upper = match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' => b'A',
        b'U' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        other => other,
    };
    if base.is_ascii_lowercase() {
        upper.to_ascii_lowercase()
    } else {
        upper
    }
}

/// Returns true for symbols that belong to the nucleotide alphabet
/// (IUPAC codes, `U`, gaps and `?`).
pub fn is_nucleotide_symbol(base: u8) -> bool {
    matches!(
        base.to_ascii_uppercase(),
        b'A' | b'C'
            | b'G'
            | b'T'
            | b'U'
            | b'R'
            | b'Y'
            | b'S'
            | b'W'
            | b'K'
            | b'M'
            | b'B'
            | b'D'
            | b'H'
            | b'V'
            | b'N'
            | b'-'
            | b'.'
            | b'?'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_of_two_bases_is_ambiguity_code() {
        assert_eq!(char_from_base_val(base_val(b'A') | base_val(b'G')), b'R');
        assert_eq!(char_from_base_val(base_val(b'C') | base_val(b'T')), b'Y');
        assert_eq!(
            char_from_base_val(base_val(b'A') | base_val(b'C') | base_val(b'G')),
            b'V'
        );
    }

    #[test]
    fn test_gap_only_dominates_when_alone() {
        assert_eq!(char_from_base_val(GAP), b'-');
        assert_eq!(char_from_base_val(GAP | base_val(b'A')), b'A');
        assert_ne!(GAP, N);
    }

    #[test]
    fn test_unknown_symbols_are_n() {
        assert_eq!(base_val(b'?'), N);
        assert_eq!(base_val(b'X'), N);
        assert_eq!(char_from_base_val(N), b'N');
    }

    #[test]
    fn test_degeneracy() {
        assert_eq!(degeneracy(b'A'), 1);
        assert_eq!(degeneracy(b'R'), 2);
        assert_eq!(degeneracy(b'B'), 3);
        assert_eq!(degeneracy(b'N'), 4);
        assert_eq!(degeneracy(b'-'), 1);
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand(b'Y').collect::<Vec<_>>(), vec![b'C', b'T']);
        assert_eq!(expand(b'a').collect::<Vec<_>>(), vec![b'A']);
    }

    #[test]
    fn test_complement_keeps_case() {
        assert_eq!(complement(b'A'), b'T');
        assert_eq!(complement(b'g'), b'c');
        assert_eq!(complement(b'R'), b'Y');
        assert_eq!(complement(b'-'), b'-');
        assert_eq!(complement(b'N'), b'N');
    }
}
