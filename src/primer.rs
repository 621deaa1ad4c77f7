//! Degenerate primer candidates from a consensus.
//!
//! Melting temperatures use the nearest-neighbour model with the unified
//! SantaLucia (1998) parameters. A degenerate primer's temperature is the
//! average over every concrete oligo it expands to.

use std::cmp::Ordering;
use std::fmt;

use log::debug;

use crate::nucleotide::{self, is_gap};

/// Gas constant in cal/(K mol).
const R: f64 = 1.987;
const KELVIN: f64 = 273.15;

/// Search parameters for [`find_primers`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrimerSettings {
    pub min_len: usize,
    pub max_len: usize,
    pub min_tm: f64,
    pub max_tm: f64,
    pub max_degenerate_fold: u64,
    /// Oligo concentration in nM.
    pub oligo_concentration: f64,
    /// Monovalent salt concentration in mM.
    pub salt_concentration: f64,
}

impl Default for PrimerSettings {
    fn default() -> Self {
        Self {
            min_len: 20,
            max_len: 24,
            min_tm: 52.0,
            max_tm: 58.0,
            max_degenerate_fold: 1000,
            oligo_concentration: 500.0,
            salt_concentration: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primer {
    /// Primer bases, IUPAC codes allowed.
    pub sequence: String,
    /// Alignment column of the first base.
    pub position: usize,
    pub degenerate_fold: u64,
    /// Average nearest-neighbour melting temperature over all expansions.
    pub tm: f64,
    pub min_tm: f64,
    pub max_tm: f64,
}

impl Primer {
    pub fn new(sequence: &[u8], position: usize, settings: &PrimerSettings) -> Self {
        let temps: Vec<f64> = expansions(sequence)
            .iter()
            .map(|oligo| melting_temperature(oligo, settings))
            .collect();
        let tm = if temps.is_empty() {
            0.0
        } else {
            temps.iter().sum::<f64>() / temps.len() as f64
        };
        Self {
            sequence: String::from_utf8_lossy(sequence).into_owned(),
            position,
            degenerate_fold: degenerate_fold(sequence),
            tm,
            min_tm: temps.iter().copied().fold(f64::INFINITY, f64::min),
            max_tm: temps.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Candidates are ranked by fold, then position, then length.
    pub fn rank(&self, other: &Primer) -> Ordering {
        self.degenerate_fold
            .cmp(&other.degenerate_fold)
            .then(self.position.cmp(&other.position))
            .then(self.len().cmp(&other.len()))
    }
}

impl fmt::Display for Primer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{:.1}\t{:.1}-{:.1}",
            self.position + 1,
            self.sequence,
            self.degenerate_fold,
            self.tm,
            self.min_tm,
            self.max_tm
        )
    }
}

/// Number of concrete oligos a degenerate sequence stands for.
pub fn degenerate_fold(sequence: &[u8]) -> u64 {
    sequence
        .iter()
        .map(|&b| nucleotide::degeneracy(b) as u64)
        .fold(1u64, |acc, d| acc.saturating_mul(d))
}

/// Every concrete oligo a degenerate sequence expands to.
pub fn expansions(sequence: &[u8]) -> Vec<Vec<u8>> {
    let mut oligos = vec![Vec::with_capacity(sequence.len())];
    for &b in sequence {
        let bases: Vec<u8> = nucleotide::expand(b).collect();
        if bases.len() == 1 {
            for oligo in oligos.iter_mut() {
                oligo.push(bases[0]);
            }
            continue;
        }
        oligos = oligos
            .into_iter()
            .flat_map(|oligo| {
                bases.iter().map(move |&base| {
                    let mut next = oligo.clone();
                    next.push(base);
                    next
                })
            })
            .collect();
    }
    oligos
}

/// Enthalpy (kcal/mol) and entropy (cal/K/mol) of a nearest-neighbour pair.
fn nn_params(first: u8, second: u8) -> (f64, f64) {
    match (first, second) {
        (b'A', b'A') | (b'T', b'T') => (-7.9, -22.2),
        (b'A', b'T') => (-7.2, -20.4),
        (b'T', b'A') => (-7.2, -21.3),
        (b'C', b'A') | (b'T', b'G') => (-8.5, -22.7),
        (b'G', b'T') | (b'A', b'C') => (-8.4, -22.4),
        (b'C', b'T') | (b'A', b'G') => (-7.8, -21.0),
        (b'G', b'A') | (b'T', b'C') => (-8.2, -22.2),
        (b'C', b'G') => (-10.6, -27.2),
        (b'G', b'C') => (-9.8, -24.4),
        (b'G', b'G') | (b'C', b'C') => (-8.0, -19.9),
        _ => (0.0, 0.0),
    }
}

fn terminal_params(base: u8) -> (f64, f64) {
    match base {
        b'G' | b'C' => (0.1, -2.8),
        _ => (2.3, 4.1),
    }
}

/// Nearest-neighbour melting temperature (°C) of a concrete oligo.
pub fn melting_temperature(oligo: &[u8], settings: &PrimerSettings) -> f64 {
    let bases: Vec<u8> = oligo
        .iter()
        .filter(|&&b| !is_gap(b))
        .map(|b| b.to_ascii_uppercase())
        .collect();
    let (Some(&first), Some(&last)) = (bases.first(), bases.last()) else {
        return 0.0;
    };
    if bases.len() < 2 {
        return 0.0;
    }

    let (mut dh, mut ds) = terminal_params(first);
    let (h, s) = terminal_params(last);
    dh += h;
    ds += s;
    for pair in bases.windows(2) {
        let (h, s) = nn_params(pair[0], pair[1]);
        dh += h;
        ds += s;
    }

    let salt = settings.salt_concentration / 1000.0;
    ds += 0.368 * (bases.len() - 1) as f64 * salt.ln();
    let concentration = settings.oligo_concentration * 1e-9 / 4.0;
    dh * 1000.0 / (ds + R * concentration.ln()) - KELVIN
}

/// Slides every window length in `min_len..=max_len` over `consensus` and
/// keeps the candidates within the fold and temperature limits, ranked.
///
/// `columns[i]` is the alignment column of `consensus[i]`. Gaps are
/// removed from the consensus first; a primer's position is the column of
/// its first symbol.
pub fn find_primers(consensus: &[u8], columns: &[usize], settings: &PrimerSettings) -> Vec<Primer> {
    let (columns, consensus): (Vec<usize>, Vec<u8>) = columns
        .iter()
        .copied()
        .zip(consensus.iter().copied())
        .filter(|&(_, b)| !is_gap(b))
        .unzip();
    let mut primers = Vec::new();
    let mut tested = 0usize;

    for window in settings.min_len.max(1)..=settings.max_len {
        if window > consensus.len() {
            break;
        }
        for (offset, candidate) in consensus.windows(window).enumerate() {
            tested += 1;
            if degenerate_fold(candidate) > settings.max_degenerate_fold {
                continue;
            }
            let primer = Primer::new(candidate, columns[offset], settings);
            if primer.tm >= settings.min_tm && primer.tm <= settings.max_tm {
                primers.push(primer);
            }
        }
    }
    debug!("Tested {} primer candidates, kept {}", tested, primers.len());

    primers.sort_by(Primer::rank);
    primers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_fold() {
        assert_eq!(degenerate_fold(b"ACGT"), 1);
        assert_eq!(degenerate_fold(b"ACRT"), 2);
        assert_eq!(degenerate_fold(b"NNB"), 48);
    }

    #[test]
    fn test_expansions() {
        let oligos = expansions(b"ARY");
        assert_eq!(oligos.len(), 4);
        assert!(oligos.contains(&b"AAC".to_vec()));
        assert!(oligos.contains(&b"AGT".to_vec()));
    }

    #[test]
    fn test_melting_temperature_orders_by_gc() {
        let settings = PrimerSettings::default();
        let at_rich = melting_temperature(b"ATATATATATATATATATAT", &settings);
        let gc_rich = melting_temperature(b"GCGCGCGCGCGCGCGCGCGC", &settings);
        assert!(gc_rich > at_rich);
        let mixed = melting_temperature(b"ACGTTGCAAGCTTGACCTGA", &settings);
        assert!(mixed > 40.0 && mixed < 70.0, "tm was {mixed}");
    }

    #[test]
    fn test_short_oligo_has_no_tm() {
        let settings = PrimerSettings::default();
        assert_eq!(melting_temperature(b"A", &settings), 0.0);
        assert_eq!(melting_temperature(b"", &settings), 0.0);
    }

    #[test]
    fn test_degenerate_primer_tm_is_average() {
        let settings = PrimerSettings::default();
        let primer = Primer::new(b"ACGTTGCAAGCTTGACCTGR", 0, &settings);
        let a = melting_temperature(b"ACGTTGCAAGCTTGACCTGA", &settings);
        let g = melting_temperature(b"ACGTTGCAAGCTTGACCTGG", &settings);
        assert!((primer.tm - (a + g) / 2.0).abs() < 1e-9);
        assert_eq!(primer.degenerate_fold, 2);
        assert!(primer.min_tm <= primer.tm && primer.tm <= primer.max_tm);
    }

    #[test]
    fn test_find_primers_windows_and_ranking() {
        let settings = PrimerSettings {
            min_len: 4,
            max_len: 5,
            min_tm: f64::NEG_INFINITY,
            max_tm: f64::INFINITY,
            max_degenerate_fold: 2,
            ..PrimerSettings::default()
        };
        let columns: Vec<usize> = (10..18).collect();
        let primers = find_primers(b"ACG-TRNA", &columns, &settings);
        // Consensus without gaps is ACGTRNA. Windows containing N exceed the fold.
        let found: Vec<(&str, usize)> = primers
            .iter()
            .map(|p| (p.sequence.as_str(), p.position))
            .collect();
        assert_eq!(found, vec![("ACGT", 10), ("ACGTR", 10), ("CGTR", 11)]);
    }

    #[test]
    fn test_find_primers_short_consensus() {
        let primers = find_primers(b"ACGT", &[0, 1, 2, 3], &PrimerSettings::default());
        assert!(primers.is_empty());
    }

    #[test]
    fn test_find_primers_positions_follow_columns() {
        let settings = PrimerSettings {
            min_len: 4,
            max_len: 4,
            min_tm: f64::NEG_INFINITY,
            max_tm: f64::INFINITY,
            ..PrimerSettings::default()
        };
        let primers = find_primers(b"AC-GTAC", &[3, 4, 5, 9, 10, 11, 12], &settings);
        let mut found: Vec<(&str, usize)> = primers
            .iter()
            .map(|p| (p.sequence.as_str(), p.position))
            .collect();
        found.sort();
        assert_eq!(found, vec![("ACGT", 3), ("CGTA", 4), ("GTAC", 9)]);
    }
}
