//! Genetic code definitions and codon translation.
//!
//! This module provides:
//! - NCBI genetic code tables (1-33)
//! - Codon to amino acid translation, including IUPAC ambiguity codes
//!
//! A codon containing ambiguity codes translates to a definite amino acid
//! only when every concrete codon it expands to agrees; otherwise it
//! translates to `X`.

use std::fmt;

use crate::nucleotide::{self, is_gap};

/// Amino acid produced for untranslatable codons.
pub const UNKNOWN_AA: u8 = b'X';
/// Amino acid produced for an all-gap codon.
pub const GAP_AA: u8 = b'-';

/// NCBI tables: id, name and the 64 amino acids in `TCAG` codon order.
const NCBI_TABLES: &[(u8, &str, &[u8; 64])] = &[
    (1, "Standard",
        b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (2, "Vertebrate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG"),
    (3, "Yeast Mitochondrial",
        b"FFLLSSSSYY**CCWWTTTTPPPPHHQQRRRRIIMMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (4, "Mold/Protozoan/Coelenterate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (5, "Invertebrate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSSSVVVVAAAADDEEGGGG"),
    (6, "Ciliate/Dasycladacean/Hexamita Nuclear",
        b"FFLLSSSSYYQQCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (9, "Echinoderm/Flatworm Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG"),
    (10, "Euplotid Nuclear",
        b"FFLLSSSSYY**CCCWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (11, "Bacterial/Archaeal/Plant Plastid",
        b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (12, "Alternative Yeast Nuclear",
        b"FFLLSSSSYY**CC*WLLLSPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (13, "Ascidian Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSGGVVVVAAAADDEEGGGG"),
    (14, "Alternative Flatworm Mitochondrial",
        b"FFLLSSSSYYY*CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG"),
    (15, "Blepharisma Macronuclear",
        b"FFLLSSSSYY*QCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (16, "Chlorophycean Mitochondrial",
        b"FFLLSSSSYY*LCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (21, "Trematode Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNNKSSSSVVVVAAAADDEEGGGG"),
    (22, "Scenedesmus obliquus Mitochondrial",
        b"FFLLSS*SYY*LCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (23, "Thraustochytrium Mitochondrial",
        b"FF*LSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (24, "Rhabdopleuridae Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSSKVVVVAAAADDEEGGGG"),
    (25, "Candidate Division SR1/Gracilibacteria",
        b"FFLLSSSSYY**CCGWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (26, "Pachysolen tannophilus Nuclear",
        b"FFLLSSSSYY**CC*WLLLAPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (27, "Karyorelict Nuclear",
        b"FFLLSSSSYYQQCCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (28, "Condylostoma Nuclear",
        b"FFLLSSSSYYQQCCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (29, "Mesodinium Nuclear",
        b"FFLLSSSSYYYYCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (30, "Peritrich Nuclear",
        b"FFLLSSSSYYEECC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (31, "Blastocrithidia Nuclear",
        b"FFLLSSSSYYEECCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (32, "Balanophoraceae Plastid",
        b"FFLLSSSSYY*WCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG"),
    (33, "Cephalodiscidae Mitochondrial",
        b"FFLLSSSSYYY*CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSSKVVVVAAAADDEEGGGG"),
];

/// A genetic code table for translating codons to amino acids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneticCode {
    /// NCBI genetic code ID
    pub id: u8,
    pub name: &'static str,
    table: &'static [u8; 64],
}

impl GeneticCode {
    /// The standard code (NCBI table 1).
    pub fn standard() -> Self {
        let (id, name, table) = NCBI_TABLES[0];
        Self { id, name, table }
    }

    /// Looks up an NCBI table by its id.
    pub fn from_id(id: u8) -> Option<Self> {
        NCBI_TABLES
            .iter()
            .find(|(table_id, _, _)| *table_id == id)
            .map(|&(id, name, table)| Self { id, name, table })
    }

    /// Translates three concrete bases. Returns `None` if any base is not
    /// one of `ACGTU`.
    fn lookup(&self, codon: [u8; 3]) -> Option<u8> {
        let mut index = 0usize;
        for b in codon {
            let digit = match b.to_ascii_uppercase() {
                b'T' | b'U' => 0,
                b'C' => 1,
                b'A' => 2,
                b'G' => 3,
                _ => return None,
            };
            index = index * 4 + digit;
        }
        Some(self.table[index])
    }

    /// Translates a single codon to an amino acid.
    ///
    /// - `---` translates to `-`
    /// - a codon mixing gaps and residues translates to `X`
    /// - ambiguity codes translate to the shared amino acid of all their
    ///   expansions, or `X` when the expansions disagree
    pub fn translate_codon(&self, codon: [u8; 3]) -> u8 {
        let gaps = codon.iter().filter(|&&b| is_gap(b)).count();
        if gaps == 3 {
            return GAP_AA;
        }
        if gaps > 0 {
            return UNKNOWN_AA;
        }
        if let Some(aa) = self.lookup(codon) {
            return aa;
        }

        let mut agreed = None;
        for b1 in nucleotide::expand(codon[0]) {
            for b2 in nucleotide::expand(codon[1]) {
                for b3 in nucleotide::expand(codon[2]) {
                    let Some(aa) = self.lookup([b1, b2, b3]) else {
                        return UNKNOWN_AA;
                    };
                    match agreed {
                        None => agreed = Some(aa),
                        Some(previous) if previous != aa => return UNKNOWN_AA,
                        Some(_) => {}
                    }
                }
            }
        }
        agreed.unwrap_or(UNKNOWN_AA)
    }
}

impl Default for GeneticCode {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for GeneticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.id, self.name)
    }
}

/// All available genetic codes from NCBI.
pub struct GeneticCodes;

impl GeneticCodes {
    pub fn all() -> impl Iterator<Item = GeneticCode> {
        NCBI_TABLES
            .iter()
            .map(|&(id, name, table)| GeneticCode { id, name, table })
    }

    pub fn ids() -> impl Iterator<Item = u8> {
        NCBI_TABLES.iter().map(|(id, _, _)| *id)
    }
}
