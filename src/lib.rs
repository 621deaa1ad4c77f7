//! # seqedit - Alignment Editing Engine
//!
//! The data layer of a multiple sequence alignment editor: rows with
//! selection, gap-aware edits with undo, column metadata (excludes, codon
//! positions, charsets), translation, consensus, primer search and
//! FASTA/PHYLIP/NEXUS round trips.
//!
//! ## Architecture
//!
//! - `model`: a single row (`Sequence`) and the sequence type
//! - `nucleotide`: IUPAC bitmask encoding, complements and consensus symbols
//! - `sequence_list`: the ordered rows with selection, find and edits
//! - `meta`: excludes, codon positions, charsets and range lists
//! - `genetic_code` / `translator`: codon tables and row translation
//! - `histogram`: per-column residue counts with version-keyed caching
//! - `primer`: degenerate primer search over a consensus
//! - `events`: change notifications for observers
//! - `alignment`: the façade tying rows and metadata together
//! - `formats`: file detection, import and export

pub mod alignment;
pub mod events;
pub mod formats;
pub mod genetic_code;
pub mod histogram;
pub mod meta;
pub mod model;
pub mod nucleotide;
pub mod primer;
pub mod sequence_list;
pub mod translator;

pub use alignment::{Alignment, LoadStatus};
pub use formats::{FileFormat, ImportOutcome};
pub use model::{Sequence, SequenceType};
