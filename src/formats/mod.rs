//! Alignment file import and export.
//!
//! Supports automatic format detection for:
//! - FASTA (.fasta, .fa, .fna, .faa, .fas)
//! - PHYLIP (.phy, .phylip) - sequential and interleaved
//! - NEXUS (.nex, .nexus, .nxs)
//!
//! Format detection priority:
//! 1. Explicit format specification
//! 2. File extension
//! 3. Content-based detection
//! 4. Every format in turn
//!
//! Column metadata (excludes, charsets, codon positions) is read from the
//! NEXUS blocks of a NEXUS file, or from a `<file>.meta` sidecar holding the
//! same blocks for FASTA and PHYLIP. A metadata failure never fails the
//! import: the alignment gets default metadata and the error is reported
//! alongside it.

pub mod fasta;
pub mod meta_blocks;
pub mod nexus;
pub mod phylip;

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::alignment::Alignment;
use crate::meta::{AlignmentMeta, MetaError};
use crate::model::Sequence;
use nexus::DataType;

/// File formats, including the export-only variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Fasta,
    Phylip,
    Nexus,
    /// NEXUS without metadata blocks.
    NexusSimple,
    /// NEXUS with codon positions written as charsets.
    NexusCodonposCharset,
    FastaTranslatedAminoAcid,
    PhylipTranslatedAminoAcid,
    NexusTranslatedAminoAcid,
}

impl FileFormat {
    /// The format a file written in `self` is read back as.
    pub fn base(self) -> FileFormat {
        match self {
            FileFormat::Fasta | FileFormat::FastaTranslatedAminoAcid => FileFormat::Fasta,
            FileFormat::Phylip | FileFormat::PhylipTranslatedAminoAcid => FileFormat::Phylip,
            FileFormat::Nexus
            | FileFormat::NexusSimple
            | FileFormat::NexusCodonposCharset
            | FileFormat::NexusTranslatedAminoAcid => FileFormat::Nexus,
        }
    }

    pub fn is_translated(self) -> bool {
        matches!(
            self,
            FileFormat::FastaTranslatedAminoAcid
                | FileFormat::PhylipTranslatedAminoAcid
                | FileFormat::NexusTranslatedAminoAcid
        )
    }

    pub fn is_nexus(self) -> bool {
        self.base() == FileFormat::Nexus
    }

    /// Metadata of FASTA and PHYLIP exports goes to a `.meta` sidecar.
    pub fn uses_meta_sidecar(self) -> bool {
        !self.is_nexus()
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Fasta => write!(f, "FASTA"),
            FileFormat::Phylip => write!(f, "PHYLIP"),
            FileFormat::Nexus => write!(f, "NEXUS"),
            FileFormat::NexusSimple => write!(f, "NEXUS (simple)"),
            FileFormat::NexusCodonposCharset => write!(f, "NEXUS (codon position charsets)"),
            FileFormat::FastaTranslatedAminoAcid => write!(f, "FASTA (translated)"),
            FileFormat::PhylipTranslatedAminoAcid => write!(f, "PHYLIP (translated)"),
            FileFormat::NexusTranslatedAminoAcid => write!(f, "NEXUS (translated)"),
        }
    }
}

/// Errors that can occur during file parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Could not determine file format.\n\
             Hint: Use -f/--format to specify the format explicitly:\n  \
             seqedit -f fasta <file>   # FASTA format\n  \
             seqedit -f nexus <file>   # NEXUS format\n  \
             seqedit -f phylip <file>  # PHYLIP format")]
    UnknownFormat,

    #[error("FASTA error: {0}")]
    FastaError(#[from] fasta::FastaError),

    #[error("PHYLIP error: {0}")]
    PhylipError(#[from] phylip::PhylipError),

    #[error("NEXUS error: {0}")]
    NexusError(#[from] nexus::NexusError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while saving.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Only nucleotide alignments can be exported translated")]
    NotNucleotide,

    #[error("Alignment has no file to save to")]
    NoFile,

    #[error("Alignment is still loading")]
    NotLoaded,
}

/// Rows and metadata read from a file.
#[derive(Debug)]
pub struct LoadedFile {
    pub sequences: Vec<Sequence>,
    pub format: FileFormat,
    /// Default metadata when the file has none or it could not be used.
    pub meta: AlignmentMeta,
    pub meta_error: Option<MetaError>,
}

/// An imported alignment. `meta_error` is set when the metadata was
/// rejected and defaults were used instead.
#[derive(Debug)]
pub struct ImportOutcome {
    pub alignment: Alignment,
    pub meta_error: Option<MetaError>,
}

/// Detects format from file extension.
pub fn detect_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FileFormat> {
    let ext = path.as_ref().extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "fa" | "fas" | "fasta" | "fna" | "faa" | "ffn" | "frn" => Some(FileFormat::Fasta),
        "nex" | "nexus" | "nxs" => Some(FileFormat::Nexus),
        "phy" | "phylip" | "ph" => Some(FileFormat::Phylip),
        _ => None,
    }
}

/// Detects the file format by examining the content.
pub fn detect_format_from_content(content: &str) -> Option<FileFormat> {
    let trimmed = content.lines().map(str::trim).find(|line| !line.is_empty())?;

    // NEXUS: starts with #NEXUS (case-insensitive) - most specific
    if trimmed.to_uppercase().starts_with("#NEXUS") {
        return Some(FileFormat::Nexus);
    }

    if trimmed.starts_with('>') {
        return Some(FileFormat::Fasta);
    }

    // PHYLIP: first line is "ntax nchar" (two integers)
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() >= 2 && parts[0].parse::<usize>().is_ok() && parts[1].parse::<usize>().is_ok() {
        return Some(FileFormat::Phylip);
    }

    None
}

/// Parses content with a specific format.
fn parse_content(content: &str, format: FileFormat) -> ParseResult<Vec<Sequence>> {
    match format.base() {
        FileFormat::Phylip => Ok(phylip::parse_phylip_str(content)?),
        FileFormat::Nexus => Ok(nexus::parse_nexus_str(content)?),
        _ => Ok(fasta::parse_fasta_str(content)?),
    }
}

/// Tries to parse with multiple formats, returning the first success.
fn try_parse_formats(content: &str, formats: &[FileFormat]) -> ParseResult<(Vec<Sequence>, FileFormat)> {
    let mut last_error = None;

    for &format in formats {
        match parse_content(content, format) {
            Ok(sequences) => return Ok((sequences, format)),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or(ParseError::UnknownFormat))
}

/// Parses `content`, detecting its format unless `forced` is given. The
/// extension of `path`, if any, is tried before the content.
pub fn parse_text(
    content: &str,
    path: Option<&Path>,
    forced: Option<FileFormat>,
) -> ParseResult<(Vec<Sequence>, FileFormat)> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    if let Some(format) = forced {
        return Ok((parse_content(content, format)?, format.base()));
    }

    if let Some(format) = path.and_then(detect_format_from_extension) {
        match parse_content(content, format) {
            Ok(sequences) => return Ok((sequences, format)),
            Err(e) => debug!("Extension suggested {} but parsing failed: {}", format, e),
        }
    }

    if let Some(format) = detect_format_from_content(content) {
        return Ok((parse_content(content, format)?, format));
    }

    try_parse_formats(content, &[FileFormat::Fasta, FileFormat::Nexus, FileFormat::Phylip])
        .map_err(|_| ParseError::UnknownFormat)
}

/// Reads a whole text file.
pub fn read_text(path: &Path) -> ParseResult<String> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len() as usize;
    if file_size == 0 {
        return Err(ParseError::EmptyFile);
    }

    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut content = String::with_capacity(file_size);
    reader.read_to_string(&mut content)?;
    Ok(content)
}

/// `<file>.meta`, next to the alignment file.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".meta");
    PathBuf::from(name)
}

fn read_sidecar(path: &Path, width: usize) -> Result<Option<AlignmentMeta>, MetaError> {
    let sidecar = sidecar_path(path);
    if !sidecar.is_file() {
        return Ok(None);
    }
    match std::fs::read_to_string(&sidecar) {
        Ok(text) => {
            debug!("Reading metadata from {}", sidecar.display());
            meta_blocks::parse_meta_blocks(&text, width)
        }
        Err(e) => {
            warn!("Could not read {}: {}", sidecar.display(), e);
            Ok(None)
        }
    }
}

/// Falls back to default metadata when none was found or it was rejected.
fn settle_meta(
    meta: Result<Option<AlignmentMeta>, MetaError>,
    width: usize,
) -> (AlignmentMeta, Option<MetaError>) {
    match meta {
        Ok(Some(meta)) => (meta, None),
        Ok(None) => (AlignmentMeta::new(width), None),
        Err(e) => {
            warn!("Ignoring alignment metadata: {}", e);
            (AlignmentMeta::new(width), Some(e))
        }
    }
}

/// Reads rows and metadata from `path`.
pub fn read_alignment(path: &Path, forced: Option<FileFormat>) -> ParseResult<LoadedFile> {
    let content = read_text(path)?;
    let (sequences, format) = parse_text(&content, Some(path), forced)?;
    let width = sequences.iter().map(Sequence::len).max().unwrap_or(0);

    let meta = if format.is_nexus() {
        meta_blocks::parse_meta_blocks(&content, width)
    } else {
        read_sidecar(path, width)
    };
    let (meta, meta_error) = settle_meta(meta, width);

    info!(
        "Read {} sequences ({} columns) as {} from {}",
        sequences.len(),
        width,
        format,
        path.display()
    );
    Ok(LoadedFile {
        sequences,
        format,
        meta,
        meta_error,
    })
}

/// Imports an alignment file.
pub fn import_file(path: impl AsRef<Path>, forced: Option<FileFormat>) -> ParseResult<ImportOutcome> {
    let path = path.as_ref();
    let loaded = read_alignment(path, forced)?;
    let (alignment, meta_error) = Alignment::from_loaded(loaded, Some(path.to_path_buf()));
    Ok(ImportOutcome { alignment, meta_error })
}

/// Imports an alignment from text. NEXUS metadata blocks in the text are
/// honoured; there is no sidecar.
pub fn import_text(content: &str, forced: Option<FileFormat>) -> ParseResult<ImportOutcome> {
    let (sequences, format) = parse_text(content, None, forced)?;
    let width = sequences.iter().map(Sequence::len).max().unwrap_or(0);
    let meta = if format.is_nexus() {
        meta_blocks::parse_meta_blocks(content, width)
    } else {
        Ok(None)
    };
    let (meta, meta_error) = settle_meta(meta, width);
    let loaded = LoadedFile {
        sequences,
        format,
        meta,
        meta_error,
    };
    let (alignment, meta_error) = Alignment::from_loaded(loaded, None);
    Ok(ImportOutcome { alignment, meta_error })
}

/// Writes `alignment` to `out` in `format`. Sidecar metadata is not
/// written; see [`export_alignment`].
pub fn write_alignment<W: Write>(out: &mut W, alignment: &Alignment, format: FileFormat) -> Result<(), SaveError> {
    if format.is_translated() && !alignment.is_nucleotide_alignment() {
        return Err(SaveError::NotNucleotide);
    }
    let sequences = alignment.sequences().as_slice();
    let datatype = DataType::from(alignment.sequence_type());

    match format {
        FileFormat::Fasta => fasta::write_fasta(out, sequences)?,
        FileFormat::Phylip => phylip::write_phylip(out, sequences)?,
        FileFormat::Nexus => {
            nexus::write_nexus(out, sequences, datatype)?;
            meta_blocks::write_meta_blocks(out, alignment.meta())?;
        }
        FileFormat::NexusSimple => nexus::write_nexus(out, sequences, datatype)?,
        FileFormat::NexusCodonposCharset => {
            nexus::write_nexus(out, sequences, DataType::Dna)?;
            meta_blocks::write_excludes_block(out, alignment.meta())?;
            let mut charsets = alignment.meta().charsets().to_vec();
            charsets.extend(meta_blocks::codon_position_charsets(alignment.meta()));
            meta_blocks::write_charsets_block(out, &charsets)?;
        }
        FileFormat::FastaTranslatedAminoAcid => {
            let translator = alignment.translator();
            for seq in sequences {
                writeln!(out, ">{}", seq.name)?;
                translator.write_translation(seq, out)?;
                writeln!(out)?;
            }
        }
        FileFormat::PhylipTranslatedAminoAcid => {
            let translator = alignment.translator();
            phylip::write_phylip_header(out, sequences.len(), translator.translated_len())?;
            for seq in sequences {
                phylip::write_phylip_row(out, &seq.name, &translator.translate(seq))?;
            }
        }
        FileFormat::NexusTranslatedAminoAcid => {
            let translated = alignment.translated_alignment();
            nexus::write_nexus(out, translated.sequences().as_slice(), DataType::Protein)?;
            meta_blocks::write_meta_blocks(out, translated.meta())?;
        }
    }
    Ok(())
}

/// Writes metadata blocks to `<path>.meta`.
pub fn write_sidecar(path: &Path, meta: &AlignmentMeta) -> Result<(), SaveError> {
    let sidecar = sidecar_path(path);
    let mut out = BufWriter::new(File::create(&sidecar)?);
    writeln!(out, "#NEXUS")?;
    writeln!(out)?;
    meta_blocks::write_meta_blocks(&mut out, meta)?;
    out.flush()?;
    debug!("Wrote metadata to {}", sidecar.display());
    Ok(())
}

/// Writes `alignment` to `path` in `format`, plus a `.meta` sidecar for
/// FASTA and PHYLIP output when the metadata carries information.
pub fn export_alignment(alignment: &Alignment, path: &Path, format: FileFormat) -> Result<(), SaveError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_alignment(&mut out, alignment, format)?;
    out.flush()?;

    if format.uses_meta_sidecar() && alignment.meta().is_meta_output_needed() {
        if format.is_translated() {
            write_sidecar(path, &alignment.meta().translated())?;
        } else {
            write_sidecar(path, alignment.meta())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{CharSet, ColumnRange};
    use crate::model::SequenceType;

    #[test]
    fn test_detect_fasta() {
        let content = ">seq1\nACGT\n";
        assert_eq!(detect_format_from_content(content), Some(FileFormat::Fasta));
    }

    #[test]
    fn test_detect_phylip() {
        let content = "  3   10\nseq1      ACGTACGTAC\n";
        assert_eq!(detect_format_from_content(content), Some(FileFormat::Phylip));
    }

    #[test]
    fn test_detect_nexus() {
        let content = "#NEXUS\nBEGIN DATA;\n";
        assert_eq!(detect_format_from_content(content), Some(FileFormat::Nexus));

        // Case insensitive
        let content2 = "#nexus\nbegin data;\n";
        assert_eq!(detect_format_from_content(content2), Some(FileFormat::Nexus));
    }

    #[test]
    fn test_detect_unknown() {
        let content = "This is not a valid sequence file\n";
        assert_eq!(detect_format_from_content(content), None);
    }

    #[test]
    fn test_detect_with_leading_empty_lines() {
        let content = "\n\n  \n>seq1\nACGT\n";
        assert_eq!(detect_format_from_content(content), Some(FileFormat::Fasta));
    }

    #[test]
    fn test_detect_from_extension() {
        assert_eq!(detect_format_from_extension("test.fa"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.fas"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.fasta"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.fna"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.nex"), Some(FileFormat::Nexus));
        assert_eq!(detect_format_from_extension("test.nexus"), Some(FileFormat::Nexus));
        assert_eq!(detect_format_from_extension("test.phy"), Some(FileFormat::Phylip));
        assert_eq!(detect_format_from_extension("test.phylip"), Some(FileFormat::Phylip));
        assert_eq!(detect_format_from_extension("test.txt"), None);
        assert_eq!(detect_format_from_extension("test.aln"), None);
    }

    #[test]
    fn test_sidecar_path_appends_suffix() {
        assert_eq!(sidecar_path(Path::new("/tmp/a.fasta")), PathBuf::from("/tmp/a.fasta.meta"));
    }

    #[test]
    fn test_import_text_detects_format() {
        let outcome = import_text("2 4\na ACGT\nb AC-T\n", None).unwrap();
        assert_eq!(outcome.alignment.file_format(), FileFormat::Phylip);
        assert_eq!(outcome.alignment.len(), 2);
        assert!(outcome.meta_error.is_none());

        assert!(matches!(import_text("  \n", None), Err(ParseError::EmptyFile)));
        assert!(matches!(import_text("hello world\n", None), Err(ParseError::UnknownFormat)));
    }

    #[test]
    fn test_bad_metadata_keeps_alignment() {
        let text = "#NEXUS\nBEGIN DATA;\nDIMENSIONS NTAX=1 NCHAR=4;\nMATRIX\ns ACGT\n;\nEND;\n\
                    BEGIN SETS;\nCHARSET big = 1-40;\nEND;\n";
        let outcome = import_text(text, None).unwrap();
        assert_eq!(outcome.alignment.len(), 1);
        assert_eq!(
            outcome.meta_error,
            Some(MetaError::OutOfBounds {
                position: 40,
                width: 4
            })
        );
        assert_eq!(outcome.alignment.meta(), &AlignmentMeta::new(4));
    }

    fn sample_alignment() -> Alignment {
        let mut alignment = Alignment::new(vec![
            Sequence::new("Homo sapiens", "ATGGCCTTTAAA"),
            Sequence::new("Pan", "ATGGCATTT---"),
        ]);
        let mut meta = AlignmentMeta::new(12);
        meta.exclude_position(9);
        meta.exclude_position(10);
        meta.exclude_position(11);
        meta.add_charset(CharSet::from_ranges("second", 12, &[ColumnRange::new(3, 5)]));
        alignment.set_meta(meta).unwrap();
        alignment
    }

    #[test]
    fn test_nexus_round_trip_with_meta() {
        let alignment = sample_alignment();
        let mut out = Vec::new();
        write_alignment(&mut out, &alignment, FileFormat::Nexus).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("EXSET * UNTITLED = 10-12;"));

        let outcome = import_text(&text, None).unwrap();
        assert!(outcome.meta_error.is_none());
        assert_eq!(outcome.alignment.meta(), alignment.meta());
        assert_eq!(outcome.alignment.sequences().as_slice(), alignment.sequences().as_slice());
    }

    #[test]
    fn test_nexus_simple_has_no_meta_blocks() {
        let mut out = Vec::new();
        write_alignment(&mut out, &sample_alignment(), FileFormat::NexusSimple).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("ASSUMPTIONS"));
        assert!(!text.contains("CHARSET"));
    }

    #[test]
    fn test_nexus_codonpos_charsets() {
        let mut out = Vec::new();
        write_alignment(&mut out, &sample_alignment(), FileFormat::NexusCodonposCharset).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("CHARSET second = 4-6;"));
        assert!(text.contains("CHARSET CodonPos1 = "));
        assert!(!text.contains("CODONPOSSET"));
    }

    #[test]
    fn test_translated_exports() {
        let alignment = sample_alignment();
        let mut out = Vec::new();
        write_alignment(&mut out, &alignment, FileFormat::FastaTranslatedAminoAcid).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">Homo sapiens\nMAF\n>Pan\nMAF\n");

        let mut out = Vec::new();
        write_alignment(&mut out, &alignment, FileFormat::PhylipTranslatedAminoAcid).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("2 3\n"));

        let mut out = Vec::new();
        write_alignment(&mut out, &alignment, FileFormat::NexusTranslatedAminoAcid).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("FORMAT DATATYPE=PROTEIN"));
        assert!(text.contains("CHARSET second = 2;"));
    }

    #[test]
    fn test_translated_export_needs_nucleotides() {
        let alignment = Alignment::new(vec![Sequence::new("p", "MKLWQERTYIPP")]);
        assert_eq!(alignment.sequence_type(), SequenceType::AminoAcid);
        let mut out = Vec::new();
        assert!(matches!(
            write_alignment(&mut out, &alignment, FileFormat::FastaTranslatedAminoAcid),
            Err(SaveError::NotNucleotide)
        ));
    }

    #[test]
    fn test_fasta_export_writes_sidecar_and_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aln.fasta");
        let alignment = sample_alignment();

        export_alignment(&alignment, &path, FileFormat::Fasta).unwrap();
        assert!(sidecar_path(&path).is_file());

        let outcome = import_file(&path, None).unwrap();
        assert_eq!(outcome.alignment.file_format(), FileFormat::Fasta);
        assert_eq!(outcome.alignment.meta(), alignment.meta());
        assert_eq!(outcome.alignment.alignment_file(), Some(path.as_path()));
    }

    #[test]
    fn test_default_meta_writes_no_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.phy");
        let alignment = Alignment::new(vec![Sequence::new("a", "ACGT")]);
        export_alignment(&alignment, &path, FileFormat::Phylip).unwrap();
        assert!(!sidecar_path(&path).exists());

        let outcome = import_file(&path, None).unwrap();
        assert_eq!(outcome.alignment.file_format(), FileFormat::Phylip);
        assert_eq!(outcome.alignment.sequences().get(0).unwrap().as_string(), "ACGT");
    }

    #[test]
    fn test_forced_format_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, ">a\nACGT\n").unwrap();
        let loaded = read_alignment(&path, Some(FileFormat::Fasta)).unwrap();
        assert_eq!(loaded.format, FileFormat::Fasta);
        assert!(matches!(
            read_alignment(&path, Some(FileFormat::Phylip)),
            Err(ParseError::PhylipError(_))
        ));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fasta");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(read_alignment(&path, None), Err(ParseError::EmptyFile)));
    }
}
