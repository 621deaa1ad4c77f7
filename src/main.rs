//! seqedit - Alignment conversion and batch editing
//!
//! ## Usage
//!
//! ```bash
//! seqedit <alignment>                          # summary
//! seqedit -f nexus <alignment>                 # force input format
//! seqedit <alignment> -o out.nex --output-format nexus
//! seqedit <alignment> -o - -t -g 2 -r 2        # translated FASTA to stdout
//! ```
//!
//! ## Supported Formats
//!
//! - FASTA (.fasta, .fa, .fna, .faa, .fas)
//! - PHYLIP (.phy, .phylip)
//! - NEXUS (.nex, .nexus, .nxs)
//!
//! Column metadata of FASTA and PHYLIP files lives in a `<file>.meta`
//! sidecar next to them.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use seqedit::formats::{self, FileFormat};
use seqedit::genetic_code::{GeneticCode, GeneticCodes};
use seqedit::primer::PrimerSettings;
use seqedit::Alignment;

/// Input format specification for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// FASTA format
    Fasta,
    /// NEXUS format
    Nexus,
    /// PHYLIP format
    Phylip,
    /// Auto-detect from extension and content
    Auto,
}

impl From<FormatArg> for Option<FileFormat> {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Fasta => Some(FileFormat::Fasta),
            FormatArg::Nexus => Some(FileFormat::Nexus),
            FormatArg::Phylip => Some(FileFormat::Phylip),
            FormatArg::Auto => None,
        }
    }
}

/// Output format specification for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// FASTA format
    Fasta,
    /// PHYLIP format, names padded to 100 characters
    Phylip,
    /// NEXUS with excludes, charsets and codon positions
    Nexus,
    /// NEXUS data block only
    NexusSimple,
    /// NEXUS with codon positions written as charsets
    NexusCodonposCharset,
    /// Translated FASTA
    FastaTranslated,
    /// Translated PHYLIP
    PhylipTranslated,
    /// Translated NEXUS
    NexusTranslated,
}

impl From<OutputFormatArg> for FileFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Fasta => FileFormat::Fasta,
            OutputFormatArg::Phylip => FileFormat::Phylip,
            OutputFormatArg::Nexus => FileFormat::Nexus,
            OutputFormatArg::NexusSimple => FileFormat::NexusSimple,
            OutputFormatArg::NexusCodonposCharset => FileFormat::NexusCodonposCharset,
            OutputFormatArg::FastaTranslated => FileFormat::FastaTranslatedAminoAcid,
            OutputFormatArg::PhylipTranslated => FileFormat::PhylipTranslatedAminoAcid,
            OutputFormatArg::NexusTranslated => FileFormat::NexusTranslatedAminoAcid,
        }
    }
}

/// seqedit - convert, translate and batch-edit sequence alignments
///
/// Without -o/--output, prints a summary of the alignment.
/// With -o/--output, writes the (edited) alignment to a file, or to stdout with "-".
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Alignment file (FASTA, PHYLIP, or NEXUS format)
    file: PathBuf,

    /// Force a specific input format (overrides auto-detection)
    #[arg(short = 'f', long = "format", value_enum, default_value = "auto")]
    format: FormatArg,

    /// Output file. Use "-" for stdout (no metadata sidecar is written).
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output format (default: the input format)
    #[arg(long = "output-format", value_enum)]
    output_format: Option<OutputFormatArg>,

    /// Translate nucleotide sequences to amino acids on output
    #[arg(short = 't', long = "translate")]
    translate: bool,

    /// Genetic code for translation (NCBI id, default: 1 = Standard)
    #[arg(short = 'g', long = "genetic-code", default_value = "1")]
    genetic_code: u8,

    /// Reading frame for translation (1-3, default: 1)
    #[arg(short = 'r', long = "reading-frame", default_value = "1")]
    reading_frame: u8,

    /// List the available genetic codes and exit
    #[arg(long = "list-codes")]
    list_codes: bool,

    /// Remove columns that hold only gaps
    #[arg(long = "remove-vertical-gaps")]
    remove_vertical_gaps: bool,

    /// Delete excluded columns
    #[arg(long = "delete-excluded")]
    delete_excluded: bool,

    /// Sort rows by name
    #[arg(long = "sort-by-name")]
    sort_by_name: bool,

    /// Print the consensus of the alignment
    #[arg(long = "consensus")]
    consensus: bool,

    /// Print primer candidates over the whole alignment
    #[arg(long = "primers")]
    primers: bool,
}

/// Output format: explicit, else the input format; `-t` picks the
/// translated variant.
fn resolve_output_format(args: &Args, input: FileFormat) -> FileFormat {
    let format = args.output_format.map(FileFormat::from).unwrap_or(input);
    if !args.translate || format.is_translated() {
        return format;
    }
    match format.base() {
        FileFormat::Phylip => FileFormat::PhylipTranslatedAminoAcid,
        FileFormat::Nexus => FileFormat::NexusTranslatedAminoAcid,
        _ => FileFormat::FastaTranslatedAminoAcid,
    }
}

fn apply_edits(alignment: &mut Alignment, args: &Args) -> Result<()> {
    if args.delete_excluded {
        alignment.delete_all_excluded_columns()?;
    }
    if args.remove_vertical_gaps {
        alignment.remove_vertical_gaps();
    }
    if args.sort_by_name {
        alignment.sort_sequences_by_name();
    }
    Ok(())
}

fn print_summary(alignment: &Alignment) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "File:       {}", alignment.file_name().unwrap_or_default())?;
    writeln!(out, "Format:     {}", alignment.file_format())?;
    writeln!(out, "Type:       {}", alignment.sequence_type())?;
    writeln!(out, "Sequences:  {}", alignment.len())?;
    writeln!(out, "Columns:    {}", alignment.width())?;
    let excluded = alignment.meta().excludes().count();
    if excluded > 0 {
        writeln!(out, "Excluded:   {}", excluded)?;
    }
    for charset in alignment.meta().charsets() {
        writeln!(out, "Charset:    {} ({} columns)", charset.name, charset.len())?;
    }
    let invalid = alignment.invalid_characters();
    if !invalid.is_empty() {
        let chars: String = invalid.into_iter().collect();
        writeln!(out, "Invalid:    {}", chars)?;
    }
    for group in alignment.find_duplicates() {
        writeln!(out, "Duplicates: {}", group.join(", "))?;
    }
    Ok(())
}

fn print_primers(alignment: &mut Alignment) -> Result<()> {
    if !alignment.is_nucleotide_alignment() {
        bail!("Primer search needs a nucleotide alignment");
    }
    alignment.select_all();
    let primers = alignment.find_primer_in_selection(&PrimerSettings::default());
    alignment.clear_selection();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "position\tsequence\tfold\ttm\tmin_tm\tmax_tm")?;
    for primer in primers {
        writeln!(
            out,
            "{}\t{}\t{}\t{:.1}\t{:.1}\t{:.1}",
            primer.position + 1,
            primer.sequence,
            primer.degenerate_fold,
            primer.tm,
            primer.min_tm,
            primer.max_tm
        )?;
    }
    Ok(())
}

fn write_output(alignment: &mut Alignment, output: &str, format: FileFormat) -> Result<()> {
    if output == "-" {
        alignment.pad_and_trim_sequences();
        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());
        formats::write_alignment(&mut handle, alignment, format)?;
        handle.flush()?;
    } else {
        alignment
            .save_as(output, format)
            .with_context(|| format!("Failed to write {}", output))?;
        eprintln!("Wrote {} sequences to {} ({})", alignment.len(), output, format);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if args.list_codes {
        for code in GeneticCodes::all() {
            println!("{:>2}  {}", code.id, code.name);
        }
        return Ok(());
    }

    // Validate reading frame (1-3)
    if !(1..=3).contains(&args.reading_frame) {
        bail!("Reading frame must be 1-3 (got {})", args.reading_frame);
    }
    let Some(code) = GeneticCode::from_id(args.genetic_code) else {
        bail!(
            "Unknown genetic code: {} (see --list-codes)",
            args.genetic_code
        );
    };

    let forced_format: Option<FileFormat> = args.format.into();
    let outcome = formats::import_file(&args.file, forced_format)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    if let Some(err) = &outcome.meta_error {
        warn!("Alignment metadata ignored: {}", err);
    }
    let mut alignment = outcome.alignment;
    alignment.set_genetic_code(code);
    alignment.set_reading_frame(args.reading_frame);
    info!(
        "Loaded {} sequences of type {}",
        alignment.len(),
        alignment.sequence_type()
    );

    let output_format = resolve_output_format(&args, alignment.file_format());
    if output_format.is_translated() && !alignment.is_nucleotide_alignment() {
        bail!("Cannot translate: input is not a nucleotide alignment");
    }

    apply_edits(&mut alignment, &args)?;

    if args.consensus {
        println!("{}", alignment.consensus());
    }
    if args.primers {
        print_primers(&mut alignment)?;
    }

    match &args.output {
        Some(output) => write_output(&mut alignment, output, output_format)?,
        None if !args.consensus && !args.primers => print_summary(&alignment)?,
        None => {}
    }

    Ok(())
}
