//! NEXUS metadata blocks.
//!
//! Column metadata travels in three blocks, either inside a NEXUS file after
//! the DATA block or in a `.meta` sidecar next to a FASTA or PHYLIP file:
//!
//! ```text
//! BEGIN ASSUMPTIONS;
//! EXSET * UNTITLED = 2 5-7;
//! END;
//!
//! BEGIN SETS;
//! CHARSET gene1 = 1-300;
//! END;
//!
//! BEGIN CODONS;
//! CODONPOSSET * CodonPositions = N: 1-3, 1: 4-298\3, 2: 5-299\3, 3: 6-300\3;
//! END;
//! ```
//!
//! Keywords are case-insensitive and bracketed comments are ignored.

use std::io::{self, Write};

use crate::meta::range::{format_range_list, parse_range_list};
use crate::meta::{AlignmentMeta, CharSet, ColumnRange, MetaError, NON_CODING};

/// Charset names used when codon positions are exported as charsets.
pub const CODON_POSITION_CHARSETS: [&str; 4] = ["NonCoding", "CodonPos1", "CodonPos2", "CodonPos3"];

/// Writes the blocks that carry information. Nothing is written for
/// default metadata.
pub fn write_meta_blocks<W: Write>(out: &mut W, meta: &AlignmentMeta) -> io::Result<()> {
    write_excludes_block(out, meta)?;
    write_charsets_block(out, meta.charsets())?;
    write_codons_block(out, meta)
}

/// Writes the ASSUMPTIONS block if any column is excluded.
pub fn write_excludes_block<W: Write>(out: &mut W, meta: &AlignmentMeta) -> io::Result<()> {
    if !meta.excludes().any() {
        return Ok(());
    }
    writeln!(out, "BEGIN ASSUMPTIONS;")?;
    writeln!(out, "EXSET * UNTITLED = {};", format_range_list(&meta.excludes().as_ranges()))?;
    writeln!(out, "END;")?;
    writeln!(out)
}

/// Writes a SETS block holding `charsets`. Empty charsets are skipped.
pub fn write_charsets_block<W: Write>(out: &mut W, charsets: &[CharSet]) -> io::Result<()> {
    let charsets: Vec<&CharSet> = charsets.iter().filter(|c| !c.is_empty()).collect();
    if charsets.is_empty() {
        return Ok(());
    }
    writeln!(out, "BEGIN SETS;")?;
    for charset in charsets {
        writeln!(
            out,
            "CHARSET {} = {};",
            quote_name(&charset.name),
            format_range_list(&charset.as_ranges())
        )?;
    }
    writeln!(out, "END;")?;
    writeln!(out)
}

/// Writes the CODONS block unless the assignment is the default one.
pub fn write_codons_block<W: Write>(out: &mut W, meta: &AlignmentMeta) -> io::Result<()> {
    if meta.codon_positions().is_default() {
        return Ok(());
    }
    let parts: Vec<String> = codon_position_ranges(meta)
        .into_iter()
        .filter(|(_, ranges)| !ranges.is_empty())
        .map(|(label, ranges)| format!("{}: {}", label, format_range_list(&ranges)))
        .collect();
    writeln!(out, "BEGIN CODONS;")?;
    writeln!(out, "CODONPOSSET * CodonPositions = {};", parts.join(", "))?;
    writeln!(out, "END;")?;
    writeln!(out)
}

/// Codon positions expressed as charsets, one per position that occurs.
pub fn codon_position_charsets(meta: &AlignmentMeta) -> Vec<CharSet> {
    codon_position_ranges(meta)
        .into_iter()
        .zip(CODON_POSITION_CHARSETS)
        .filter(|((_, ranges), _)| !ranges.is_empty())
        .map(|((_, ranges), name)| CharSet::from_ranges(name, meta.width(), &ranges))
        .collect()
}

/// Ranges per codon position, labelled `N`, `1`, `2` and `3`.
fn codon_position_ranges(meta: &AlignmentMeta) -> Vec<(&'static str, Vec<ColumnRange>)> {
    [("N", NON_CODING, 1), ("1", 1, 3), ("2", 2, 3), ("3", 3, 3)]
        .into_iter()
        .map(|(label, position, stride)| {
            let columns: Vec<usize> = (0..meta.width())
                .filter(|&x| meta.codon_pos_at(x) == position)
                .collect();
            (label, ColumnRange::compress(&columns, stride))
        })
        .collect()
}

/// Parses every metadata block in `content` for an alignment of `width`
/// columns. Returns `None` when the text has no metadata blocks.
pub fn parse_meta_blocks(content: &str, width: usize) -> Result<Option<AlignmentMeta>, MetaError> {
    let text: String = strip_comments(content)
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut meta = AlignmentMeta::new(width);
    let mut found = false;
    let mut block: Option<String> = None;

    for command in text.split(';') {
        let command = command.trim();
        if command.is_empty() {
            continue;
        }
        let (keyword, rest) = command
            .split_once(char::is_whitespace)
            .unwrap_or((command, ""));
        let keyword = keyword.to_ascii_uppercase();

        match (keyword.as_str(), block.as_deref()) {
            ("BEGIN", _) => block = Some(rest.trim().to_ascii_uppercase()),
            ("END" | "ENDBLOCK", _) => block = None,
            ("EXSET", Some("ASSUMPTIONS")) => {
                let (_, ranges) = assignment("EXSET", rest)?;
                for range in parse_range_list(ranges, width)? {
                    for x in range.positions() {
                        meta.exclude_position(x);
                    }
                }
                found = true;
            }
            ("CHARSET", Some("SETS" | "ASSUMPTIONS")) => {
                let (name, ranges) = assignment("CHARSET", rest)?;
                let ranges = parse_range_list(ranges, width)?;
                meta.add_charset(CharSet::from_ranges(name, width, &ranges));
                found = true;
            }
            ("CODONPOSSET", Some("CODONS")) => {
                let (_, body) = assignment("CODONPOSSET", rest)?;
                apply_codon_positions(&mut meta, body, width)?;
                found = true;
            }
            _ => {}
        }
    }

    Ok(found.then_some(meta))
}

/// Splits `[*] name = value` into the unquoted name and the value text.
fn assignment<'a>(command: &str, rest: &'a str) -> Result<(String, &'a str), MetaError> {
    let (lhs, rhs) = rest.split_once('=').ok_or_else(|| MetaError::MalformedCommand {
        command: command.to_string(),
        message: "missing '='".to_string(),
    })?;
    let name = lhs.trim().trim_start_matches('*').trim();
    Ok((unquote(name), rhs.trim()))
}

/// Applies `N: ranges, 1: ranges, 2: ranges, 3: ranges`. Columns not
/// mentioned keep their default position.
fn apply_codon_positions(meta: &mut AlignmentMeta, body: &str, width: usize) -> Result<(), MetaError> {
    for part in body.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (label, ranges) = part.split_once(':').ok_or_else(|| MetaError::MalformedCommand {
            command: "CODONPOSSET".to_string(),
            message: format!("expected 'position: ranges', got '{}'", part),
        })?;
        let position = match label.trim().to_ascii_uppercase().as_str() {
            "N" => NON_CODING,
            "1" => 1,
            "2" => 2,
            "3" => 3,
            other => return Err(MetaError::InvalidCodonPosition(other.to_string())),
        };
        for range in parse_range_list(ranges, width)? {
            for x in range.positions() {
                meta.set_codon_position(x, position);
            }
        }
    }
    Ok(())
}

fn strip_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut depth = 0usize;
    for c in content.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => result.push(c),
            _ => {}
        }
    }
    result
}

fn unquote(name: &str) -> String {
    let name = name.trim();
    if name.len() >= 2
        && ((name.starts_with('\'') && name.ends_with('\'')) || (name.starts_with('"') && name.ends_with('"')))
    {
        name[1..name.len() - 1].to_string()
    } else {
        name.to_string()
    }
}

/// Quotes a NEXUS name when it contains whitespace or punctuation.
pub fn quote_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '|' | '-'));
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
