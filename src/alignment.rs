//! The alignment façade.
//!
//! [`Alignment`] ties the rows ([`SequenceList`]) to their column metadata
//! ([`AlignmentMeta`]) and reports every committed change to an optional
//! [`EventSink`]. Every mutating operation follows the same steps: delegate,
//! and if anything changed, bump the content version (which invalidates the
//! memoized histograms), mark the alignment edited and emit exactly one
//! event.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::events::{AlignmentEvent, AlignmentId, ChangeKind, EventSink};
use crate::formats::{self, FileFormat, LoadedFile, ParseError, SaveError};
use crate::genetic_code::GeneticCode;
use crate::histogram::{Histogram, Memo};
use crate::meta::{AlignmentMeta, CharSet, MetaError};
use crate::model::{Sequence, SequenceType};
use crate::nucleotide::is_gap;
use crate::primer::{self, Primer, PrimerSettings};
use crate::sequence_list::{
    CharsetStats, EditError, FindMatch, FindRequest, LoadMessage, PriorState, SelectionRect,
    SequenceList,
};
use crate::translator::Translator;

/// Progress of a file-backed load, as seen by the owning thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Not file-backed, or already loaded.
    Idle,
    Pending,
    Loaded { meta_error: Option<MetaError> },
    Failed(String),
}

pub struct Alignment {
    id: AlignmentId,
    sequences: SequenceList,
    meta: AlignmentMeta,
    file_format: FileFormat,
    alignment_file: Option<PathBuf>,
    genetic_code: GeneticCode,
    edited_after_last_save: bool,
    version: u64,
    histogram: Memo<Histogram>,
    translated_histogram: Memo<Histogram>,
    translation_view: bool,
    sink: Option<Box<dyn EventSink>>,
}

impl fmt::Debug for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alignment")
            .field("id", &self.id)
            .field("sequences", &self.sequences.len())
            .field("width", &self.width())
            .field("file_format", &self.file_format)
            .field("alignment_file", &self.alignment_file)
            .field("reading_frame", &self.reading_frame())
            .field("genetic_code", &self.genetic_code.id)
            .field("edited", &self.edited_after_last_save)
            .finish()
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Alignment {
    /// Creates an in-memory alignment with default metadata.
    pub fn new(sequences: Vec<Sequence>) -> Self {
        let list = SequenceList::new(sequences);
        let meta = AlignmentMeta::new(list.longest_sequence_length());
        Self::from_parts(list, meta, FileFormat::Fasta, None)
    }

    /// Assembles an alignment. Metadata of the wrong width is resized to
    /// the rows.
    pub fn from_parts(
        sequences: SequenceList,
        mut meta: AlignmentMeta,
        file_format: FileFormat,
        alignment_file: Option<PathBuf>,
    ) -> Self {
        let width = sequences.longest_sequence_length();
        if meta.width() != width {
            meta.resize(width);
        }
        Self {
            id: AlignmentId::next(),
            sequences,
            meta,
            file_format,
            alignment_file,
            genetic_code: GeneticCode::standard(),
            edited_after_last_save: false,
            version: 0,
            histogram: Memo::new(),
            translated_histogram: Memo::new(),
            translation_view: false,
            sink: None,
        }
    }

    pub(crate) fn from_loaded(loaded: LoadedFile, alignment_file: Option<PathBuf>) -> (Self, Option<MetaError>) {
        let LoadedFile {
            sequences,
            format,
            meta,
            meta_error,
        } = loaded;
        let alignment = Self::from_parts(SequenceList::new(sequences), meta, format, alignment_file);
        (alignment, meta_error)
    }

    /// Creates an alignment whose rows are parsed from `path` on a
    /// background thread. Call [`Alignment::poll_file_load`] from the owning
    /// thread to pick them up.
    pub fn from_file_lazy(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = formats::detect_format_from_extension(&path).unwrap_or(FileFormat::Fasta);
        let list = SequenceList::from_file(path.clone());
        Self::from_parts(list, AlignmentMeta::new(0), format, Some(path))
    }

    /// Routes change events to `sink`, replacing any previous sink.
    pub fn set_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_event_sink(&mut self) {
        self.sink = None;
    }

    fn emit(&mut self, kind: ChangeKind) {
        if let Some(sink) = self.sink.as_mut() {
            sink.notify(AlignmentEvent {
                alignment: self.id,
                kind,
            });
        }
    }

    /// Records a content change and emits its event.
    fn commit(&mut self, kind: ChangeKind) {
        self.version += 1;
        self.edited_after_last_save = true;
        debug!("Alignment {} changed: {:?}", self.id.get(), kind);
        self.emit(kind);
    }

    /// Resizes the metadata to the current row width.
    fn sync_meta_width(&mut self) {
        let width = self.sequences.longest_sequence_length();
        if self.meta.width() != width {
            self.meta.resize(width);
        }
    }

    // Queries

    pub fn id(&self) -> AlignmentId {
        self.id
    }

    pub fn sequences(&self) -> &SequenceList {
        &self.sequences
    }

    pub fn meta(&self) -> &AlignmentMeta {
        &self.meta
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Alignment width (longest row).
    pub fn width(&self) -> usize {
        self.sequences.longest_sequence_length()
    }

    pub fn base_at(&self, x: usize, y: usize) -> Option<u8> {
        self.sequences.base_at(x, y)
    }

    pub fn length_at(&self, y: usize) -> usize {
        self.sequences.get(y).map_or(0, Sequence::len)
    }

    pub fn is_position_valid(&self, x: usize, y: usize) -> bool {
        self.sequences.is_position_valid(x, y)
    }

    pub fn sequence_by_name(&self, name: &str) -> Option<&Sequence> {
        self.sequences.sequence_by_name(name)
    }

    pub fn longest_name_length(&self) -> usize {
        self.sequences.longest_name_length()
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequences.sequence_type()
    }

    pub fn is_nucleotide_alignment(&self) -> bool {
        self.sequence_type() == SequenceType::Nucleotide
    }

    pub fn is_amino_acid_alignment(&self) -> bool {
        self.sequence_type() == SequenceType::AminoAcid
    }

    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    pub fn set_file_format(&mut self, format: FileFormat) {
        self.file_format = format;
    }

    pub fn alignment_file(&self) -> Option<&Path> {
        self.alignment_file.as_deref()
    }

    pub fn set_alignment_file(&mut self, path: impl Into<PathBuf>) {
        self.alignment_file = Some(path.into());
    }

    pub fn file_name(&self) -> Option<String> {
        self.alignment_file
            .as_ref()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn is_edited_after_last_save(&self) -> bool {
        self.edited_after_last_save
    }

    pub fn set_edited_after_last_save(&mut self, edited: bool) {
        self.edited_after_last_save = edited;
    }

    /// Counter bumped by every content or metadata change.
    pub fn content_version(&self) -> u64 {
        self.version
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.sequences.is_fully_loaded()
    }

    /// File-backed alignments do not keep undo state.
    pub fn is_undoable(&self) -> bool {
        !self.sequences.is_file_backed()
    }

    pub fn is_editable(&self) -> bool {
        self.is_fully_loaded() && !self.translation_view
    }

    pub fn invalid_characters(&self) -> Vec<char> {
        self.sequences.invalid_characters()
    }

    pub fn is_all_characters_valid(&self) -> bool {
        self.sequences.is_all_characters_valid()
    }

    // Reading frame and genetic code

    pub fn reading_frame(&self) -> u8 {
        self.meta.reading_frame()
    }

    /// Sets the frame (1, 2 or 3). Other values are ignored.
    pub fn set_reading_frame(&mut self, frame: u8) -> bool {
        let changed = self.meta.set_reading_frame(frame);
        if changed {
            self.commit(ChangeKind::AlignmentMetaChanged);
        }
        changed
    }

    /// 1 → 2 → 3 → 1.
    pub fn inc_reading_frame(&mut self) {
        let next = self.reading_frame() % 3 + 1;
        self.set_reading_frame(next);
    }

    /// 1 → 3 → 2 → 1.
    pub fn dec_reading_frame(&mut self) {
        let previous = (self.reading_frame() + 1) % 3 + 1;
        self.set_reading_frame(previous);
    }

    pub fn genetic_code(&self) -> GeneticCode {
        self.genetic_code
    }

    pub fn set_genetic_code(&mut self, code: GeneticCode) {
        if code != self.genetic_code {
            self.genetic_code = code;
            self.commit(ChangeKind::AlignmentMetaChanged);
        }
    }

    pub fn codon_pos_at(&self, x: usize) -> u8 {
        self.meta.codon_pos_at(x)
    }

    pub fn is_full_codon_starting_at(&self, x: usize) -> bool {
        self.meta.is_full_codon_starting_at(x)
    }

    pub fn is_excluded(&self, x: usize) -> bool {
        self.meta.is_excluded(x)
    }

    pub fn all_codon_positions(&self, frame: u8, remove_excluded: bool) -> Vec<usize> {
        self.meta.all_codon_positions(frame, remove_excluded).collect()
    }

    pub fn translator(&self) -> Translator {
        Translator::new(&self.meta, self.genetic_code)
    }

    // Metadata

    /// Replaces the metadata. Its width must match the rows.
    pub fn set_meta(&mut self, meta: AlignmentMeta) -> Result<(), EditError> {
        let width = self.width();
        if meta.width() != width {
            return Err(MetaError::WidthMismatch {
                expected: width,
                found: meta.width(),
            }
            .into());
        }
        self.meta = meta;
        self.commit(ChangeKind::AlignmentMetaChanged);
        Ok(())
    }

    fn set_selected_excluded(&mut self, excluded: bool) -> bool {
        let columns = self.sequences.selected_columns();
        let mut changed = false;
        for x in columns {
            if x < self.meta.width() && self.meta.is_excluded(x) != excluded {
                if excluded {
                    self.meta.exclude_position(x);
                } else {
                    self.meta.include_position(x);
                }
                changed = true;
            }
        }
        if changed {
            self.commit(ChangeKind::AlignmentMetaChanged);
        }
        changed
    }

    pub fn add_selection_to_excludes(&mut self) -> bool {
        self.set_selected_excluded(true)
    }

    pub fn remove_selection_from_excludes(&mut self) -> bool {
        self.set_selected_excluded(false)
    }

    /// Marks the selected columns as coding, numbering them 1,2,3 from the
    /// first selected column shifted by `start_offset`.
    pub fn set_selection_as_coding(&mut self, start_offset: usize) -> bool {
        let columns = self.sequences.selected_columns();
        if columns.is_empty() {
            return false;
        }
        for (n, x) in columns.into_iter().enumerate() {
            let position = ((n + start_offset) % 3) as u8 + 1;
            self.meta.set_codon_position(x, position);
        }
        self.commit(ChangeKind::AlignmentMetaChanged);
        true
    }

    pub fn set_selection_as_non_coding(&mut self) -> bool {
        let columns = self.sequences.selected_columns();
        if columns.is_empty() {
            return false;
        }
        for x in columns {
            self.meta.set_codon_position(x, 0);
        }
        self.commit(ChangeKind::AlignmentMetaChanged);
        true
    }

    /// Stores the selected columns as charset `name`, replacing a charset
    /// with the same name.
    pub fn add_charset_from_selection(&mut self, name: &str) -> bool {
        let columns = self.sequences.selected_columns();
        if columns.is_empty() {
            return false;
        }
        let mut charset = CharSet::new(name, self.meta.width());
        for x in columns {
            charset.add_position(x);
        }
        self.meta.add_charset(charset);
        self.commit(ChangeKind::AlignmentMetaChanged);
        true
    }

    pub fn remove_charset(&mut self, name: &str) -> bool {
        let removed = self.meta.remove_charset(name);
        if removed {
            self.commit(ChangeKind::AlignmentMetaChanged);
        }
        removed
    }

    /// Replaces the selection with every column of charset `name`.
    pub fn select_charset(&mut self, name: &str) -> bool {
        let Some(columns) = self
            .meta
            .charset(name)
            .map(|c| c.columns().positions().collect::<Vec<_>>())
        else {
            return false;
        };
        self.sequences.clear_selection();
        for x in columns {
            self.sequences.select_column(x, true);
        }
        self.emit(ChangeKind::SelectionChanged);
        true
    }

    pub fn charset_stats(&self) -> Vec<CharsetStats> {
        self.meta
            .charsets()
            .iter()
            .map(|c| self.sequences.charset_stats(c))
            .collect()
    }

    // Whole-alignment edits

    /// Replaces every row; the metadata is reset to the new width.
    pub fn set_new_sequences(&mut self, sequences: Vec<Sequence>) {
        self.sequences.set_rows(sequences);
        self.meta = AlignmentMeta::new(self.width());
        self.commit(ChangeKind::NewSequences);
    }

    pub fn right_pad_sequences_with_gap_until_equal_length(&mut self) -> bool {
        let padded = self.sequences.right_pad_with_gap_until_equal_length();
        if padded {
            self.commit(ChangeKind::SequencesChanged);
        }
        padded
    }

    pub fn left_pad_sequences_with_gap_until_equal_length(&mut self) -> bool {
        let padded = self.sequences.left_pad_with_gap_until_equal_length();
        if padded {
            self.commit(ChangeKind::SequencesChanged);
        }
        padded
    }

    pub fn trim_sequences(&mut self) -> bool {
        let trimmed = self.sequences.right_trim_sequences_remove_gaps_until_equal_length();
        if trimmed {
            self.sync_meta_width();
            self.commit(ChangeKind::SequencesChanged);
        }
        trimmed
    }

    /// Pads then trims so every row has the alignment width.
    pub fn pad_and_trim_sequences(&mut self) -> bool {
        let padded = self.sequences.right_pad_with_gap_until_equal_length();
        let trimmed = self.sequences.right_trim_sequences_remove_gaps_until_equal_length();
        if padded || trimmed {
            self.sync_meta_width();
            self.commit(ChangeKind::SequencesChanged);
        }
        padded || trimmed
    }

    /// Deletes the masked columns from the rows and the metadata together.
    /// The mask must cover the full width; nothing changes otherwise.
    pub fn delete_bases_from_mask(&mut self, mask: &[bool]) -> Result<bool, EditError> {
        self.sync_meta_width();
        let width = self.width();
        if mask.len() != width {
            return Err(EditError::MaskLength {
                expected: width,
                found: mask.len(),
            });
        }
        if !mask.iter().any(|&m| m) {
            return Ok(false);
        }
        self.sequences.delete_bases_in_all_sequences_from_mask(mask)?;
        self.meta.remove_from_mask(mask)?;
        self.sync_meta_width();
        self.commit(ChangeKind::SequencesChanged);
        Ok(true)
    }

    /// Deletes every excluded column.
    pub fn delete_all_excluded_columns(&mut self) -> Result<bool, EditError> {
        self.sync_meta_width();
        let mask = self.meta.excludes().as_slice().to_vec();
        self.delete_bases_from_mask(&mask)
    }

    /// Deletes the columns that are gaps in every row.
    pub fn remove_vertical_gaps(&mut self) -> bool {
        let mask: Vec<bool> = self.sequences.consensus().into_iter().map(is_gap).collect();
        match self.delete_bases_from_mask(&mask) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Could not remove vertical gaps: {}", e);
                false
            }
        }
    }

    /// Inserts `count` all-gap columns before column `at` (clamped to the
    /// width). The new columns are included, non-coding and in no charset.
    pub fn insert_gap_columns(&mut self, at: usize, count: usize) -> bool {
        if self.is_empty() || count == 0 {
            return false;
        }
        self.sequences.right_pad_with_gap_until_equal_length();
        self.sync_meta_width();
        let at = at.min(self.width());
        self.sequences.insert_gap_columns(at, count);
        self.meta.insert_columns(at, count);
        self.commit(ChangeKind::SequencesChanged);
        true
    }

    /// Reverse-complements every row and mirrors the metadata.
    pub fn reverse_complement_alignment(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.sequences.right_pad_with_gap_until_equal_length();
        self.sync_meta_width();
        self.sequences.reverse_complement();
        self.meta.reverse();
        self.commit(ChangeKind::SequencesChanged);
        true
    }

    pub fn complement_alignment(&mut self) -> bool {
        let changed = self.sequences.complement();
        if changed {
            self.commit(ChangeKind::SequencesChanged);
        }
        changed
    }

    pub fn delete_all_gaps(&mut self) -> bool {
        let changed = self.sequences.delete_all_gaps();
        if changed {
            self.sequences.right_pad_with_gap_until_equal_length();
            self.sync_meta_width();
            self.commit(ChangeKind::SequencesChanged);
        }
        changed
    }

    pub fn realign_nucleotides_from_aa_template(&mut self, template: &Alignment) -> bool {
        let changed = self
            .sequences
            .realign_nucleotides_from_aa_template(&template.sequences);
        if changed {
            self.sequences.right_pad_with_gap_until_equal_length();
            self.sync_meta_width();
            self.commit(ChangeKind::SequencesChanged);
        }
        changed
    }

    // Gap-aware edits

    /// Commits a row-level edit that returned the prior state of the rows
    /// it changed.
    fn commit_rows(&mut self, prior: PriorState, repad: bool) -> PriorState {
        if !prior.is_empty() {
            if repad {
                self.sequences.right_pad_with_gap_until_equal_length();
                self.sync_meta_width();
            }
            self.commit(ChangeKind::SequencesChanged);
        }
        prior
    }

    pub fn move_selection_left(&mut self) -> PriorState {
        let prior = self.sequences.move_selection_left_if_gap_is_present();
        self.commit_rows(prior, false)
    }

    pub fn move_selection_right(&mut self) -> PriorState {
        let prior = self.sequences.move_selection_right_if_gap_is_present();
        self.commit_rows(prior, false)
    }

    pub fn move_selection(&mut self, diff: isize) -> PriorState {
        let prior = self.sequences.move_selection_if_gap_is_present(diff);
        self.commit_rows(prior, false)
    }

    pub fn is_move_selection_left_possible(&self) -> bool {
        self.sequences.is_gap_present_left_of_selection()
    }

    pub fn is_move_selection_right_possible(&self) -> bool {
        self.sequences.is_gap_present_right_of_selection()
    }

    pub fn delete_gap_move_left(&mut self) -> PriorState {
        let prior = self.sequences.delete_gap_move_left();
        self.commit_rows(prior, true)
    }

    pub fn insert_gap_left_of_selection_move_right(&mut self) -> PriorState {
        let prior = self.sequences.insert_gap_left_of_selected_base();
        self.commit_rows(prior, true)
    }

    pub fn insert_gap_right_of_selection_move_left(&mut self) -> PriorState {
        let prior = self.sequences.insert_gap_right_of_selected_base();
        self.commit_rows(prior, true)
    }

    /// Replaces the selected residues with gaps.
    pub fn clear_selected_bases(&mut self) -> PriorState {
        let prior = self.sequences.replace_selected_bases_with_gap();
        self.commit_rows(prior, false)
    }

    pub fn delete_selected_bases(&mut self) -> PriorState {
        let prior = self.sequences.delete_selected_bases();
        self.commit_rows(prior, true)
    }

    pub fn replace_selected_with_char(&mut self, symbol: u8) -> bool {
        let replaced = self.sequences.replace_selected_with_char(symbol);
        if replaced {
            self.commit(ChangeKind::SequencesChanged);
        }
        replaced
    }

    /// Puts back rows returned by an earlier edit.
    pub fn undo(&mut self, prior: PriorState) -> bool {
        let restored = self.sequences.restore(prior);
        if restored {
            self.sequences.right_pad_with_gap_until_equal_length();
            self.sync_meta_width();
            self.commit(ChangeKind::SequencesChanged);
        }
        restored
    }

    // Row edits

    pub fn merge_two_sequences(&mut self, a: usize, b: usize, allow_overlap: bool) -> bool {
        let merged = self.sequences.merge_two_sequences(a, b, allow_overlap);
        if merged {
            self.sync_meta_width();
            self.commit(ChangeKind::NewSequences);
        }
        merged
    }

    /// Merges the two rows with a selection. Fails unless exactly two rows
    /// are selected.
    pub fn merge_two_selected(&mut self, allow_overlap: bool) -> bool {
        let selected: Vec<usize> = self
            .sequences
            .iter()
            .enumerate()
            .filter(|(_, s)| s.has_selection())
            .map(|(y, _)| y)
            .collect();
        match selected[..] {
            [a, b] => self.merge_two_sequences(a, b, allow_overlap),
            _ => false,
        }
    }

    pub fn delete_empty_sequences(&mut self) -> Vec<Sequence> {
        let deleted = self.sequences.delete_empty_sequences();
        if !deleted.is_empty() {
            self.sync_meta_width();
            self.commit(ChangeKind::SequencesRemoved);
        }
        deleted
    }

    pub fn delete_sequence(&mut self, index: usize) -> Result<Sequence, EditError> {
        let removed = self.sequences.delete_sequence(index)?;
        self.sync_meta_width();
        self.commit(ChangeKind::SequencesRemoved);
        Ok(removed)
    }

    pub fn sort_sequences_by_name(&mut self) -> bool {
        let sorted = self.sequences.sort_sequences_by_name();
        if sorted {
            self.commit(ChangeKind::SequenceOrderChanged);
        }
        sorted
    }

    pub fn sort_sequences_by_this_model(&mut self, reference: &[Sequence]) -> bool {
        let sorted = self.sequences.sort_sequences_by_this_model(reference);
        if sorted {
            self.commit(ChangeKind::SequenceOrderChanged);
        }
        sorted
    }

    pub fn set_first_selected_name(&mut self, name: &str) -> bool {
        let renamed = self.sequences.set_first_selected_name(name);
        if renamed {
            self.commit(ChangeKind::SequencesChanged);
        }
        renamed
    }

    fn insert_rows(&mut self, index: usize, rows: Vec<Sequence>) -> usize {
        let count = rows.len();
        if count > 0 {
            self.sequences.insert_all(index, rows);
            self.sequences.right_pad_with_gap_until_equal_length();
            self.sync_meta_width();
            self.commit(ChangeKind::NewSequences);
        }
        count
    }

    /// Appends the FASTA records in `text`. Returns the number added.
    pub fn add_fasta_text(&mut self, text: &str) -> Result<usize, ParseError> {
        let rows = formats::fasta::parse_fasta_str(text)?;
        let end = self.len();
        Ok(self.insert_rows(end, rows))
    }

    /// Inserts the rows of another file before row `index`.
    pub fn add_sequences_from_file(&mut self, path: impl AsRef<Path>, index: usize) -> Result<usize, ParseError> {
        let loaded = formats::read_alignment(path.as_ref(), None)?;
        Ok(self.insert_rows(index, loaded.sequences))
    }

    // Selection

    pub fn is_base_selected(&self, x: usize, y: usize) -> bool {
        self.sequences.is_base_selected(x, y)
    }

    pub fn set_selection_at(&mut self, x: usize, y: usize, selected: bool) -> bool {
        let changed = self.sequences.set_selection_at(x, y, selected);
        if changed {
            self.emit(ChangeKind::SelectionChanged);
        }
        changed
    }

    pub fn set_selection_within(&mut self, rect: SelectionRect, selected: bool) {
        self.sequences.set_selection_within(rect, selected);
        self.emit(ChangeKind::SelectionChanged);
    }

    pub fn select_column(&mut self, x: usize, selected: bool) {
        self.sequences.select_column(x, selected);
        self.emit(ChangeKind::SelectionChanged);
    }

    pub fn select_all(&mut self) {
        if !self.is_empty() {
            self.sequences.select_all();
            self.emit(ChangeKind::SelectionChanged);
        }
    }

    pub fn clear_selection(&mut self) -> bool {
        let cleared = self.sequences.clear_selection();
        if cleared {
            self.emit(ChangeKind::SelectionChanged);
        }
        cleared
    }

    pub fn select_rows(&mut self, indices: &[usize]) {
        self.sequences.select_rows(indices);
        self.emit(ChangeKind::SelectionChanged);
    }

    pub fn set_all_horizontal_selection_at(&mut self, y: usize, selected: bool) {
        if self.sequences.set_all_horizontal_selection_at(y, selected) {
            self.emit(ChangeKind::SelectionChanged);
        }
    }

    pub fn expand_selection_down(&mut self) {
        if self.sequences.expand_selection_down() {
            self.emit(ChangeKind::SelectionChanged);
        }
    }

    pub fn copy_selection_from_sequence_to(&mut self, from: usize, to: usize) {
        if self.sequences.copy_selection_from_into(from, to) {
            self.emit(ChangeKind::SelectionChanged);
        }
    }

    pub fn copy_selection_from_pos_x1_to_x2(&mut self, x1: usize, x2: usize) {
        self.sequences.copy_selection_from_pos_x1_to_x2(x1, x2);
        self.emit(ChangeKind::SelectionChanged);
    }

    pub fn select_everything_within_gaps(&mut self, x: usize, y: usize) -> bool {
        let selected = self.sequences.select_everything_within_gaps(x, y);
        if selected {
            self.emit(ChangeKind::SelectionChanged);
        }
        selected
    }

    pub fn has_selection(&self) -> bool {
        self.sequences.has_selection()
    }

    pub fn selection_size(&self) -> u64 {
        self.sequences.selection_size()
    }

    pub fn selected_column_count(&self) -> usize {
        self.sequences.selected_column_count()
    }

    pub fn selected_sequence_count(&self) -> usize {
        self.sequences.selected_sequence_count()
    }

    pub fn first_selected_position(&self) -> Option<(usize, usize)> {
        self.sequences.first_selected_position()
    }

    pub fn first_selected_sequence_index(&self) -> Option<usize> {
        self.sequences.first_selected_sequence_index()
    }

    pub fn selection_min_rect(&self) -> Option<SelectionRect> {
        self.sequences.selection_min_rect()
    }

    pub fn selection_as_nucleotides(&self) -> String {
        self.sequences.selection_as_nucleotides()
    }

    pub fn selection_names(&self) -> Vec<String> {
        self.sequences.selection_names()
    }

    pub fn has_fully_selected_sequences(&self) -> bool {
        self.sequences.has_fully_selected_sequences()
    }

    pub fn first_selected_name(&self) -> Option<&str> {
        self.sequences.first_selected_name()
    }

    /// Writes the selected cells of each row with a selection as FASTA.
    pub fn save_selection_as_fasta_file(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.sequences.write_selection_as_fasta(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Writes whole rows as FASTA: rows with a selection when `selected` is
    /// true, the others otherwise.
    pub fn save_sequences_as_fasta_file(&self, path: impl AsRef<Path>, selected: bool) -> Result<(), SaveError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.sequences.write_sequences_as_fasta(&mut out, selected)?;
        out.flush()?;
        Ok(())
    }

    // Find

    /// Finds the next match and selects it.
    pub fn find(&mut self, request: &FindRequest) -> Result<Option<FindMatch>, EditError> {
        let found = self.sequences.find(request)?;
        if found.is_some() {
            self.emit(ChangeKind::SelectionChanged);
        }
        Ok(found)
    }

    pub fn clear_find_last_pos(&mut self) {
        self.sequences.clear_find_cursor();
    }

    // Derived data

    /// Consensus of all rows as text.
    pub fn consensus(&self) -> String {
        String::from_utf8_lossy(&self.sequences.consensus()).into_owned()
    }

    pub fn find_duplicates(&self) -> Vec<Vec<String>> {
        self.sequences.find_duplicates()
    }

    pub fn set_translation_view(&mut self, on: bool) {
        self.translation_view = on;
    }

    pub fn is_translation_view(&self) -> bool {
        self.translation_view
    }

    /// Symbol counts per column, recomputed only after a change. In
    /// translation view the counts are over translated columns.
    pub fn histogram(&mut self) -> &Histogram {
        if self.translation_view {
            let translator = self.translator();
            let Self {
                sequences,
                translated_histogram,
                version,
                ..
            } = self;
            translated_histogram.get_or_compute(*version, || sequences.translated_histogram(&translator))
        } else {
            let Self {
                sequences,
                histogram,
                version,
                ..
            } = self;
            histogram.get_or_compute(*version, || sequences.histogram())
        }
    }

    /// The translated amino acid alignment with re-indexed metadata.
    pub fn translated_alignment(&self) -> Alignment {
        let translator = self.translator();
        let rows: Vec<Sequence> = self
            .sequences
            .iter()
            .map(|s| translator.translate_sequence(s))
            .collect();
        let mut list = SequenceList::new(rows);
        list.set_sequence_type(SequenceType::AminoAcid);
        let mut translated = Alignment::from_parts(list, self.meta.translated(), self.file_format, None);
        translated.genetic_code = self.genetic_code;
        translated
    }

    /// Primer candidates over the degenerate consensus of the selection.
    pub fn find_primer_in_selection(&self, settings: &PrimerSettings) -> Vec<Primer> {
        if !self.is_nucleotide_alignment() {
            return Vec::new();
        }
        let Some((columns, consensus)) = self.sequences.selection_consensus() else {
            return Vec::new();
        };
        info!("Searching primers in {} selected columns", consensus.len());
        primer::find_primers(&consensus, &columns, settings)
    }

    // Loading and saving

    /// Picks up a finished background load. Never blocks.
    pub fn poll_file_load(&mut self) -> LoadStatus {
        match self.sequences.poll_load() {
            Some(message) => self.apply_load(message),
            None if self.sequences.is_fully_loaded() => LoadStatus::Idle,
            None => LoadStatus::Pending,
        }
    }

    /// Blocks until a background load finishes.
    pub fn wait_for_file_load(&mut self) -> LoadStatus {
        match self.sequences.wait_load() {
            Some(message) => self.apply_load(message),
            None => LoadStatus::Idle,
        }
    }

    fn apply_load(&mut self, message: LoadMessage) -> LoadStatus {
        match message {
            LoadMessage::Loaded(loaded) => {
                let LoadedFile {
                    sequences,
                    format,
                    meta,
                    meta_error,
                } = loaded;
                self.sequences.set_rows(sequences);
                self.file_format = format;
                self.meta = meta;
                self.sync_meta_width();
                self.version += 1;
                self.emit(ChangeKind::NewSequences);
                if let Some(e) = &meta_error {
                    warn!("Ignoring metadata: {}", e);
                }
                LoadStatus::Loaded { meta_error }
            }
            LoadMessage::Failed(e) => {
                warn!("Background load failed: {}", e);
                LoadStatus::Failed(e)
            }
        }
    }

    /// Saves to the current file in the current format.
    pub fn save(&mut self) -> Result<(), SaveError> {
        let path = self.alignment_file.clone().ok_or(SaveError::NoFile)?;
        self.save_as(&path, self.file_format)
    }

    /// Pads and trims the rows, then writes them (and a `.meta` sidecar if
    /// needed) in `format`.
    pub fn save_as(&mut self, path: impl AsRef<Path>, format: FileFormat) -> Result<(), SaveError> {
        if !self.is_fully_loaded() {
            return Err(SaveError::NotLoaded);
        }
        self.pad_and_trim_sequences();
        formats::export_alignment(self, path.as_ref(), format)?;
        self.edited_after_last_save = false;
        info!("Saved {} sequences as {} to {}", self.len(), format, path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ColumnRange;
    use std::sync::mpsc;

    fn alignment(rows: &[(&str, &str)]) -> Alignment {
        Alignment::new(rows.iter().map(|(n, b)| Sequence::new(*n, b)).collect())
    }

    fn with_channel(rows: &[(&str, &str)]) -> (Alignment, mpsc::Receiver<AlignmentEvent>) {
        let mut alignment = alignment(rows);
        let (tx, rx) = mpsc::channel();
        alignment.set_event_sink(tx);
        (alignment, rx)
    }

    fn kinds(rx: &mpsc::Receiver<AlignmentEvent>) -> Vec<ChangeKind> {
        rx.try_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_reading_frame_wraps_around() {
        let (mut alignment, rx) = with_channel(&[("a", "ATGGCC")]);
        assert_eq!(alignment.reading_frame(), 1);
        alignment.inc_reading_frame();
        alignment.inc_reading_frame();
        alignment.inc_reading_frame();
        assert_eq!(alignment.reading_frame(), 1);
        alignment.dec_reading_frame();
        assert_eq!(alignment.reading_frame(), 3);
        assert_eq!(kinds(&rx), vec![ChangeKind::AlignmentMetaChanged; 4]);

        assert!(!alignment.set_reading_frame(0));
        assert!(!alignment.set_reading_frame(3));
        assert!(kinds(&rx).is_empty());
    }

    #[test]
    fn test_one_event_per_change_and_none_on_noop() {
        let (mut alignment, rx) = with_channel(&[("a", "AC-T"), ("b", "ACGT")]);
        alignment.set_selection_at(1, 0, true);
        assert_eq!(kinds(&rx), vec![ChangeKind::SelectionChanged]);

        let prior = alignment.move_selection_right();
        assert_eq!(prior.len(), 1);
        assert_eq!(kinds(&rx), vec![ChangeKind::SequencesChanged]);

        alignment.clear_selection();
        alignment.set_selection_at(1, 1, true);
        kinds(&rx);
        assert!(alignment.move_selection_right().is_empty());
        assert!(kinds(&rx).is_empty());
        assert!(!alignment.set_selection_at(1, 1, true));
        assert!(kinds(&rx).is_empty());
    }

    #[test]
    fn test_edits_mark_edited_and_invalidate_histogram() {
        let mut alignment = alignment(&[("a", "ACGT"), ("b", "ACGT")]);
        assert!(!alignment.is_edited_after_last_save());
        assert_eq!(alignment.histogram().count(1, b'C'), 2);
        let version = alignment.content_version();

        alignment.set_selection_at(1, 0, true);
        assert_eq!(alignment.content_version(), version);
        assert!(!alignment.is_edited_after_last_save());

        alignment.replace_selected_with_char(b'G');
        assert!(alignment.content_version() > version);
        assert!(alignment.is_edited_after_last_save());
        assert_eq!(alignment.histogram().count(1, b'C'), 1);
        assert_eq!(alignment.histogram().count(1, b'G'), 1);
    }

    #[test]
    fn test_translation_view_histogram() {
        let mut alignment = alignment(&[("a", "ATGGCC"), ("b", "ATGGCA")]);
        alignment.set_translation_view(true);
        assert!(!alignment.is_editable());
        let histogram = alignment.histogram();
        assert_eq!(histogram.width(), 2);
        assert_eq!(histogram.count(0, b'M'), 2);
    }

    #[test]
    fn test_mask_delete_keeps_meta_in_step() {
        let (mut alignment, rx) = with_channel(&[("a", "ACGTAC"), ("b", "A-GTA-")]);
        alignment.add_charset_from_selection("none");
        let mask = [false, true, false, false, true, false];
        assert_eq!(alignment.delete_bases_from_mask(&mask), Ok(true));
        assert_eq!(alignment.width(), 4);
        assert_eq!(alignment.meta().excludes().len(), 4);
        assert_eq!(alignment.meta().codon_positions().len(), 4);
        assert!(alignment.sequences().iter().all(|s| s.len() == 4));
        assert_eq!(kinds(&rx), vec![ChangeKind::SequencesChanged]);

        assert!(matches!(
            alignment.delete_bases_from_mask(&[true]),
            Err(EditError::MaskLength { expected: 4, found: 1 })
        ));
        assert_eq!(alignment.width(), 4);
        assert!(kinds(&rx).is_empty());
    }

    #[test]
    fn test_delete_excluded_and_vertical_gaps() {
        let mut alignment = alignment(&[("a", "AC-GT"), ("b", "AT-GA")]);
        assert!(alignment.remove_vertical_gaps());
        assert_eq!(alignment.sequences().get(0).unwrap().as_string(), "ACGT");
        assert!(!alignment.remove_vertical_gaps());

        alignment.set_selection_within(SelectionRect::new(1, 0, 1, 1), true);
        assert!(alignment.add_selection_to_excludes());
        assert!(!alignment.add_selection_to_excludes());
        assert_eq!(alignment.delete_all_excluded_columns(), Ok(true));
        assert_eq!(alignment.sequences().get(1).unwrap().as_string(), "AGA");
        assert!(!alignment.meta().excludes().any());
    }

    #[test]
    fn test_reverse_complement_mirrors_meta() {
        let mut alignment = alignment(&[("a", "AACGT"), ("b", "AAC")]);
        alignment.set_selection_at(0, 0, true);
        alignment.add_selection_to_excludes();
        assert!(alignment.reverse_complement_alignment());
        assert_eq!(alignment.sequences().get(0).unwrap().as_string(), "ACGTT");
        assert_eq!(alignment.sequences().get(1).unwrap().as_string(), "--GTT");
        assert!(alignment.is_excluded(4));
        assert!(!alignment.is_excluded(0));
    }

    #[test]
    fn test_insert_gap_repads_and_resizes_meta() {
        let mut alignment = alignment(&[("a", "ACGT"), ("b", "ACGT")]);
        alignment.set_selection_at(1, 0, true);
        let prior = alignment.insert_gap_left_of_selection_move_right();
        assert_eq!(prior.len(), 1);
        assert_eq!(alignment.sequences().get(0).unwrap().as_string(), "A-CGT");
        assert_eq!(alignment.sequences().get(1).unwrap().as_string(), "ACGT-");
        assert_eq!(alignment.meta().width(), 5);

        assert!(alignment.undo(prior));
        assert_eq!(alignment.sequences().get(0).unwrap().as_string(), "ACGT-");
    }

    #[test]
    fn test_insert_gap_columns_shifts_meta() {
        let (mut alignment, rx) = with_channel(&[("a", "ATGGCC"), ("b", "ATG")]);
        alignment.set_selection_within(SelectionRect::new(3, 0, 5, 0), true);
        assert!(alignment.add_charset_from_selection("second"));
        assert!(alignment.add_selection_to_excludes());
        kinds(&rx);

        assert!(alignment.insert_gap_columns(3, 2));
        assert_eq!(alignment.sequences().get(0).unwrap().as_string(), "ATG--GCC");
        assert_eq!(alignment.sequences().get(1).unwrap().as_string(), "ATG-----");
        assert_eq!(alignment.meta().width(), 8);
        assert!(!alignment.is_excluded(3));
        assert!(alignment.is_excluded(5));
        assert_eq!(alignment.codon_pos_at(3), 0);
        assert_eq!(alignment.codon_pos_at(5), 1);
        assert_eq!(
            alignment.meta().charset("second").unwrap().as_ranges(),
            vec![ColumnRange::new(5, 7)]
        );
        assert_eq!(kinds(&rx), vec![ChangeKind::SequencesChanged]);

        assert!(!alignment.insert_gap_columns(0, 0));
        assert!(alignment.insert_gap_columns(100, 1));
        assert_eq!(alignment.width(), 9);
        assert_eq!(alignment.meta().width(), 9);
    }

    #[test]
    fn test_selection_as_coding_and_charsets() {
        let (mut alignment, rx) = with_channel(&[("a", "ACGTACGTA")]);
        alignment.set_selection_within(SelectionRect::new(3, 0, 5, 0), true);
        assert!(alignment.set_selection_as_non_coding());
        assert_eq!(alignment.codon_pos_at(3), 0);
        assert!(alignment.set_selection_as_coding(1));
        assert_eq!(alignment.codon_pos_at(3), 2);
        assert_eq!(alignment.codon_pos_at(4), 3);
        assert_eq!(alignment.codon_pos_at(5), 1);

        assert!(alignment.add_charset_from_selection("middle"));
        assert_eq!(
            alignment.meta().charset("middle").unwrap().as_ranges(),
            vec![ColumnRange::new(3, 5)]
        );
        alignment.clear_selection();
        assert!(alignment.select_charset("middle"));
        assert_eq!(alignment.selection_size(), 3);
        assert!(!alignment.select_charset("missing"));

        let events = kinds(&rx);
        assert_eq!(events.iter().filter(|k| **k == ChangeKind::AlignmentMetaChanged).count(), 3);
    }

    #[test]
    fn test_merge_two_selected() {
        let (mut alignment, rx) = with_channel(&[("a", "AC--"), ("b", "--GT"), ("c", "TTTT")]);
        alignment.select_rows(&[0, 1]);
        kinds(&rx);
        assert!(alignment.merge_two_selected(false));
        assert_eq!(alignment.len(), 2);
        assert_eq!(alignment.sequences().get(0).unwrap().as_string(), "ACGT");
        assert_eq!(kinds(&rx), vec![ChangeKind::NewSequences]);

        alignment.select_rows(&[0]);
        assert!(!alignment.merge_two_selected(false));
    }

    #[test]
    fn test_sort_and_remove_events() {
        let (mut alignment, rx) = with_channel(&[("b", "AC"), ("a", "--"), ("c", "GT")]);
        assert!(alignment.sort_sequences_by_name());
        assert!(!alignment.sort_sequences_by_name());
        assert_eq!(alignment.delete_empty_sequences().len(), 1);
        assert!(alignment.delete_sequence(7).is_err());
        assert_eq!(
            kinds(&rx),
            vec![ChangeKind::SequenceOrderChanged, ChangeKind::SequencesRemoved]
        );
    }

    #[test]
    fn test_removing_rows_shrinks_meta() {
        let mut alignment = alignment(&[("a", "AC"), ("b", "------")]);
        alignment.set_selection_within(SelectionRect::new(4, 1, 5, 1), true);
        assert!(alignment.add_selection_to_excludes());
        assert_eq!(alignment.delete_empty_sequences().len(), 1);
        assert_eq!(alignment.width(), 2);
        assert_eq!(alignment.meta().width(), alignment.width());
        assert!(!alignment.meta().excludes().any());

        let mut unpadded = self::alignment(&[("a", "AC"), ("b", "ACGTAA")]);
        assert_eq!(unpadded.meta().width(), 6);
        assert_eq!(unpadded.delete_sequence(1).unwrap().name, "b");
        assert_eq!(unpadded.width(), 2);
        assert_eq!(unpadded.meta().width(), unpadded.width());
    }

    #[test]
    fn test_add_fasta_text() {
        let (mut alignment, rx) = with_channel(&[("a", "ACGT")]);
        assert_eq!(alignment.add_fasta_text(">b\nAC\n>c\nACGTAA\n").unwrap(), 2);
        assert_eq!(alignment.len(), 3);
        assert_eq!(alignment.width(), 6);
        assert_eq!(alignment.meta().width(), 6);
        assert_eq!(alignment.sequences().get(1).unwrap().as_string(), "AC----");
        assert_eq!(kinds(&rx), vec![ChangeKind::NewSequences]);
    }

    #[test]
    fn test_translated_alignment() {
        let mut alignment = alignment(&[("a", "ATGGCCTTT"), ("b", "ATG---TTT")]);
        alignment.set_selection_within(SelectionRect::new(6, 0, 8, 1), true);
        alignment.add_charset_from_selection("third");
        let translated = alignment.translated_alignment();
        assert!(translated.is_amino_acid_alignment());
        assert_eq!(translated.sequences().get(0).unwrap().as_string(), "MAF");
        assert_eq!(translated.sequences().get(1).unwrap().as_string(), "M-F");
        assert_eq!(
            translated.meta().charset("third").unwrap().as_ranges(),
            vec![ColumnRange::single(2)]
        );
    }

    #[test]
    fn test_find_primer_in_selection() {
        let mut alignment = alignment(&[
            ("a", "ACGTTGCAAGCTTGACCTGAAC"),
            ("b", "ACGTTGCAAGCTTGACCTGGAC"),
        ]);
        let settings = PrimerSettings {
            min_len: 20,
            max_len: 20,
            min_tm: 0.0,
            max_tm: 100.0,
            ..PrimerSettings::default()
        };
        assert!(alignment.find_primer_in_selection(&settings).is_empty());
        alignment.select_all();
        let primers = alignment.find_primer_in_selection(&settings);
        assert_eq!(primers.len(), 3);
        assert_eq!(primers[0].sequence, "ACGTTGCAAGCTTGACCTGR");
        assert_eq!(primers[0].position, 0);
        assert_eq!(primers[0].degenerate_fold, 2);
    }

    #[test]
    fn test_primer_positions_in_split_selection() {
        let mut alignment = alignment(&[("a", "ACGTTGCA")]);
        alignment.set_selection_within(SelectionRect::new(0, 0, 1, 0), true);
        alignment.set_selection_within(SelectionRect::new(4, 0, 7, 0), true);
        let settings = PrimerSettings {
            min_len: 4,
            max_len: 4,
            min_tm: f64::NEG_INFINITY,
            max_tm: f64::INFINITY,
            ..PrimerSettings::default()
        };
        let mut positions: Vec<usize> = alignment
            .find_primer_in_selection(&settings)
            .iter()
            .map(|p| p.position)
            .collect();
        positions.sort();
        assert_eq!(positions, vec![0, 1, 4]);
    }

    #[test]
    fn test_find_selects_and_notifies() {
        let (mut alignment, rx) = with_channel(&[("alpha", "ACGT"), ("beta", "GGCC")]);
        let hit = alignment.find(&FindRequest::sequences("gcc")).unwrap().unwrap();
        assert_eq!((hit.row, hit.start, hit.end), (1, 1, 3));
        assert_eq!(kinds(&rx), vec![ChangeKind::SelectionChanged]);
        assert!(alignment.find(&FindRequest::sequences("TTT")).unwrap().is_none());
        assert!(kinds(&rx).is_empty());
    }

    #[test]
    fn test_closure_sink_counts_events() {
        use std::sync::{Arc, Mutex};
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut alignment = alignment(&[("a", "AC")]);
        let id = alignment.id();
        let sink_seen = Arc::clone(&seen);
        alignment.set_event_sink(move |event: AlignmentEvent| sink_seen.lock().unwrap().push(event));
        alignment.complement_alignment();
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].alignment, id);
    }

    #[test]
    fn test_charset_stats_and_duplicates() {
        let mut alignment = alignment(&[("a", "ACGT"), ("b", "ACGT"), ("c", "AGGT")]);
        alignment.select_all();
        alignment.add_charset_from_selection("all");
        let stats = alignment.charset_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].consensus, "ASGT");
        assert_eq!(alignment.find_duplicates(), vec![vec!["a".to_string(), "b".to_string()]]);
    }
}
