//! Change notifications pushed by an [`Alignment`](crate::alignment::Alignment).
//!
//! Every committed mutation produces exactly one [`AlignmentEvent`]. Events
//! are delivered synchronously on the thread that performed the mutation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

/// Process-unique alignment identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlignmentId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl AlignmentId {
    pub fn next() -> Self {
        AlignmentId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Residues changed in place or the width changed.
    SequencesChanged,
    SelectionChanged,
    /// Rows were appended or the whole alignment was (re)loaded.
    NewSequences,
    SequenceOrderChanged,
    /// Excludes, codon positions, charsets or the reading frame changed.
    AlignmentMetaChanged,
    SequencesRemoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentEvent {
    pub alignment: AlignmentId,
    pub kind: ChangeKind,
}

/// Receiver of alignment change notifications.
pub trait EventSink: Send {
    fn notify(&mut self, event: AlignmentEvent);
}

impl EventSink for Sender<AlignmentEvent> {
    fn notify(&mut self, event: AlignmentEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(event);
    }
}

impl<F> EventSink for F
where
    F: FnMut(AlignmentEvent) + Send,
{
    fn notify(&mut self, event: AlignmentEvent) {
        self(event)
    }
}
