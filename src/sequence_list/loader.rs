//! Background parsing for file-backed lists.
//!
//! The worker thread parses the file and sends one [`LoadMessage`]. The
//! owning thread picks it up with [`PendingLoad::try_take`], so rows, meta
//! and cached state are only ever touched by the owner.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use log::{debug, info};

use crate::formats::{self, LoadedFile};

#[derive(Debug)]
pub enum LoadMessage {
    Loaded(LoadedFile),
    Failed(String),
}

/// A load in progress.
#[derive(Debug)]
pub struct PendingLoad {
    rx: Receiver<LoadMessage>,
    handle: Option<JoinHandle<()>>,
}

/// Starts parsing `path` on a new thread.
pub fn spawn(path: PathBuf) -> PendingLoad {
    let (tx, rx) = channel();
    let handle = thread::spawn(move || {
        debug!("Loading {} in the background", path.display());
        let message = match formats::read_alignment(&path, None) {
            Ok(loaded) => {
                info!("Loaded {} sequences from {}", loaded.sequences.len(), path.display());
                LoadMessage::Loaded(loaded)
            }
            Err(e) => LoadMessage::Failed(e.to_string()),
        };
        let _ = tx.send(message);
    });
    PendingLoad {
        rx,
        handle: Some(handle),
    }
}

impl PendingLoad {
    /// Returns the result if the worker has finished.
    pub fn try_take(&mut self) -> Option<LoadMessage> {
        match self.rx.try_recv() {
            Ok(message) => {
                self.join();
                Some(message)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(LoadMessage::Failed("loader thread exited without a result".to_string()))
            }
        }
    }

    /// Blocks until the worker finishes.
    pub fn wait(mut self) -> LoadMessage {
        let message = self
            .rx
            .recv()
            .unwrap_or_else(|_| LoadMessage::Failed("loader thread exited without a result".to_string()));
        self.join();
        message
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_background_load_delivers_rows() {
        let mut file = tempfile::Builder::new().suffix(".fasta").tempfile().unwrap();
        write!(file, ">s1\nACGT\n>s2\nAC-T\n").unwrap();

        let pending = spawn(file.path().to_path_buf());
        match pending.wait() {
            LoadMessage::Loaded(loaded) => {
                assert_eq!(loaded.sequences.len(), 2);
                assert_eq!(loaded.sequences[1].as_string(), "AC-T");
            }
            LoadMessage::Failed(e) => panic!("load failed: {e}"),
        }
    }

    #[test]
    fn test_background_load_reports_failure() {
        let pending = spawn(PathBuf::from("/nonexistent/alignment.fasta"));
        assert!(matches!(pending.wait(), LoadMessage::Failed(_)));
    }
}
