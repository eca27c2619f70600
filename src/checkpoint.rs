//! Model checkpointing.
//!
//! The trainer uses exactly two tags: `"latest"`, written on every completed
//! episode, and `"best"`, written when the running reward sets a new record.
//! At startup the coordinator loads `"latest"` if it exists.

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// IO error during save/load.
    Io(io::Error),
    /// Burn recorder error.
    Recorder(String),
    /// The requested tag has never been saved.
    NotFound(String),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::Recorder(e) => write!(f, "Recorder error: {}", e),
            CheckpointError::NotFound(tag) => write!(f, "no checkpoint tagged '{}'", tag),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Store for tagged model snapshots.
pub trait CheckpointStore<B: Backend, M: Module<B>>: Send + Sync {
    /// Save `model` under `tag`, replacing any previous snapshot.
    fn save(&self, model: &M, tag: &str) -> Result<(), CheckpointError>;

    /// Load the snapshot tagged `tag` into `template`.
    fn load(&self, template: M, tag: &str, device: &B::Device) -> Result<M, CheckpointError>;

    /// Whether a snapshot exists under `tag`.
    fn exists(&self, tag: &str) -> bool;
}

/// File-backed checkpoint store using burn's binary recorder.
///
/// Each tag maps to `<dir>/<tag>.bin`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", tag))
    }
}

impl<B: Backend, M: Module<B>> CheckpointStore<B, M> for FileCheckpointStore {
    fn save(&self, model: &M, tag: &str) -> Result<(), CheckpointError> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        model
            .clone()
            .save_file(self.path_for(tag), &recorder)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))
    }

    fn load(&self, template: M, tag: &str, device: &B::Device) -> Result<M, CheckpointError> {
        let path = self.path_for(tag);
        if !path.exists() {
            return Err(CheckpointError::NotFound(tag.to_string()));
        }
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        template
            .load_file(path, &recorder, device)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))
    }

    fn exists(&self, tag: &str) -> bool {
        self.path_for(tag).exists()
    }
}
