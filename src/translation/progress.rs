/*!
 * Durable progress snapshot.
 *
 * The snapshot is a JSON object holding one array, `translated_chunks`, with
 * one entry per chunk: the translated text, or `null` while pending. Position
 * in the array is the chunk index. Every save rewrites the whole snapshot via
 * a temporary file in the same directory followed by a rename, so a crash
 * leaves either the previous snapshot or the new one on disk.
 */

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::errors::ProgressError;

/// On-disk form of the result slots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub translated_chunks: Vec<Option<String>>,
}

/// File-backed progress store at a single well-known location
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot is present
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the snapshot, or an all-pending list of `expected_len` if absent
    pub fn load(&self, expected_len: usize) -> Result<Vec<Option<String>>, ProgressError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![None; expected_len]),
            Err(source) => {
                return Err(ProgressError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let snapshot: ProgressSnapshot =
            serde_json::from_str(&content).map_err(|source| ProgressError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if snapshot.translated_chunks.len() != expected_len {
            return Err(ProgressError::SnapshotMismatch {
                expected: expected_len,
                found: snapshot.translated_chunks.len(),
            });
        }

        debug!(
            "Loaded progress snapshot from {:?} ({} of {} chunks done)",
            self.path,
            snapshot.translated_chunks.iter().filter(|c| c.is_some()).count(),
            expected_len
        );

        Ok(snapshot.translated_chunks)
    }

    /// Atomically replace the snapshot with the given slots
    pub fn save(&self, results: &[Option<String>]) -> Result<(), ProgressError> {
        let snapshot = ProgressSnapshot {
            translated_chunks: results.to_vec(),
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|source| ProgressError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| self.io_error(source))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|source| self.io_error(source))?;
        temp.write_all(json.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|source| self.io_error(source))?;
        temp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        Ok(())
    }

    /// Delete the snapshot; succeeds when it is already gone
    pub fn clear(&self) -> Result<(), ProgressError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed progress snapshot {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> ProgressError {
        ProgressError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
