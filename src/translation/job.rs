/*!
 * Translation job model.
 *
 * A job pairs the ordered chunk list with one result slot per chunk. A slot
 * holding `None` has not reached a terminal state yet; the progress snapshot
 * is exactly the list of slots.
 */

use std::time::Duration;

use crate::errors::ProgressError;

/// A bounded slice of the source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the document, starting at zero
    pub index: usize,
    /// Source text
    pub text: String,
}

/// Translation slot for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    /// Index of the chunk this slot belongs to
    pub index: usize,
    /// Translated text, or `None` while still pending
    pub translated_text: Option<String>,
}

/// Per-chunk state while the orchestrator works on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkState {
    /// Not translated yet; counts the slow attempts seen so far
    Pending { soft_timeouts: u32 },
    /// Translated successfully
    Done(String),
    /// Gave up; the sentinel stands in for the translation
    Failed { sentinel: String },
}

impl ChunkState {
    pub fn pending() -> Self {
        Self::Pending { soft_timeouts: 0 }
    }

    /// Whether the chunk will not be requested again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }

    /// Record a slow attempt, giving up once `limit` slow attempts were seen
    pub fn after_soft_timeout(self, limit: Option<u32>, sentinel: &str) -> Self {
        match self {
            Self::Pending { soft_timeouts } => {
                let soft_timeouts = soft_timeouts + 1;
                match limit {
                    Some(max) if soft_timeouts >= max => Self::Failed {
                        sentinel: sentinel.to_string(),
                    },
                    _ => Self::Pending { soft_timeouts },
                }
            }
            terminal => terminal,
        }
    }

    /// Text to store for a terminal state
    pub fn into_output(self) -> Option<String> {
        match self {
            Self::Pending { .. } => None,
            Self::Done(text) => Some(text),
            Self::Failed { sentinel } => Some(sentinel),
        }
    }
}

/// Result of a single translation call as seen by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The backend answered within the latency ceiling
    Translated(String),
    /// The backend answered too slowly; the answer was discarded
    SoftTimeout { elapsed: Duration },
}

/// Chunks, their result slots and the shared context
#[derive(Debug, Clone)]
pub struct TranslationJob {
    chunks: Vec<Chunk>,
    results: Vec<ChunkResult>,
    context: String,
}

impl TranslationJob {
    /// Create a job with every slot pending
    pub fn new(texts: Vec<String>, context: impl Into<String>) -> Self {
        let chunks: Vec<Chunk> = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { index, text })
            .collect();
        let results = chunks
            .iter()
            .map(|c| ChunkResult {
                index: c.index,
                translated_text: None,
            })
            .collect();

        Self {
            chunks,
            results,
            context: context.into(),
        }
    }

    /// Fill slots from a stored snapshot, returning how many were restored
    pub fn restore(&mut self, snapshot: Vec<Option<String>>) -> Result<usize, ProgressError> {
        if snapshot.len() != self.results.len() {
            return Err(ProgressError::SnapshotMismatch {
                expected: self.results.len(),
                found: snapshot.len(),
            });
        }

        let mut restored = 0;
        for (slot, stored) in self.results.iter_mut().zip(snapshot) {
            if stored.is_some() {
                restored += 1;
            }
            slot.translated_text = stored;
        }

        Ok(restored)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn results(&self) -> &[ChunkResult] {
        &self.results
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_done(&self, index: usize) -> bool {
        self.results
            .get(index)
            .is_some_and(|r| r.translated_text.is_some())
    }

    /// Store the output of a terminal chunk state
    pub fn record(&mut self, index: usize, text: String) {
        if let Some(slot) = self.results.get_mut(index) {
            slot.translated_text = Some(text);
        }
    }

    /// A job is complete once no slot is pending
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.translated_text.is_some())
    }

    /// Number of slots still pending
    pub fn pending_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.translated_text.is_none())
            .count()
    }

    /// Serializable view of the result slots
    pub fn snapshot(&self) -> Vec<Option<String>> {
        self.results
            .iter()
            .map(|r| r.translated_text.clone())
            .collect()
    }

    /// Join all translations in chunk order; `None` while any slot is pending
    pub fn assemble(&self, separator: &str) -> Option<String> {
        if !self.is_complete() {
            return None;
        }

        let parts: Vec<&str> = self
            .results
            .iter()
            .filter_map(|r| r.translated_text.as_deref())
            .collect();
        Some(parts.join(separator))
    }
}
