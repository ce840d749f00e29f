/*!
 * Deterministic text chunking.
 *
 * Long documents are split into chunks no longer than `chunk_size` characters.
 * Cuts prefer the highest-priority separator available in a span (paragraph
 * break, line break, sentence terminal, comma, space) and fall back to a hard
 * per-character cut. Consecutive chunks share up to `overlap` trailing
 * characters so the model sees the preceding context. A separator stays at the
 * end of the piece it terminates, so sentences keep their full stop.
 *
 * Lengths are counted in Unicode scalar values, so CJK text is measured the
 * same way as Latin text.
 *
 * The output only depends on the input text and parameters. Resume relies on
 * this: stored progress indices must point at the same chunks after a restart.
 */

use std::collections::VecDeque;

use crate::errors::ChunkingError;

/// Default maximum chunk length in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters
pub const DEFAULT_OVERLAP: usize = 100;

/// Separators in preference order
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ".", "。", "!", "?", ",", "、", " "];

/// Recursive separator-preference splitter
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separators
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge { overlap, chunk_size });
        }

        Ok(Self {
            chunk_size,
            overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator preference list
    ///
    /// Empty separators are ignored; the hard cut is always the last resort.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into ordered chunks
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let position = separators.iter().position(|sep| text.contains(sep.as_str()));

        let (pieces, remaining): (Vec<&str>, &[String]) = match position {
            Some(i) => (
                text.split_inclusive(separators[i].as_str()).collect(),
                &separators[i + 1..],
            ),
            // Hard cut: every character becomes its own piece
            None => (
                text.char_indices()
                    .map(|(start, c)| &text[start..start + c.len_utf8()])
                    .collect(),
                &[],
            ),
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            chunks.extend(self.split_recursive(piece, remaining));
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying a tail into the next chunk
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_chunk(&mut chunks, &window);

                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            push_chunk(&mut chunks, &window);
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Split text with the default separators
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, ChunkingError> {
    Ok(TextSplitter::new(chunk_size, overlap)?.split(text))
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
