//! # Text Chunking
//!
//! Splits extracted document text into paragraph-based chunks. Paragraphs are
//! separated by blank lines; a paragraph longer than the chunk size is split by
//! character count with an overlap between consecutive pieces.

use tracing::warn;

/// Limits for splitting text into chunks, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            overlap: 200,
        }
    }
}

/// Chunks `text` by paragraph. Returns an empty list for blank input.
pub fn chunk_text(text: &str, limits: ChunkLimits) -> Vec<String> {
    let size = limits.chunk_size.max(1);
    let mut chunks = Vec::new();

    for paragraph in text.trim().split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        let length = paragraph.chars().count();
        if length <= size {
            chunks.push(paragraph.to_string());
        } else {
            warn!(
                "Paragraph exceeds chunk size limit ({} > {}). Splitting by character.",
                length, size
            );
            chunks.extend(split_long_text(paragraph, size, limits.overlap));
        }
    }

    chunks
}

fn split_long_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
