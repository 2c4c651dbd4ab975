//! # Message Body Chunking
//!
//! Splits long message bodies for the Mirror Store's document-size limits.
//!
//! ## Split Policy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         TEXT CHUNKING                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Input: full message text                                               │
//! │                                                                         │
//! │  len <= HEAD limit:                                                     │
//! │    text_head = full text, has_chunks = false, no blob                   │
//! │                                                                         │
//! │  len > HEAD limit:                                                      │
//! │    text_head = bounded prefix (UTF-8 boundary snapped)                  │
//! │    remainder -> ordered parts of at most CHUNK_PART_MAX_BYTES           │
//! │    blob = { parts, total_len, sha256(full text) }                       │
//! │    stored under (chat_id, message_id)                                   │
//! │                                                                         │
//! │  Reassembly: head + parts, then verify length and checksum.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::mirror::ChunkBlob;

/// Largest body stored inline in the message document (bytes)
pub const TEXT_HEAD_MAX_BYTES: usize = 4096;

/// Largest single remainder part (bytes)
pub const CHUNK_PART_MAX_BYTES: usize = 256 * 1024;

/// Result of splitting a message body for upload
#[derive(Debug, Clone)]
pub struct SplitText {
    /// Inline portion; the full text when `blob` is None
    pub head: String,
    /// Externally stored remainder, present only for long bodies
    pub blob: Option<ChunkBlob>,
}

impl SplitText {
    /// Whether the body needed an external chunk blob
    pub fn has_chunks(&self) -> bool {
        self.blob.is_some()
    }
}

/// Largest prefix of `s` that is at most `max` bytes and ends on a char
/// boundary.
fn boundary_prefix(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Split a message body according to the chunking policy.
///
/// Bodies at or under [`TEXT_HEAD_MAX_BYTES`] are returned whole with no
/// blob. Longer bodies get a boundary-snapped head plus an ordered list
/// of remainder parts and an integrity checksum over the full text.
pub fn split_text(text: &str) -> SplitText {
    if text.len() <= TEXT_HEAD_MAX_BYTES {
        return SplitText {
            head: text.to_string(),
            blob: None,
        };
    }

    let head_end = boundary_prefix(text, TEXT_HEAD_MAX_BYTES);
    let head = text[..head_end].to_string();

    let mut parts = Vec::new();
    let mut rest = &text[head_end..];
    while !rest.is_empty() {
        let end = boundary_prefix(rest, CHUNK_PART_MAX_BYTES);
        parts.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    let checksum = hex::encode(Sha256::digest(text.as_bytes()));

    SplitText {
        head,
        blob: Some(ChunkBlob {
            parts,
            total_len: text.len(),
            checksum,
        }),
    }
}

/// Reassemble a full message body from its head and chunk blob.
///
/// Verifies the recorded length and SHA-256 checksum; a mismatch means
/// the mirror holds a torn or corrupted write.
pub fn reassemble(head: &str, blob: &ChunkBlob) -> Result<String> {
    let mut full = String::with_capacity(blob.total_len);
    full.push_str(head);
    for part in &blob.parts {
        full.push_str(part);
    }

    if full.len() != blob.total_len {
        return Err(Error::Corrupted(format!(
            "Chunk blob length mismatch: expected {} bytes, reassembled {}",
            blob.total_len,
            full.len()
        )));
    }

    let checksum = hex::encode(Sha256::digest(full.as_bytes()));
    if checksum != blob.checksum {
        return Err(Error::Corrupted(format!(
            "Chunk blob checksum mismatch: expected {}, got {}",
            blob.checksum, checksum
        )));
    }

    Ok(full)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_stays_inline() {
        let split = split_text("hello");
        assert_eq!(split.head, "hello");
        assert!(!split.has_chunks());
    }

    #[test]
    fn test_exact_threshold_stays_inline() {
        let text = "a".repeat(TEXT_HEAD_MAX_BYTES);
        let split = split_text(&text);
        assert_eq!(split.head.len(), TEXT_HEAD_MAX_BYTES);
        assert!(!split.has_chunks());
    }

    #[test]
    fn test_one_past_threshold_chunks() {
        let text = "a".repeat(TEXT_HEAD_MAX_BYTES + 1);
        let split = split_text(&text);

        assert!(split.has_chunks());
        assert_eq!(split.head.len(), TEXT_HEAD_MAX_BYTES);

        let blob = split.blob.unwrap();
        assert_eq!(blob.parts.len(), 1);
        assert_eq!(blob.parts[0], "a");
        assert_eq!(blob.total_len, text.len());
    }

    #[test]
    fn test_round_trip_long_text() {
        let text = "The quick brown fox. ".repeat(50_000); // ~1 MB
        let split = split_text(&text);
        let blob = split.blob.as_ref().unwrap();

        assert!(blob.parts.iter().all(|p| p.len() <= CHUNK_PART_MAX_BYTES));
        assert!(blob.parts.len() > 1);

        let full = reassemble(&split.head, blob).unwrap();
        assert_eq!(full, text);
    }

    #[test]
    fn test_multibyte_boundary_is_respected() {
        // 4-byte scalar values straddling the head boundary
        let text = "🦀".repeat(TEXT_HEAD_MAX_BYTES);
        let split = split_text(&text);

        assert!(split.head.len() <= TEXT_HEAD_MAX_BYTES);
        assert!(split.head.chars().all(|c| c == '🦀'));

        let full = reassemble(&split.head, split.blob.as_ref().unwrap()).unwrap();
        assert_eq!(full, text);
    }

    #[test]
    fn test_corrupt_part_detected() {
        let text = "x".repeat(TEXT_HEAD_MAX_BYTES + 100);
        let split = split_text(&text);
        let mut blob = split.blob.unwrap();
        blob.parts[0] = blob.parts[0].replace('x', "y");

        let err = reassemble(&split.head, &blob).unwrap_err();
        assert!(matches!(err, Error::Corrupted(_)));
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_missing_part_detected() {
        let text = "x".repeat(TEXT_HEAD_MAX_BYTES + 100);
        let split = split_text(&text);
        let mut blob = split.blob.unwrap();
        blob.parts.clear();

        let err = reassemble(&split.head, &blob).unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn test_empty_text() {
        let split = split_text("");
        assert_eq!(split.head, "");
        assert!(!split.has_chunks());
    }
}
