//! Heading-boundary text chunker.
//!
//! Splits document body text into chunks that respect a configurable soft
//! size limit. Splitting occurs on heading boundaries (lines opening with
//! one to three `#` markers) so a section is never cut mid-paragraph.
//!
//! Each chunk receives a deterministic ID derived from its document ID and
//! index, so re-chunking the same document yields the same row keys.

use crate::models::{Chunk, Document};

/// Soft size target for a single chunk, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1500;

/// Split text into section strings on heading boundaries, greedily packing
/// sections up to `max_chunk_size`. Returns at least one chunk for non-empty
/// input; a single section larger than the limit is emitted whole.
pub fn split_sections(content: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();

    for fragment in split_at_headings(content) {
        // If adding this section would exceed the limit, flush the buffer
        if !buf.is_empty() && buf.len() + fragment.len() > max_chunk_size {
            if !buf.trim().is_empty() {
                chunks.push(buf.trim().to_string());
            }
            buf.clear();
        }
        buf.push_str(fragment);
    }

    // Flush remaining
    if !buf.trim().is_empty() {
        chunks.push(buf.trim().to_string());
    }

    // Guarantee at least one chunk
    if chunks.is_empty() && !content.is_empty() {
        chunks.push(content.trim().to_string());
    }

    chunks
}

/// Chunk a document's body and wrap the sections as [`Chunk`] records with
/// contiguous indices starting at 0.
pub fn chunk_document(doc: &Document, max_chunk_size: usize) -> Vec<Chunk> {
    let sections = split_sections(&doc.raw_content, max_chunk_size);
    let total = sections.len() as i64;

    sections
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            chunk_id: format!("{}-{}", doc.id, i),
            document_id: doc.id.clone(),
            index: i as i64,
            total_chunks: total,
            text,
            source: doc.source.clone(),
            category: doc.category.clone(),
            tags: doc.tags.clone(),
        })
        .collect()
}

/// Split content into fragments, each starting at a heading line (except
/// possibly the first). Fragments concatenate back to the original content.
fn split_at_headings(content: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut fragment_start = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        if is_heading(line) && offset > fragment_start {
            fragments.push(&content[fragment_start..offset]);
            fragment_start = offset;
        }
        offset += line.len();
    }

    if fragment_start < content.len() {
        fragments.push(&content[fragment_start..]);
    }

    fragments
}

/// A heading line opens with 1–3 `#` markers followed by whitespace.
fn is_heading(line: &str) -> bool {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    (1..=3).contains(&hashes) && matches!(line.as_bytes().get(hashes), Some(&b' ') | Some(&b'\t'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str) -> Document {
        Document {
            id: "doc1".to_string(),
            title: "Test".to_string(),
            raw_content: content.to_string(),
            source: "test".to_string(),
            category: "general".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_sections("Hello, world!", DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_no_headings_oversized_emitted_whole() {
        let text = "z".repeat(4000);
        let chunks = split_sections(&text, DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4000);
    }

    #[test]
    fn test_two_sections_split_at_limit() {
        let text = format!("# A\n{}\n# B\n{}", "x".repeat(1000), "y".repeat(1000));
        let chunks = split_sections(&text, 1500);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# A"));
        assert!(chunks[1].starts_with("# B"));
    }

    #[test]
    fn test_small_sections_packed_together() {
        let text = "# One\nalpha\n## Two\nbeta\n### Three\ngamma";
        let chunks = split_sections(text, DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("alpha"));
        assert!(chunks[0].contains("gamma"));
    }

    #[test]
    fn test_oversized_section_never_truncated() {
        let text = format!("# Big\n{}\n# Small\ntail", "x".repeat(5000));
        let chunks = split_sections(&text, 1500);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].len() > 5000, "oversized section must stay whole");
        assert!(chunks[1].starts_with("# Small"));
    }

    #[test]
    fn test_order_reconstructs_content() {
        let text = format!(
            "intro text\n# First\n{}\n## Second\n{}\n### Third\n{}",
            "a".repeat(800),
            "b".repeat(800),
            "c".repeat(800)
        );
        let chunks = split_sections(&text, 1000);
        assert!(!chunks.is_empty());

        // Concatenating chunks in order, ignoring seam whitespace, must
        // reproduce the original character sequence.
        let joined: String = chunks.join("");
        let stripped: String = joined.chars().filter(|c| !c.is_whitespace()).collect();
        let expected: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(stripped, expected);
    }

    #[test]
    fn test_size_limit_respected_for_divisible_input() {
        let sections: Vec<String> = (0..20).map(|i| format!("# S{}\n{}", i, "w".repeat(200))).collect();
        let text = sections.join("\n");
        for chunk in split_sections(&text, 700) {
            assert!(chunk.len() <= 700, "chunk exceeded limit: {}", chunk.len());
        }
    }

    #[test]
    fn test_chunks_trimmed() {
        let text = "# A\nbody\n\n\n# B\ntail\n\n";
        for chunk in split_sections(text, 10) {
            assert_eq!(chunk, chunk.trim());
        }
    }

    #[test]
    fn test_four_hash_line_is_not_a_boundary() {
        let text = format!("# A\n{}\n#### deep heading\n{}", "x".repeat(1000), "y".repeat(1000));
        let chunks = split_sections(&text, 1500);
        assert_eq!(chunks.len(), 1, "#### must not open a new section");
    }

    #[test]
    fn test_hash_without_space_is_not_a_boundary() {
        let text = format!("# A\n{}\n#hashtag\n{}", "x".repeat(1000), "y".repeat(1000));
        let chunks = split_sections(&text, 1500);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunk_document_ids_and_indices() {
        let text = format!("# A\n{}\n# B\n{}", "x".repeat(1000), "y".repeat(1000));
        let chunks = chunk_document(&doc(&text), 1500);
        assert_eq!(chunks.len(), 2);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_id, format!("doc1-{}", i));
            assert_eq!(c.index, i as i64);
            assert_eq!(c.total_chunks, 2);
            assert_eq!(c.source, "test");
        }
    }

    #[test]
    fn test_deterministic() {
        let text = format!("# A\n{}\n# B\n{}", "p".repeat(900), "q".repeat(900));
        let a = chunk_document(&doc(&text), 1200);
        let b = chunk_document(&doc(&text), 1200);
        assert_eq!(a, b);
    }
}
