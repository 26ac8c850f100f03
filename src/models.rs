//! Core data models used throughout the content pipeline.
//!
//! These types represent the documents, chunks, and match candidates that
//! flow through the ingestion, matching, and policy stages.

use serde::Deserialize;

/// A document submitted for ingestion, before chunking.
///
/// Documents are immutable: a new ingestion under the same `source` fully
/// supersedes the previous chunk set, so there is no update path.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub raw_content: String,
    pub source: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// A bounded fragment of a document, exclusively owned by the knowledge store.
///
/// `chunk_id` is `{document_id}-{index}`; indices are contiguous from 0 and
/// chunks sorted by `index` reconstruct the document's original order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub index: i64,
    pub total_chunks: i64,
    pub text: String,
    pub source: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// A matchable item in the static asset registry.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub source_label: Option<String>,
}

/// A scored match candidate returned by the matcher. Never persisted.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub asset: Asset,
    pub score: i64,
}
