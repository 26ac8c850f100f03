//! Knowledge store: chunk persistence keyed by document `source`.
//!
//! Re-ingesting a source is logically idempotent: the previous chunk set is
//! deleted and the new one inserted inside a single transaction, so readers
//! never observe a mixed old/new state after commit. Persistence errors
//! propagate to the caller; ingestion failures must surface loudly.
//!
//! Serializing concurrent re-ingestion of the *same* source is the caller's
//! responsibility; two racing replaces serialize at the database but
//! last-writer-wins between them is not adjudicated here.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::models::Chunk;

/// Identifies this pipeline's rows in the `knowledge_chunks` table.
pub const CHUNK_DATA_TYPE: &str = "knowledge_chunk";

/// JSON payload stored in the `content` column of a chunk row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub title: String,
    pub chunk: String,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub source: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// A row of the per-source ingestion ledger.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub source: String,
    pub title: Option<String>,
    pub dedup_hash: String,
    pub chunk_count: i64,
    pub updated_at: i64,
}

/// Replace every chunk stored under `source` with the given set.
pub async fn replace_by_source(
    pool: &SqlitePool,
    source: &str,
    title: &str,
    chunks: &[Chunk],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM knowledge_chunks WHERE source = ?")
        .bind(source)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        let payload = ChunkPayload {
            title: title.to_string(),
            chunk: chunk.text.clone(),
            chunk_index: chunk.index,
            total_chunks: chunk.total_chunks,
            source: chunk.source.clone(),
            category: chunk.category.clone(),
            tags: chunk.tags.clone(),
        };

        sqlx::query("INSERT INTO knowledge_chunks (id, data_type, content, source) VALUES (?, ?, ?, ?)")
            .bind(&chunk.chunk_id)
            .bind(CHUNK_DATA_TYPE)
            .bind(serde_json::to_string(&payload)?)
            .bind(source)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Number of chunks currently stored under `source`.
pub async fn count_by_source(pool: &SqlitePool, source: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM knowledge_chunks WHERE source = ? AND data_type = ?",
    )
    .bind(source)
    .bind(CHUNK_DATA_TYPE)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Total chunk count across all sources.
pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_chunks WHERE data_type = ?")
        .bind(CHUNK_DATA_TYPE)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Dedup hash recorded at the last ingestion of `source`, if any.
pub async fn source_hash(pool: &SqlitePool, source: &str) -> Result<Option<String>> {
    let hash: Option<String> = sqlx::query_scalar("SELECT dedup_hash FROM sources WHERE source = ?")
        .bind(source)
        .fetch_optional(pool)
        .await?;

    Ok(hash)
}

/// Record (or refresh) the ingestion ledger entry for `source`.
pub async fn upsert_source(
    pool: &SqlitePool,
    source: &str,
    title: &str,
    dedup_hash: &str,
    chunk_count: i64,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO sources (source, title, dedup_hash, chunk_count, updated_at) VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(source) DO UPDATE SET
            title = excluded.title,
            dedup_hash = excluded.dedup_hash,
            chunk_count = excluded.chunk_count,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(source)
    .bind(title)
    .bind(dedup_hash)
    .bind(chunk_count)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// All ledger entries, most recently ingested first.
pub async fn list_sources(pool: &SqlitePool) -> Result<Vec<SourceRecord>> {
    let rows = sqlx::query(
        "SELECT source, title, dedup_hash, chunk_count, updated_at FROM sources ORDER BY updated_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SourceRecord {
            source: row.get("source"),
            title: row.get("title"),
            dedup_hash: row.get("dedup_hash"),
            chunk_count: row.get("chunk_count"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}
