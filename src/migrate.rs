use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Chunk rows. `data_type` identifies this pipeline's rows in the table;
    // `content` carries the JSON-encoded chunk payload.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_chunks (
            id TEXT PRIMARY KEY,
            data_type TEXT NOT NULL,
            content TEXT NOT NULL,
            source TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Per-source ingestion ledger
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            source TEXT PRIMARY KEY,
            title TEXT,
            dedup_hash TEXT NOT NULL,
            chunk_count INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_knowledge_chunks_source ON knowledge_chunks(source)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_knowledge_chunks_data_type ON knowledge_chunks(data_type)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
