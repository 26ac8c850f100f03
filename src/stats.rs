//! Knowledge store statistics.
//!
//! Quick summary of what's ingested: chunk totals and a per-source
//! breakdown from the ingestion ledger. Used by `cpl stats` to give
//! confidence that ingestion is doing what it should.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_chunks = store::count_all(&pool).await?;
    let sources = store::list_sources(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Content Pipeline — Knowledge Store Stats");
    println!("========================================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Sources:   {}", sources.len());
    println!("  Chunks:    {}", total_chunks);

    if !sources.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<28} {:>8}   {}", "SOURCE", "CHUNKS", "LAST INGEST");
        println!("  {}", "-".repeat(60));

        for record in &sources {
            println!(
                "  {:<28} {:>8}   {}",
                record.source,
                record.chunk_count,
                format_ts_relative(record.updated_at)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
