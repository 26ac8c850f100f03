//! Ingestion orchestration.
//!
//! Coordinates the full flow: file scan → document → chunking → knowledge
//! store replace, plus the per-source ledger that lets unchanged content be
//! skipped on re-ingestion. Persistence failures propagate: a failed
//! ingest must exit loudly, never drop content silently.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::chunker::chunk_document;
use crate::config::Config;
use crate::db;
use crate::models::Document;
use crate::store;

const INCLUDE_GLOBS: &[&str] = &["**/*.md", "**/*.txt"];

#[allow(clippy::too_many_arguments)]
pub async fn run_ingest(
    config: &Config,
    path: &Path,
    source: Option<String>,
    title: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    full: bool,
    dry_run: bool,
) -> Result<()> {
    let files = collect_files(path)?;
    if files.is_empty() {
        bail!("No ingestable files under {}", path.display());
    }
    if source.is_some() && files.len() > 1 {
        bail!(
            "--source applies to a single file; found {} files under {}",
            files.len(),
            path.display()
        );
    }

    let category = category.unwrap_or_else(|| "general".to_string());

    if dry_run {
        let mut estimated = 0usize;
        for (file, _) in &files {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            estimated += crate::chunker::split_sections(&raw, config.chunking.max_chunk_size).len();
        }
        println!("ingest {} (dry-run)", path.display());
        println!("  files found: {}", files.len());
        println!("  estimated chunks: {}", estimated);
        return Ok(());
    }

    let pool = db::connect(config).await?;

    let mut ingested = 0u64;
    let mut skipped = 0u64;
    let mut chunks_written = 0u64;

    for (file, default_source) in &files {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let source_key = source.clone().unwrap_or_else(|| default_source.clone());
        let doc_title = title
            .clone()
            .unwrap_or_else(|| file_stem(file));

        let dedup_hash = content_hash(&source_key, &raw);
        if !full && store::source_hash(&pool, &source_key).await? == Some(dedup_hash.clone()) {
            skipped += 1;
            continue;
        }

        let doc = Document {
            id: Uuid::new_v4().to_string(),
            title: doc_title,
            raw_content: raw,
            source: source_key,
            category: category.clone(),
            tags: tags.clone(),
        };

        let chunks = chunk_document(&doc, config.chunking.max_chunk_size);
        store::replace_by_source(&pool, &doc.source, &doc.title, &chunks).await?;
        store::upsert_source(&pool, &doc.source, &doc.title, &dedup_hash, chunks.len() as i64)
            .await?;

        ingested += 1;
        chunks_written += chunks.len() as u64;
    }

    println!("ingest {}", path.display());
    println!("  files: {}", files.len());
    println!("  ingested documents: {}", ingested);
    println!("  skipped (unchanged): {}", skipped);
    println!("  chunks written: {}", chunks_written);
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Resolve `path` to a list of `(file, default source key)` pairs. A single
/// file keys on its stem; files under a directory key on their relative
/// path with the extension stripped.
fn collect_files(path: &Path) -> Result<Vec<(PathBuf, String)>> {
    if path.is_file() {
        return Ok(vec![(path.to_path_buf(), file_stem(path))]);
    }
    if !path.is_dir() {
        bail!("Path does not exist: {}", path.display());
    }

    let include_set = build_globset(INCLUDE_GLOBS)?;
    let exclude_set = build_globset(&["**/.git/**", "**/node_modules/**"])?;

    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file = entry.path();
        let relative = file.strip_prefix(path).unwrap_or(file);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let source_key = relative
            .with_extension("")
            .to_string_lossy()
            .replace('\\', "/");
        files.push((file.to_path_buf(), source_key));
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.1.cmp(&b.1));

    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Dedup hash over the source key and raw content; identical re-ingestions
/// are skipped unless `--full` forces a rewrite.
fn content_hash(source: &str, raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_single_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("hydration-guide.md");
        fs::write(&file, "# Guide").unwrap();

        let files = collect_files(&file).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, "hydration-guide");
    }

    #[test]
    fn test_collect_files_directory_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("guides")).unwrap();
        fs::write(tmp.path().join("zeta.md"), "z").unwrap();
        fs::write(tmp.path().join("guides/alpha.txt"), "a").unwrap();
        fs::write(tmp.path().join("photo.png"), "binary").unwrap();

        let files = collect_files(tmp.path()).unwrap();
        let keys: Vec<&str> = files.iter().map(|(_, k)| k.as_str()).collect();
        assert_eq!(keys, vec!["guides/alpha", "zeta"]);
    }

    #[test]
    fn test_missing_path_errors() {
        assert!(collect_files(Path::new("/nonexistent/nowhere")).is_err());
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let a = content_hash("doc-1", "water");
        let b = content_hash("doc-1", "water!");
        let c = content_hash("doc-2", "water");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, content_hash("doc-1", "water"));
    }
}
