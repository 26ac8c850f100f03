use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::models::Asset;

/// On-disk shape of the asset registry: a TOML file of `[[asset]]` tables.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "asset")]
    assets: Vec<Asset>,
}

/// Load the asset registry once at process start. The returned snapshot is
/// immutable; the matcher never reads the file again.
pub fn load_registry(path: &Path) -> Result<Vec<Asset>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read asset registry: {}", path.display()))?;
    parse_registry(&content).with_context(|| format!("Invalid asset registry: {}", path.display()))
}

fn parse_registry(content: &str) -> Result<Vec<Asset>> {
    let file: RegistryFile = toml::from_str(content)?;

    let mut seen = HashSet::new();
    for asset in &file.assets {
        if asset.id.trim().is_empty() {
            bail!("asset with empty id");
        }
        if !seen.insert(asset.id.as_str()) {
            bail!("duplicate asset id: {}", asset.id);
        }
    }

    Ok(file.assets)
}

/// List the registry contents and health, for `cpl assets`.
pub fn run_assets(config: &Config) -> Result<()> {
    let assets_config = match &config.assets {
        Some(cfg) => cfg,
        None => {
            println!("{:<16} {}", "REGISTRY", "NOT CONFIGURED");
            return Ok(());
        }
    };

    let assets = load_registry(&assets_config.path)?;
    println!(
        "{:<16} OK — {} ({} assets)",
        "REGISTRY",
        assets_config.path.display(),
        assets.len()
    );
    println!();
    println!("{:<20} {:<12} {:<28} TAGS", "ID", "MOOD", "SOURCE");
    for asset in &assets {
        println!(
            "{:<20} {:<12} {:<28} {}",
            asset.id,
            asset.mood.as_deref().unwrap_or("-"),
            asset.source_label.as_deref().unwrap_or("-"),
            asset.tags.join(", ")
        );
    }

    Ok(())
}
