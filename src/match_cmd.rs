use anyhow::{bail, Result};

use crate::config::Config;
use crate::matcher::{MatchWeights, Matcher};
use crate::registry;

pub fn run_match(config: &Config, keywords: &[String], limit: Option<usize>) -> Result<()> {
    if keywords.iter().all(|k| k.trim().is_empty()) {
        println!("No matches.");
        return Ok(());
    }

    let assets_config = match &config.assets {
        Some(cfg) => cfg,
        None => bail!("No asset registry configured. Set [assets] path in config."),
    };

    let assets = registry::load_registry(&assets_config.path)?;
    let matcher = Matcher::new(assets, MatchWeights::from(&config.matching));

    let limit = limit.unwrap_or(config.matching.default_limit);
    let results = matcher.rank(keywords, limit);

    if results.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, result.score, result.asset.id);
        if let Some(ref mood) = result.asset.mood {
            println!("    mood: {}", mood);
        }
        if !result.asset.tags.is_empty() {
            println!("    tags: {}", result.asset.tags.join(", "));
        }
        if !result.asset.description.is_empty() {
            println!("    description: {}", result.asset.description);
        }
        if let Some(ref label) = result.asset.source_label {
            println!("    source: {}", label);
        }
        println!();
    }

    Ok(())
}
