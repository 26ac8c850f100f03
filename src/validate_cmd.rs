use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::guardian::{Guardian, Zone};

/// CLI entry point for the policy gate: read a draft, validate it against a
/// zone, print the verdict. The gate itself never fails; only reading the
/// draft or a misconfigured backend can error here.
pub async fn run_validate(config: &Config, path: &Path, zone: &str, json: bool) -> Result<()> {
    let zone = Zone::parse(zone)?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft: {}", path.display()))?;

    let guardian = Guardian::from_config(&config.guardian)?;
    let verdict = guardian.validate(&content, zone).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!("--- Verdict ({} zone) ---", zone.as_str());
    println!("state:  {}", verdict.state().as_str());
    println!("valid:  {}", verdict.valid);
    println!("score:  {}", verdict.score);
    if !verdict.flags.is_empty() {
        println!("flags:  {}", verdict.flags.join(", "));
    }
    for reason in &verdict.reasons {
        println!("reason: {}", reason);
    }
    if let Some(ref fix) = verdict.suggested_fix {
        println!("suggested fix: {}", fix);
    }

    Ok(())
}
