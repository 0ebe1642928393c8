use std::io::Read;

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use serde_json::Value;

/// Read a file argument. `-` reads stdin.
pub fn read_source(path: &str) -> Result<String> {
    if path == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read stdin")?;
        return Ok(content);
    }
    if !std::path::Path::new(path).exists() {
        bail!("{} not found", path);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path))
}

/// Read and parse a JSON document from a file argument.
pub fn read_json(path: &str) -> Result<Value> {
    let content = read_source(path)?;
    serde_json::from_str(&content).with_context(|| format!("'{}' is not valid JSON", path))
}

/// Ask for confirmation unless `yes` is set. Without a terminal to ask on,
/// `--yes` is required.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        bail!("stdin is not a terminal; pass --yes to confirm non-interactively");
    }
    let result = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(result)
}
