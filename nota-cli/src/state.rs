use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use nota_sync::JsonReceiptCache;

/// `$NOTA_HOME`, else `~/.nota`
pub fn nota_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("NOTA_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".nota"))
}

pub fn ensure_nota_home() -> Result<PathBuf> {
    let dir = nota_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn receipts_path() -> Result<PathBuf> {
    Ok(ensure_nota_home()?.join("receipts.json"))
}

pub fn receipt_cache() -> Result<JsonReceiptCache> {
    Ok(JsonReceiptCache::new(receipts_path()?))
}
