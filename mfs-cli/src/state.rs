use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$MFS_HOME`, else `~/.mfs`
pub fn mfs_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("MFS_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".mfs"))
}

pub fn ensure_mfs_home() -> Result<PathBuf> {
    let dir = mfs_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
