//! Build output cleaning.

use anyhow::{Context, Result};
use std::fs;

use crate::layout::BuildLayout;

/// Remove the shared build root. Returns whether anything was removed.
pub fn clean_outputs(layout: &BuildLayout) -> Result<bool> {
    let build_root = layout.build_root();
    if !build_root.exists() {
        println!("No build outputs to clean.");
        return Ok(false);
    }

    println!("Removing {}...", build_root.display());
    fs::remove_dir_all(build_root)
        .with_context(|| format!("cannot remove {}", build_root.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removes_build_root() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        fs::create_dir_all(layout.stage_root().join("pxf-gp-7-1.0.0-x86-64")).unwrap();
        fs::create_dir_all(layout.dist_dir()).unwrap();

        assert!(clean_outputs(&layout).unwrap());
        assert!(!layout.build_root().exists());
        // Repository itself untouched
        assert!(dir.path().exists());
    }

    #[test]
    fn test_clean_is_noop_without_build_root() {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path());
        assert!(!clean_outputs(&layout).unwrap());
    }
}
