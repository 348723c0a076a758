//! Executes rename plans on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::plan::RenamePlan;
use crate::{RenamerError, Result};

/// Settings controlling how a plan is executed. These mirror the
/// renamer section of the application configuration.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Copy the original into the backup folder before renaming.
    pub create_backup: bool,
    /// Backup folder name, created inside the source directory.
    pub backup_foldername: String,
    /// When the destination already exists with identical content, move
    /// the source into the backup folder instead of renaming.
    pub delete_duplicate: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            create_backup: false,
            backup_foldername: "backup".to_string(),
            delete_duplicate: false,
        }
    }
}

/// Applies one plan. Returns whether anything changed on disk.
///
/// A colliding destination with different content gets a numeric
/// suffix, so applying never overwrites an existing file.
pub fn apply(plan: &RenamePlan, opts: &ApplyOptions) -> Result<bool> {
    if !plan.is_effective() {
        return Ok(false);
    }
    let filename = plan
        .src
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RenamerError::MissingFilename(plan.src.clone()))?;
    let backup_dir = plan
        .src
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(&opts.backup_foldername);

    if opts.create_backup {
        fs::create_dir_all(&backup_dir)?;
        fs::copy(&plan.src, free_slot(&backup_dir, filename))?;
    }

    if plan.dest.exists() {
        if opts.delete_duplicate && same_content(&plan.src, &plan.dest)? {
            fs::create_dir_all(&backup_dir)?;
            let slot = free_slot(&backup_dir, filename);
            fs::rename(&plan.src, &slot)?;
            debug!(src = %plan.src.display(), "duplicate recycled");
            return Ok(true);
        }
        let dest = next_free_dest(&plan.dest);
        warn!(dest = %plan.dest.display(), using = %dest.display(), "destination taken");
        fs::rename(&plan.src, &dest)?;
        return Ok(true);
    }

    fs::rename(&plan.src, &plan.dest)?;
    debug!(src = %plan.src.display(), dest = %plan.dest.display(), "renamed");
    Ok(true)
}

fn same_content(a: &Path, b: &Path) -> Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(fs::read(a)? == fs::read(b)?)
}

fn free_slot(dir: &Path, filename: &str) -> PathBuf {
    let direct = dir.join(filename);
    if !direct.exists() {
        return direct;
    }
    next_free_dest(&direct)
}

/// First `<stem>_<n>.<ext>` sibling that does not exist yet.
fn next_free_dest(dest: &Path) -> PathBuf {
    let parent = dest.parent().unwrap_or_else(|| Path::new(""));
    let stem = dest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let ext = dest
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    (1..)
        .map(|n| parent.join(format!("{stem}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or_else(|| dest.to_path_buf())
}
