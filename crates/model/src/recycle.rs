//! Soft deletion.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Destination for deleted media files. Deletion is always soft: the
/// file must remain recoverable after `discard` returns.
pub trait RecycleBin {
    fn discard(&self, path: &Path) -> io::Result<()>;
}

/// Moves discarded files into a backup directory, creating it on first
/// use. Name collisions get a numeric suffix so earlier backups are
/// never overwritten.
#[derive(Debug, Clone)]
pub struct BackupBin {
    dir: PathBuf,
}

impl BackupBin {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn free_slot(&self, filename: &str) -> PathBuf {
        let direct = self.dir.join(filename);
        if !direct.exists() {
            return direct;
        }
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let ext = Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        (1..)
            .map(|n| self.dir.join(format!("{stem}_{n}{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(direct)
    }
}

impl RecycleBin for BackupBin {
    fn discard(&self, path: &Path) -> io::Result<()> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no filename"))?;
        fs::create_dir_all(&self.dir)?;
        let dest = self.free_slot(filename);
        // Rename fails across filesystems; fall back to copy + remove.
        if fs::rename(path, &dest).is_err() {
            fs::copy(path, &dest)?;
            fs::remove_file(path)?;
        }
        debug!(src = %path.display(), dest = %dest.display(), "discarded to backup");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn discard_moves_and_keeps_earlier_backups() {
        let root = tempdir().unwrap();
        let bin = BackupBin::new(root.path().join("backup"));

        for content in ["one", "two"] {
            let src = root.path().join("a.jpg");
            fs::write(&src, content).unwrap();
            bin.discard(&src).unwrap();
            assert!(!src.exists());
        }
        assert_eq!(
            fs::read_to_string(root.path().join("backup/a.jpg")).unwrap(),
            "one"
        );
        assert_eq!(
            fs::read_to_string(root.path().join("backup/a_1.jpg")).unwrap(),
            "two"
        );
    }
}
