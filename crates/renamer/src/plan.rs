use std::path::PathBuf;

/// How a plan's timestamp was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameStatus {
    /// Taken from EXIF `DateTimeOriginal`.
    ExifOnly,
    /// Fell back to the filesystem modification time.
    FileTime,
    /// No parser produced a timestamp; the file keeps its name.
    Skipped,
}

/// One planned rename. `dest` lives in the same directory as `src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub src: PathBuf,
    pub dest: PathBuf,
    pub status: RenameStatus,
}

impl RenamePlan {
    /// True when applying would change anything on disk.
    pub fn is_effective(&self) -> bool {
        self.status != RenameStatus::Skipped && self.src != self.dest
    }
}
