//! Tag-keyed parser and name-builder registry.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use core_types::MediaKind;
use metadata::{datetime, ExifCodec};
use tracing::debug;

use crate::plan::{RenamePlan, RenameStatus};
use crate::{RenamerError, Result};

/// Extracts a capture timestamp from a media file. Returns `None` when
/// the source this parser reads is absent, letting the registry fall
/// through to the next parser.
pub trait TimestampParser {
    fn tag(&self) -> &'static str;
    fn status(&self) -> RenameStatus;
    fn parse(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Builds a destination filename from a timestamp and the source path.
pub trait NameBuilder {
    fn tag(&self) -> &'static str;
    fn build(&self, dt: &NaiveDateTime, src: &Path) -> String;
}

/// EXIF `DateTimeOriginal`. Only JPEGs carry EXIF here; other kinds
/// fall through.
struct ExifParser;

impl TimestampParser for ExifParser {
    fn tag(&self) -> &'static str {
        "exif"
    }

    fn status(&self) -> RenameStatus {
        RenameStatus::ExifOnly
    }

    fn parse(&self, path: &Path) -> Option<NaiveDateTime> {
        if MediaKind::of(path) != MediaKind::PhotoJpg {
            return None;
        }
        ExifCodec::read(path).ok()?.datetime_original()
    }
}

/// Filesystem modification time, the fallback for videos and EXIF-less
/// photos.
struct FileTimeParser;

impl TimestampParser for FileTimeParser {
    fn tag(&self) -> &'static str {
        "filetime"
    }

    fn status(&self) -> RenameStatus {
        RenameStatus::FileTime
    }

    fn parse(&self, path: &Path) -> Option<NaiveDateTime> {
        let mtime = fs::metadata(path).ok()?.modified().ok()?;
        Some(DateTime::<Local>::from(mtime).naive_local())
    }
}

/// `YYYYMMDD_HHMMSS` destination names, keeping the source extension
/// lowercased.
struct DatetimeNamer;

impl NameBuilder for DatetimeNamer {
    fn tag(&self) -> &'static str {
        "datetime"
    }

    fn build(&self, dt: &NaiveDateTime, src: &Path) -> String {
        let stem = datetime::filename_stem(dt);
        match src.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}.{}", ext.to_ascii_lowercase()),
            None => stem,
        }
    }
}

/// Parsers are consulted in registration order; builders are selected
/// by tag.
pub struct Registry {
    parsers: Vec<Box<dyn TimestampParser>>,
    builders: HashMap<&'static str, Box<dyn NameBuilder>>,
}

impl Default for Registry {
    /// The stock registry: `exif` before `filetime`, and the `datetime`
    /// name builder.
    fn default() -> Self {
        let mut reg = Self {
            parsers: Vec::new(),
            builders: HashMap::new(),
        };
        reg.register_parser(Box::new(ExifParser));
        reg.register_parser(Box::new(FileTimeParser));
        reg.register_builder(Box::new(DatetimeNamer));
        reg
    }
}

impl Registry {
    pub fn register_parser(&mut self, parser: Box<dyn TimestampParser>) {
        self.parsers.push(parser);
    }

    pub fn register_builder(&mut self, builder: Box<dyn NameBuilder>) {
        self.builders.insert(builder.tag(), builder);
    }

    /// Plans a rename for one file with the named builder. A file no
    /// parser can date is planned as `Skipped` with `dest == src`.
    pub fn plan(&self, src: &Path, builder_tag: &str) -> Result<RenamePlan> {
        let builder = self
            .builders
            .get(builder_tag)
            .ok_or_else(|| RenamerError::UnknownBuilder(builder_tag.to_string()))?;
        let parent = src.parent().unwrap_or_else(|| Path::new(""));

        for parser in &self.parsers {
            if let Some(dt) = parser.parse(src) {
                let dest = parent.join(builder.build(&dt, src));
                debug!(src = %src.display(), dest = %dest.display(), parser = parser.tag(), "planned");
                return Ok(RenamePlan {
                    src: src.to_path_buf(),
                    dest,
                    status: parser.status(),
                });
            }
        }
        Ok(RenamePlan {
            src: src.to_path_buf(),
            dest: src.to_path_buf(),
            status: RenameStatus::Skipped,
        })
    }

    /// Plans every media file in `dir`, sorted by source path.
    pub fn plan_dir(&self, dir: &Path, builder_tag: &str) -> Result<Vec<RenamePlan>> {
        let mut sources: Vec<_> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && MediaKind::of(p).is_listed())
            .collect();
        sources.sort();
        sources
            .iter()
            .map(|src| self.plan(src, builder_tag))
            .collect()
    }
}
