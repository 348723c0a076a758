//! EXIF timestamp parsing.

use chrono::NaiveDateTime;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Parses an EXIF `DateTimeOriginal` string as a naïve local datetime.
///
/// Trailing timezone offsets (`+02:00`, `Z`, …) are stripped before parsing;
/// anything unparseable is reported as `None`.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    // "YYYY:MM:DD HH:MM:SS" is exactly 19 bytes; drop whatever follows.
    // Byte 19 may fall inside a multi-byte character in malformed values,
    // in which case the string cannot be a valid timestamp anyway.
    let core = trimmed.get(..19).unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(core, EXIF_DATETIME_FORMAT).ok()
}

/// Formats a datetime as the `YYYYMMDD_HHMMSS` filename stem the renamer
/// produces.
pub fn filename_stem(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%d_%H%M%S").to_string()
}
