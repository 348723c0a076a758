//! Structured EXIF access: sectioned field dictionary, the UserComment JSON
//! blob, GPS and timestamp helpers, and the JPEG write path.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, Cursor};
use std::path::Path;

use chrono::NaiveDateTime;
use core_types::UserComment;
use exif::experimental::Writer;
use exif::{Context, Field, In, Rational, Reader, Tag, Value};
use image::DynamicImage;
use tracing::debug;

use crate::orientation::apply_orientation;
use crate::segments::splice_exif_segment;
use crate::{datetime, gps, MetadataError, Result};

const UNICODE_PREFIX: &[u8; 8] = b"UNICODE\0";
const ASCII_PREFIX: &[u8; 8] = b"ASCII\0\0\0";

/// Parsed EXIF metadata for one file: an owned, mutable field list.
#[derive(Debug, Default, Clone)]
pub struct ExifMeta {
    fields: Vec<Field>,
    little_endian: bool,
}

/// Stateless EXIF reader/writer.
pub struct ExifCodec;

impl ExifCodec {
    /// Reads EXIF from any supported container. A file without parseable
    /// EXIF yields an empty `ExifMeta`, never an error.
    pub fn read(path: &Path) -> Result<ExifMeta> {
        let file = fs::File::open(path)?;
        let mut reader = BufReader::new(file);
        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(ExifMeta {
                fields: exif.fields().cloned().collect(),
                little_endian: exif.little_endian(),
            }),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no EXIF data");
                Ok(ExifMeta::default())
            }
        }
    }

    /// Writes `meta` back into the JPEG at `path` by replacing its APP1
    /// segment in place.
    pub fn write(path: &Path, meta: &ExifMeta) -> Result<()> {
        let jpeg = fs::read(path)?;
        if !jpeg.starts_with(&[0xFF, 0xD8]) {
            return Err(MetadataError::NotJpeg(path.to_path_buf()));
        }
        let out = Self::splice(&jpeg, meta)?;
        fs::write(path, out)?;
        Ok(())
    }

    /// Returns `jpeg` bytes carrying `meta` as their Exif APP1 segment.
    pub fn splice(jpeg: &[u8], meta: &ExifMeta) -> Result<Vec<u8>> {
        let tiff = meta.to_tiff_bytes()?;
        splice_exif_segment(jpeg, &tiff)
    }

    /// Loads an image with its orientation tag consumed: the returned pixel
    /// buffer is upright and the returned metadata no longer carries the
    /// tag, so a later save cannot double-apply it.
    pub fn load_oriented(path: &Path) -> Result<(DynamicImage, ExifMeta)> {
        let img = image::open(path)?;
        let mut meta = Self::read(path)?;
        let img = match meta.take_orientation() {
            Some(orientation) => apply_orientation(img, orientation),
            None => img,
        };
        Ok((img, meta))
    }
}

impl ExifMeta {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Groups fields by IFD section, keyed the way the sidecar tooling
    /// expects: "0th", "Exif", "GPS", "Interop" and "1st".
    pub fn sections(&self) -> BTreeMap<&'static str, Vec<&Field>> {
        let mut out: BTreeMap<&'static str, Vec<&Field>> = BTreeMap::new();
        for field in &self.fields {
            out.entry(section_of(field)).or_default().push(field);
        }
        out
    }

    fn find(&self, tag: Tag, ifd: In) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.tag == tag && f.ifd_num == ifd)
    }

    /// Replaces (or inserts) a primary-IFD field.
    pub fn set_field(&mut self, tag: Tag, value: Value) {
        self.remove_field(tag);
        self.fields.push(Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        });
    }

    pub fn remove_field(&mut self, tag: Tag) {
        self.fields
            .retain(|f| !(f.tag == tag && f.ifd_num == In::PRIMARY));
    }

    /// Drops the thumbnail ("1st") IFD entirely.
    pub fn remove_thumbnail_section(&mut self) {
        self.fields.retain(|f| f.ifd_num != In::THUMBNAIL);
    }

    /// The raw orientation tag value, when present and meaningful (2..=8).
    pub fn orientation(&self) -> Option<u32> {
        let field = self.find(Tag::Orientation, In::PRIMARY)?;
        let value = field.value.get_uint(0)?;
        (2..=8).contains(&value).then_some(value)
    }

    /// Reads and removes the orientation tag in one step.
    pub fn take_orientation(&mut self) -> Option<u32> {
        let value = self.orientation();
        self.remove_field(Tag::Orientation);
        value
    }

    /// `DateTimeOriginal` parsed as a naïve local datetime.
    pub fn datetime_original(&self) -> Option<NaiveDateTime> {
        let field = self.find(Tag::DateTimeOriginal, In::PRIMARY)?;
        datetime::parse_exif_datetime(&ascii_value(&field.value)?)
    }

    /// Stamps `DateTimeOriginal` in the EXIF string format.
    pub fn set_datetime_original(&mut self, dt: &NaiveDateTime) {
        let text = dt.format("%Y:%m:%d %H:%M:%S").to_string();
        self.set_field(Tag::DateTimeOriginal, Value::Ascii(vec![text.into_bytes()]));
    }

    /// Signed decimal (latitude, longitude), when both are present.
    pub fn gps_coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.gps_axis(Tag::GPSLatitude, Tag::GPSLatitudeRef, 'N')?;
        let lng = self.gps_axis(Tag::GPSLongitude, Tag::GPSLongitudeRef, 'E')?;
        Some((lat, lng))
    }

    fn gps_axis(&self, value_tag: Tag, ref_tag: Tag, default_ref: char) -> Option<f64> {
        let field = self.find(value_tag, In::PRIMARY)?;
        let Value::Rational(dms) = &field.value else {
            return None;
        };
        let reference = self
            .find(ref_tag, In::PRIMARY)
            .and_then(|f| ascii_value(&f.value))
            .and_then(|s| s.chars().next())
            .unwrap_or(default_ref);
        Some(gps::dms_to_deg(dms, reference))
    }

    /// Stores signed decimal coordinates as rational DMS plus reference.
    pub fn set_gps_coordinates(&mut self, lat: f64, lng: f64) {
        self.set_field(
            Tag::GPSLatitude,
            Value::Rational(gps::deg_to_dms(lat).to_vec()),
        );
        self.set_field(
            Tag::GPSLatitudeRef,
            ascii_of(&gps::latitude_ref(lat).to_string()),
        );
        self.set_field(
            Tag::GPSLongitude,
            Value::Rational(gps::deg_to_dms(lng).to_vec()),
        );
        self.set_field(
            Tag::GPSLongitudeRef,
            ascii_of(&gps::longitude_ref(lng).to_string()),
        );
    }

    /// Decodes the UserComment JSON blob; any malformed or missing blob
    /// yields an empty comment.
    pub fn user_comment(&self) -> UserComment {
        let Some(field) = self.find(Tag::UserComment, In::PRIMARY) else {
            return UserComment::new();
        };
        let Value::Undefined(bytes, _) = &field.value else {
            return UserComment::new();
        };
        let Some(text) = decode_user_comment(bytes) else {
            return UserComment::new();
        };
        match UserComment::from_json(&text) {
            Ok(uc) => uc,
            Err(err) => {
                debug!(error = %err, "malformed user-comment blob");
                UserComment::new()
            }
        }
    }

    /// Encodes the comment as JSON with the EXIF "unicode" charset prefix.
    pub fn set_user_comment(&mut self, comment: &UserComment) {
        // serde_json cannot fail on this data model.
        let json = comment.to_json().unwrap_or_default();
        let mut bytes = UNICODE_PREFIX.to_vec();
        for unit in json.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        self.set_field(Tag::UserComment, Value::Undefined(bytes, 0));
    }

    /// Serializes the field list into a raw TIFF structure suitable for an
    /// APP1 payload. Unknown-typed fields cannot be re-emitted and are
    /// skipped.
    pub fn to_tiff_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        let writable: Vec<&Field> = self
            .fields
            .iter()
            .filter(|f| !matches!(f.value, Value::Unknown(..)))
            .collect();
        for field in &writable {
            writer.push_field(field);
        }
        let mut cursor = Cursor::new(Vec::new());
        writer.write(&mut cursor, self.little_endian)?;
        Ok(cursor.into_inner())
    }
}

fn section_of(field: &Field) -> &'static str {
    if field.ifd_num == In::THUMBNAIL {
        return "1st";
    }
    match field.tag.context() {
        Context::Tiff => "0th",
        Context::Exif => "Exif",
        Context::Gps => "GPS",
        _ => "Interop",
    }
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(items) => items
            .first()
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .map(|s| s.trim_matches('\u{0}').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn ascii_of(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

/// Strips the 8-byte charset prefix and decodes the comment text.
fn decode_user_comment(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 8 {
        return std::str::from_utf8(bytes).ok().map(str::to_string);
    }
    let (prefix, body) = bytes.split_at(8);
    if prefix == UNICODE_PREFIX {
        decode_utf16(body)
    } else if prefix == ASCII_PREFIX || prefix.iter().all(|&b| b == 0) {
        std::str::from_utf8(body).ok().map(str::to_string)
    } else {
        std::str::from_utf8(bytes).ok().map(str::to_string)
    }
}

fn decode_utf16(body: &[u8]) -> Option<String> {
    if body.len() % 2 != 0 {
        return None;
    }
    // Big-endian unless a little-endian BOM says otherwise.
    let little = body.starts_with(&[0xFF, 0xFE]);
    let skip = if little || body.starts_with(&[0xFE, 0xFF]) {
        2
    } else {
        0
    };
    let units: Vec<u16> = body[skip..]
        .chunks_exact(2)
        .map(|c| {
            if little {
                u16::from_le_bytes([c[0], c[1]])
            } else {
                u16::from_be_bytes([c[0], c[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}
