//! JPEG segment walking: locating and replacing the APP1 Exif payload.

use crate::{MetadataError, Result};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Extracts the APP1 Exif payload from a JPEG buffer, excluding the
/// `Exif\0\0` header.
pub fn extract_exif_segment(jpeg_bytes: &[u8]) -> Option<Vec<u8>> {
    if jpeg_bytes.len() < 4 || jpeg_bytes[..2] != SOI {
        return None;
    }
    let mut idx = 2;
    while idx + 3 < jpeg_bytes.len() {
        if jpeg_bytes[idx] != 0xFF {
            idx += 1;
            continue;
        }
        let marker = jpeg_bytes[idx + 1];
        idx += 2;
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        if idx + 2 > jpeg_bytes.len() {
            break;
        }
        let len = u16::from_be_bytes([jpeg_bytes[idx], jpeg_bytes[idx + 1]]) as usize;
        if len < 2 || idx + len > jpeg_bytes.len() {
            break;
        }
        let payload = &jpeg_bytes[idx + 2..idx + len];
        if marker == 0xE1 && payload.starts_with(EXIF_HEADER) {
            return Some(payload[EXIF_HEADER.len()..].to_vec());
        }
        idx += len;
    }
    None
}

/// Returns `jpeg_bytes` with its APP1 Exif segment replaced by (or, when
/// absent, prepended with) `exif_tiff`, the raw TIFF structure without the
/// `Exif\0\0` header.
pub fn splice_exif_segment(jpeg_bytes: &[u8], exif_tiff: &[u8]) -> Result<Vec<u8>> {
    if jpeg_bytes.len() < 4 || jpeg_bytes[..2] != SOI {
        return Err(MetadataError::MalformedJpeg);
    }

    let payload_len = EXIF_HEADER.len() + exif_tiff.len() + 2;
    if payload_len > u16::MAX as usize {
        return Err(MetadataError::MalformedJpeg);
    }

    let mut segment = Vec::with_capacity(payload_len + 2);
    segment.extend_from_slice(&[0xFF, 0xE1]);
    segment.extend_from_slice(&(payload_len as u16).to_be_bytes());
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(exif_tiff);

    let mut out = Vec::with_capacity(jpeg_bytes.len() + segment.len());
    out.extend_from_slice(&SOI);

    let mut idx = 2;
    let mut inserted = false;
    while idx + 3 < jpeg_bytes.len() {
        if jpeg_bytes[idx] != 0xFF {
            break;
        }
        let marker = jpeg_bytes[idx + 1];
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        let len = u16::from_be_bytes([jpeg_bytes[idx + 2], jpeg_bytes[idx + 3]]) as usize;
        if len < 2 || idx + 2 + len > jpeg_bytes.len() {
            return Err(MetadataError::MalformedJpeg);
        }
        let payload = &jpeg_bytes[idx + 4..idx + 2 + len];
        let is_exif_app1 = marker == 0xE1 && payload.starts_with(EXIF_HEADER);
        if is_exif_app1 {
            if !inserted {
                out.extend_from_slice(&segment);
                inserted = true;
            }
            // The old Exif APP1 is dropped.
        } else {
            out.extend_from_slice(&jpeg_bytes[idx..idx + 2 + len]);
        }
        idx += 2 + len;
    }

    if !inserted {
        // No prior Exif segment: place APP1 directly after SOI.
        let rest = out.split_off(2);
        out.extend_from_slice(&segment);
        out.extend_from_slice(&rest);
    }

    out.extend_from_slice(&jpeg_bytes[idx..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal JPEG: SOI + APP0 stub + SOS marker + EOI.
    fn bare_jpeg() -> Vec<u8> {
        let mut v = vec![0xFF, 0xD8];
        v.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x01, 0x02]); // APP0, len 4
        v.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]); // SOS
        v.extend_from_slice(&[0xFF, 0xD9]);
        v
    }

    #[test]
    fn splice_then_extract_roundtrips() {
        let tiff = vec![0x4D, 0x4D, 0x00, 0x2A, 0, 0, 0, 8];
        let jpeg = splice_exif_segment(&bare_jpeg(), &tiff).unwrap();
        assert_eq!(extract_exif_segment(&jpeg).unwrap(), tiff);
    }

    #[test]
    fn splice_replaces_existing_segment() {
        let first = vec![1u8; 16];
        let second = vec![2u8; 24];
        let jpeg = splice_exif_segment(&bare_jpeg(), &first).unwrap();
        let jpeg = splice_exif_segment(&jpeg, &second).unwrap();
        assert_eq!(extract_exif_segment(&jpeg).unwrap(), second);
        // Only one APP1 Exif segment remains.
        let count = jpeg.windows(6).filter(|w| w == b"Exif\0\0").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn rejects_non_jpeg_input() {
        assert!(matches!(
            splice_exif_segment(b"PNG....", &[0u8; 4]),
            Err(MetadataError::MalformedJpeg)
        ));
        assert_eq!(extract_exif_segment(b"PNG...."), None);
    }
}
