//! GPS coordinate conversion between signed decimal degrees and the EXIF
//! rational degrees/minutes/seconds triplet plus hemisphere reference.

use exif::Rational;

/// Denominator used for the seconds rational; 1/10000 s ≈ 2.8e-8°, well
/// inside the 1e-6° round-trip tolerance.
const SECONDS_DENOM: u32 = 10_000;

/// Converts an unsigned decimal-degree magnitude to (d, m, s) rationals.
pub fn deg_to_dms(degrees: f64) -> [Rational; 3] {
    let magnitude = degrees.abs();
    let d = magnitude.floor();
    let minutes = (magnitude - d) * 60.0;
    let m = minutes.floor();
    let seconds = (minutes - m) * 60.0;
    let s_num = (seconds * SECONDS_DENOM as f64).round() as u32;

    [
        Rational {
            num: d as u32,
            denom: 1,
        },
        Rational {
            num: m as u32,
            denom: 1,
        },
        Rational {
            num: s_num,
            denom: SECONDS_DENOM,
        },
    ]
}

/// Signed decimal degrees from (d, m, s) rationals and a hemisphere byte.
pub fn dms_to_deg(dms: &[Rational], reference: char) -> f64 {
    let d = dms.first().map(|r| r.to_f64()).unwrap_or(0.0);
    let m = dms.get(1).map(|r| r.to_f64()).unwrap_or(0.0);
    let s = dms.get(2).map(|r| r.to_f64()).unwrap_or(0.0);
    let value = d + m / 60.0 + s / 3600.0;
    match reference.to_ascii_uppercase() {
        'S' | 'W' => -value,
        _ => value,
    }
}

/// Hemisphere reference for a signed latitude.
pub fn latitude_ref(lat: f64) -> char {
    if lat < 0.0 {
        'S'
    } else {
        'N'
    }
}

/// Hemisphere reference for a signed longitude.
pub fn longitude_ref(lng: f64) -> char {
    if lng < 0.0 {
        'W'
    } else {
        'E'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_roundtrip_to_six_decimals() {
        let value = 1.305140852777778;
        let dms = deg_to_dms(value);
        let back = dms_to_deg(&dms, 'N');
        assert!((back - 1.305141).abs() < 1e-6, "got {back}");
    }

    #[test]
    fn southern_and_western_references_negate() {
        let dms = deg_to_dms(48.858);
        assert!((dms_to_deg(&dms, 'S') + 48.858).abs() < 1e-6);
        assert!((dms_to_deg(&dms, 'w') + 48.858).abs() < 1e-6);
    }

    #[test]
    fn roundtrip_across_the_valid_range() {
        for &v in &[0.0, 0.000001, 12.3456789, 89.999999, 179.9999, 45.5] {
            let back = dms_to_deg(&deg_to_dms(v), 'E');
            assert!((back - v).abs() < 1e-6, "value {v} came back as {back}");
        }
    }

    #[test]
    fn reference_selection() {
        assert_eq!(latitude_ref(1.0), 'N');
        assert_eq!(latitude_ref(-1.0), 'S');
        assert_eq!(longitude_ref(1.0), 'E');
        assert_eq!(longitude_ref(-1.0), 'W');
    }
}
