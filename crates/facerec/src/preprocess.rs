//! Patch preparation shared by every embedder backend: uniform resize so
//! the longest side hits the target, black padding to a square, and
//! normalization to `[0, 1]`.

use core_types::RgbFrame;

/// Bilinear resize keeping the aspect ratio, then pad with black to a
/// `target` x `target` square, top-left anchored.
pub fn resize_pad(patch: &RgbFrame, target: u32) -> RgbFrame {
    if patch.width == 0 || patch.height == 0 || target == 0 {
        return RgbFrame::filled(target, target, [0, 0, 0]);
    }
    let scale = f64::from(target) / f64::from(patch.width.max(patch.height));
    let new_w = ((f64::from(patch.width) * scale).round() as u32).clamp(1, target);
    let new_h = ((f64::from(patch.height) * scale).round() as u32).clamp(1, target);

    let resized = resize_bilinear(patch, new_w, new_h);
    let mut out = RgbFrame::filled(target, target, [0, 0, 0]);
    for y in 0..new_h {
        for x in 0..new_w {
            out.set_pixel(x, y, resized.pixel(x, y));
        }
    }
    out
}

/// Row-major RGB floats in `[0, 1]`.
pub fn normalize(frame: &RgbFrame) -> Vec<f32> {
    frame.data.iter().map(|&p| f32::from(p) / 255.0).collect()
}

fn resize_bilinear(src: &RgbFrame, w: u32, h: u32) -> RgbFrame {
    if src.width == w && src.height == h {
        return src.clone();
    }
    let mut dst = RgbFrame::filled(w, h, [0, 0, 0]);
    let inv_x = f64::from(src.width) / f64::from(w);
    let inv_y = f64::from(src.height) / f64::from(h);
    for y in 0..h {
        let src_y = (f64::from(y) + 0.5) * inv_y - 0.5;
        let y0 = src_y.floor().max(0.0) as u32;
        let y1 = (y0 + 1).min(src.height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);
        for x in 0..w {
            let src_x = (f64::from(x) + 0.5) * inv_x - 0.5;
            let x0 = src_x.floor().max(0.0) as u32;
            let x1 = (x0 + 1).min(src.width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let mut rgb = [0u8; 3];
            for c in 0..3 {
                let tl = f64::from(src.pixel(x0, y0)[c]);
                let tr = f64::from(src.pixel(x1, y0)[c]);
                let bl = f64::from(src.pixel(x0, y1)[c]);
                let br = f64::from(src.pixel(x1, y1)[c]);
                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;
                rgb[c] = val.round().clamp(0.0, 255.0) as u8;
            }
            dst.set_pixel(x, y, rgb);
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_landscape_patches_with_black_rows() {
        let patch = RgbFrame::filled(40, 20, [200, 100, 50]);
        let out = resize_pad(&patch, 8);
        assert_eq!((out.width, out.height), (8, 8));
        assert_eq!(out.pixel(0, 0), [200, 100, 50]);
        // Content occupies the top 4 rows; below is padding.
        assert_eq!(out.pixel(0, 7), [0, 0, 0]);
    }

    #[test]
    fn uniform_patch_stays_uniform_through_resize() {
        let patch = RgbFrame::filled(30, 30, [128, 128, 128]);
        let out = resize_pad(&patch, 16);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(out.pixel(x, y), [128, 128, 128]);
            }
        }
    }

    #[test]
    fn normalize_maps_to_unit_range() {
        let patch = RgbFrame::filled(2, 1, [0, 255, 51]);
        let values = normalize(&patch);
        assert_eq!(values.len(), 6);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 1.0);
        assert!((values[2] - 0.2).abs() < 1e-6);
    }
}
