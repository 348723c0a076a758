//! EXIF orientation (tag values 2..=8) expressed as rotate/mirror transforms.

use image::DynamicImage;

/// One pixel-buffer transform equivalent to part of an orientation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
}

/// The transform sequence that normalizes a buffer stored with the given
/// EXIF orientation. Value 1 (and anything out of range) is the identity.
pub fn transforms_for(orientation: u32) -> &'static [Transform] {
    use Transform::*;
    match orientation {
        2 => &[FlipHorizontal],
        3 => &[Rotate180],
        4 => &[FlipVertical],
        5 => &[Rotate90, FlipHorizontal],
        6 => &[Rotate90],
        7 => &[Rotate270, FlipHorizontal],
        8 => &[Rotate270],
        _ => &[],
    }
}

/// Applies the orientation's transform sequence to the pixel buffer.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    transforms_for(orientation)
        .iter()
        .fold(img, |img, t| match t {
            Transform::Rotate90 => img.rotate90(),
            Transform::Rotate180 => img.rotate180(),
            Transform::Rotate270 => img.rotate270(),
            Transform::FlipHorizontal => img.fliph(),
            Transform::FlipVertical => img.flipv(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// 2x1 image: red at (0,0), blue at (1,0).
    fn probe() -> DynamicImage {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn orientation_one_is_identity() {
        assert!(transforms_for(1).is_empty());
        assert!(transforms_for(0).is_empty());
        assert!(transforms_for(9).is_empty());
    }

    #[test]
    fn orientation_six_rotates_clockwise() {
        let out = apply_orientation(probe(), 6).to_rgb8();
        assert_eq!(out.dimensions(), (1, 2));
        // Red column-left becomes top after a 90° clockwise rotation.
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(0, 1).0, [0, 0, 255]);
    }

    #[test]
    fn orientation_two_mirrors_horizontally() {
        let out = apply_orientation(probe(), 2).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn orientation_three_is_double_flip() {
        let via_rotate = apply_orientation(probe(), 3).to_rgb8();
        let via_flips = probe().fliph().flipv().to_rgb8();
        assert_eq!(via_rotate.as_raw(), via_flips.as_raw());
    }
}
