//! Image decoding and region cropping

use crate::Result;
use anyhow::Context;
use helmetwatch_core::BoundingBox;
use image::RgbImage;
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Decode an encoded upload (any format the `image` crate knows) to RGB
    pub fn decode(bytes: &[u8]) -> std::result::Result<RgbImage, image::ImageError> {
        Ok(image::load_from_memory(bytes)?.to_rgb8())
    }

    /// Read an image file's raw bytes
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        std::fs::read(&path).with_context(|| format!("Failed to open image: {:?}", path.as_ref()))
    }

    /// Copy out the integer pixel region covered by `region`, clipped to the
    /// image. Returns the crop and its top-left offset, or `None` when the
    /// clipped region has zero area.
    pub fn crop(image: &RgbImage, region: &BoundingBox) -> Option<(RgbImage, u32, u32)> {
        let (width, height) = image.dimensions();
        let x1 = region.x1.clamp(0.0, width as f32) as u32;
        let y1 = region.y1.clamp(0.0, height as f32) as u32;
        let x2 = region.x2.clamp(0.0, width as f32) as u32;
        let y2 = region.y2.clamp(0.0, height as f32) as u32;

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let crop = image::imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image();
        Some((crop, x1, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    #[test]
    fn test_crop_copies_pixels_and_offset() {
        let mut img = RgbImage::new(20, 10);
        img.put_pixel(12, 6, Rgb([255, 0, 0]));

        let (crop, x, y) = ImageUtils::crop(&img, &BoundingBox::new(10.0, 5.0, 15.0, 9.0)).unwrap();
        assert_eq!((x, y), (10, 5));
        assert_eq!(crop.dimensions(), (5, 4));
        assert_eq!(crop.get_pixel(2, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_zero_area_crop_is_skipped() {
        let img = RgbImage::new(20, 10);
        assert!(ImageUtils::crop(&img, &BoundingBox::new(5.0, 5.0, 5.0, 8.0)).is_none());
        assert!(ImageUtils::crop(&img, &BoundingBox::new(30.0, 0.0, 40.0, 5.0)).is_none());
    }

    #[test]
    fn test_decode_png_and_reject_garbage() {
        let img = RgbImage::new(8, 4);
        let mut encoded = Cursor::new(Vec::new());
        img.write_to(&mut encoded, ImageFormat::Png).unwrap();

        let decoded = ImageUtils::decode(encoded.get_ref()).unwrap();
        assert_eq!(decoded.dimensions(), (8, 4));
        assert!(ImageUtils::decode(b"definitely not an image").is_err());
    }
}
