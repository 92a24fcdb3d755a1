use image::{GrayImage, RgbaImage};
use log::debug;

use crate::binary_image::{BinaryImage, BoundingBox};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct AlphaMask {
    occupancy: BinaryImage,
    bounds: Option<BoundingBox>,
}

impl AlphaMask {
    /// Reads the alpha channel of `image`. A fully opaque image is occupied
    /// everywhere, a fully transparent one is occupied nowhere.
    pub fn extract(image: &RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage { width, height });
        }
        let occupancy = BinaryImage::from_alpha(image);
        let bounds = occupancy.bounding_box();
        debug!(
            "alpha mask {}x{}: {} occupied pixels, bounds {:?}",
            width,
            height,
            occupancy.count_ones(),
            bounds
        );
        let mask = Self { occupancy, bounds };
        if mask.is_fully_opaque() {
            debug!("source has no transparent pixels, the frame will be rectangular");
        }
        Ok(mask)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.occupancy.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.occupancy.height()
    }

    #[inline]
    pub fn occupancy(&self) -> &BinaryImage {
        &self.occupancy
    }

    #[inline]
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn is_fully_opaque(&self) -> bool {
        self.occupancy.count_ones() == self.width() as usize * self.height() as usize
    }
}

/// Cuts `image` out with an external mask: pixels whose mask value is at or
/// below `threshold` become fully transparent, the others keep their alpha.
pub fn apply_cutout_mask(image: &RgbaImage, mask: &GrayImage, threshold: u8) -> Result<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(Error::Geometry(format!(
            "mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        )));
    }
    let keep = BinaryImage::from_mask(mask, threshold);
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if !keep.get(x, y) {
            pixel.0[3] = 0;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgba};

    use super::*;

    #[test]
    fn zero_sized_image_is_rejected() {
        let err = AlphaMask::extract(&RgbaImage::new(0, 5)).unwrap_err();
        assert!(matches!(err, Error::EmptyImage { width: 0, height: 5 }));
    }

    #[test]
    fn opaque_image_is_occupied_everywhere() {
        let image = RgbaImage::from_pixel(6, 4, Rgba([200, 10, 10, 255]));
        let mask = AlphaMask::extract(&image).unwrap();
        assert!(mask.is_fully_opaque());
        assert_eq!(
            mask.bounds(),
            Some(BoundingBox { x: 0, y: 0, width: 6, height: 4 })
        );
    }

    #[test]
    fn transparent_image_has_no_bounds() {
        let mask = AlphaMask::extract(&RgbaImage::new(3, 3)).unwrap();
        assert_eq!(mask.bounds(), None);
        assert!(mask.occupancy().is_empty());
    }

    #[test]
    fn cutout_mask_clears_background_alpha() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([9, 9, 9, 255]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(1, 0, Luma([255]));
        let cut = apply_cutout_mask(&image, &mask, 127).unwrap();
        assert_eq!(cut.get_pixel(0, 0).0[3], 0);
        assert_eq!(cut.get_pixel(1, 0), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn cutout_mask_must_match_size() {
        let image = RgbaImage::new(2, 2);
        let mask = GrayImage::new(3, 2);
        assert!(matches!(apply_cutout_mask(&image, &mask, 0), Err(Error::Geometry(_))));
    }
}
