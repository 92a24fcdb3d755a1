use image::RgbaImage;
use log::debug;

use crate::binary_image::BinaryImage;
use crate::config::Color;
use crate::error::Result;
use crate::silhouette::Silhouette;

/// Band between two silhouettes, filled with the border color.
#[derive(Debug, Clone)]
pub struct Ring {
    region: BinaryImage,
    image: RgbaImage,
}

impl Ring {
    #[inline]
    pub fn region(&self) -> &BinaryImage {
        &self.region
    }

    #[inline]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.region.dimensions()
    }
}

pub struct RingCompositor;

impl RingCompositor {
    /// `outer - inner`, flooded with `color` at full opacity. An empty band is a
    /// valid, fully transparent result.
    pub fn compose(outer: &Silhouette, inner: &Silhouette, color: Color) -> Result<Ring> {
        let region = outer.occupancy().difference(&inner.occupancy())?;
        let (width, height) = region.dimensions();
        let fill = color.opaque();
        let mut image = RgbaImage::new(width, height);
        for (x, y) in region.iter_ones() {
            image.put_pixel(x, y, fill);
        }
        debug!("ring {}x{}: {} band pixels", width, height, region.count_ones());
        Ok(Ring { region, image })
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgba};

    use super::*;
    use crate::error::Error;

    fn square(canvas: u32, from: u32, to: u32) -> Silhouette {
        Silhouette::from_coverage(GrayImage::from_fn(canvas, canvas, |x, y| {
            if (from..to).contains(&x) && (from..to).contains(&y) { Luma([255]) } else { Luma([0]) }
        }))
    }

    #[test]
    fn band_is_outer_minus_inner() {
        let outer = square(12, 2, 10);
        let inner = square(12, 4, 8);
        let ring = RingCompositor::compose(&outer, &inner, Color::BLACK).unwrap();
        assert_eq!(ring.region().count_ones(), 64 - 16);
        assert!(ring.region().is_disjoint(&inner.occupancy()));
        assert_eq!(ring.image().get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(ring.image().get_pixel(5, 5).0[3], 0);
        assert_eq!(ring.image().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn identical_silhouettes_give_an_empty_ring() {
        let shape = square(8, 1, 5);
        let ring = RingCompositor::compose(&shape, &shape, Color::WHITE).unwrap();
        assert!(ring.is_empty());
        assert!(ring.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn translucent_color_is_painted_opaque() {
        let color = Color(Rgba([10, 20, 30, 40]));
        let ring = RingCompositor::compose(&square(6, 0, 6), &square(6, 1, 5), color).unwrap();
        assert_eq!(ring.image().get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn mismatched_canvases_fail() {
        let err = RingCompositor::compose(&square(6, 0, 6), &square(7, 1, 5), Color::WHITE).unwrap_err();
        assert!(matches!(err, Error::Geometry(_)));
    }
}
