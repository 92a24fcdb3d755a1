use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use imageproc::morphology;
use log::{debug, warn};

use crate::binary_image::{BinaryImage, BoundingBox};
use crate::config::{BorderConfig, CanvasPolicy, Expansion};
use crate::error::{Error, Result};
use crate::mask::AlphaMask;

/// Largest working canvas we agree to allocate.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Slack past the rounded border reach, bilinear resampling can bleed one pixel.
const CANVAS_SLACK: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    pub width: u32,
    pub height: u32,
    pub origin_x: u32,
    pub origin_y: u32,
}

impl CanvasLayout {
    /// Working canvas for a `source_width` x `source_height` image, large
    /// enough that neither expansion clips.
    pub fn new(source_width: u32, source_height: u32, config: &BorderConfig) -> Result<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(Error::Geometry(format!(
                "source dimensions must be positive, got {}x{}",
                source_width, source_height
            )));
        }
        let margin = (config.reach().ceil() as u32)
            .checked_add(CANVAS_SLACK)
            .ok_or_else(|| Error::Geometry("border reach overflows the canvas".to_string()))?;
        let (pad_x, pad_y) = match config.canvas {
            CanvasPolicy::Double => (
                source_width.div_ceil(2).max(margin),
                source_height.div_ceil(2).max(margin),
            ),
            CanvasPolicy::Tight => (margin, margin),
        };
        let grow = |size: u32, pad: u32| {
            pad.checked_mul(2)
                .and_then(|p| p.checked_add(size))
                .ok_or_else(|| Error::Geometry(format!("canvas side {} + 2x{} overflows", size, pad)))
        };
        let width = grow(source_width, pad_x)?;
        let height = grow(source_height, pad_y)?;
        if width as u64 * height as u64 > MAX_CANVAS_PIXELS {
            return Err(Error::Render(format!(
                "working canvas {}x{} is too large to allocate",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            origin_x: pad_x,
            origin_y: pad_y,
        })
    }
}

/// Shape-only raster on the working canvas, coverage > 0 is inside.
#[derive(Debug, Clone, PartialEq)]
pub struct Silhouette {
    coverage: GrayImage,
}

impl Silhouette {
    pub fn from_mask(mask: &AlphaMask, layout: &CanvasLayout) -> Self {
        let mut coverage = GrayImage::new(layout.width, layout.height);
        for (x, y) in mask.occupancy().iter_ones() {
            coverage.put_pixel(layout.origin_x + x, layout.origin_y + y, Luma([255]));
        }
        Self { coverage }
    }

    pub fn from_coverage(coverage: GrayImage) -> Self {
        Self { coverage }
    }

    #[inline]
    pub fn coverage(&self) -> &GrayImage {
        &self.coverage
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.coverage.dimensions()
    }

    pub fn occupancy(&self) -> BinaryImage {
        let (width, height) = self.dimensions();
        BinaryImage::from_raw(width, height, self.coverage.as_raw())
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.occupancy().bounding_box()
    }

    pub fn contains(&self, other: &Silhouette) -> bool {
        other.occupancy().is_subset_of(&self.occupancy())
    }

    fn union(mut self, other: &GrayImage) -> Self {
        for (dst, src) in self.coverage.pixels_mut().zip(other.pixels()) {
            dst.0[0] = dst.0[0].max(src.0[0]);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilhouetteExpander {
    method: Expansion,
}

impl SilhouetteExpander {
    pub fn new(method: Expansion) -> Self {
        Self { method }
    }

    /// Grows `source` outward by `offset` pixels, rounded to whole pixels.
    /// The result always contains `source`.
    pub fn expand(&self, source: &Silhouette, offset: f32) -> Result<Silhouette> {
        if !offset.is_finite() || offset < 0.0 {
            return Err(Error::Geometry(format!("expansion offset must be >= 0, got {}", offset)));
        }
        let bounds = source
            .bounds()
            .ok_or_else(|| Error::Geometry("cannot expand an empty silhouette".to_string()))?;
        let step = offset.round() as u32;
        if step == 0 {
            return Ok(source.clone());
        }

        let expanded = match self.method {
            Expansion::Rescale => Self::rescale(source, bounds, step)?,
            Expansion::Dilate => Self::dilate(source, step),
        };

        if let Some(grown) = expanded.bounds() {
            debug!("expanded silhouette by {}px: {:?} -> {:?}", step, bounds, grown);
            let (width, height) = expanded.dimensions();
            if grown.x == 0 || grown.y == 0 || grown.x + grown.width >= width || grown.y + grown.height >= height {
                warn!("expanded silhouette touches the canvas edge, the border may be clipped");
            }
        }
        Ok(expanded)
    }

    /// Scales the occupied box about its own center to `(W + 2k) x (H + 2k)`
    /// and composites the result over the source. Only exact for star-convex
    /// shapes: deep concavities end up with a thinner or thicker band.
    fn rescale(source: &Silhouette, bounds: BoundingBox, step: u32) -> Result<Silhouette> {
        let grow = step.checked_mul(2);
        let target_width = grow.and_then(|g| bounds.width.checked_add(g));
        let target_height = grow.and_then(|g| bounds.height.checked_add(g));
        let (Some(target_width), Some(target_height)) = (target_width, target_height) else {
            return Err(Error::Geometry("expanded silhouette size overflows".to_string()));
        };
        let scale_x = target_width as f32 / bounds.width as f32;
        let scale_y = target_height as f32 / bounds.height as f32;
        if !(scale_x.is_finite() && scale_y.is_finite() && scale_x > 0.0 && scale_y > 0.0) {
            return Err(Error::Geometry(format!(
                "invalid scale {}x{} for {}x{} silhouette",
                scale_x, scale_y, bounds.width, bounds.height
            )));
        }

        let (cx, cy) = bounds.center();
        let projection = Projection::translate(cx, cy)
            * Projection::scale(scale_x, scale_y)
            * Projection::translate(-cx, -cy);
        let scaled = warp(source.coverage(), &projection, Interpolation::Bilinear, Luma([0u8]));
        Ok(source.clone().union(&scaled))
    }

    fn dilate(source: &Silhouette, step: u32) -> Silhouette {
        let mut coverage = source.coverage().clone();
        let mut remaining = step;
        while remaining > 0 {
            let k = remaining.min(u8::MAX as u32);
            coverage = morphology::dilate(&coverage, Norm::L2, k as u8);
            remaining -= k;
        }
        Silhouette::from_coverage(coverage).union(source.coverage())
    }
}
