use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{imageops, ExtendedColorType, ImageEncoder, Pixel, RgbaImage};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::binary_image::BinaryImage;
use crate::config::BorderConfig;
use crate::error::{Error, Result};
use crate::mask::AlphaMask;
use crate::ring::{Ring, RingCompositor};
use crate::silhouette::{CanvasLayout, Silhouette, SilhouetteExpander};
use crate::stipple::{StippleRenderer, StippleStats};

#[derive(Debug, Clone)]
pub struct BorderRender {
    pub image: RgbaImage,
    pub layout: CanvasLayout,
    pub inner: Silhouette,
    pub outer: Silhouette,
    pub ring: Ring,
    pub stats: StippleStats,
}

impl BorderRender {
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// A validated border configuration, ready to run on any number of images.
#[derive(Debug, Clone)]
pub struct ContourBorder {
    config: BorderConfig,
}

impl ContourBorder {
    pub fn new(config: BorderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &BorderConfig {
        &self.config
    }

    /// Runs the pipeline with the configured seed, or with the thread-local
    /// generator when there is none.
    pub fn render(&self, source: &RgbaImage) -> Result<BorderRender> {
        match self.config.seed {
            Some(seed) => self.render_with_rng(source, &mut StdRng::seed_from_u64(seed)),
            None => self.render_with_rng(source, &mut rand::thread_rng()),
        }
    }

    pub fn render_with_rng<R: Rng>(&self, source: &RgbaImage, rng: &mut R) -> Result<BorderRender> {
        let config = &self.config;
        let mask = AlphaMask::extract(source)?;
        let layout = CanvasLayout::new(mask.width(), mask.height(), config)?;
        debug!(
            "border for {}x{} source on {}x{} canvas, gap {} stroke {}",
            mask.width(),
            mask.height(),
            layout.width,
            layout.height,
            config.gap_px,
            config.stroke_px
        );

        let base = Silhouette::from_mask(&mask, &layout);
        let expander = SilhouetteExpander::new(config.expansion);
        // Outer grows from inner, not from the base, so it always contains it.
        let inner = expander.expand(&base, config.gap_px)?;
        let outer = expander.expand(&inner, config.stroke_px)?;
        let ring = RingCompositor::compose(&outer, &inner, config.color)?;
        let stippled = StippleRenderer::new(config)?.render(&ring, rng);

        let mut image = RgbaImage::new(layout.width, layout.height);
        imageops::replace(&mut image, source, layout.origin_x as i64, layout.origin_y as i64);
        composite_over(&mut image, &stippled.image)?;

        Ok(BorderRender {
            image,
            layout,
            inner,
            outer,
            ring,
            stats: stippled.stats,
        })
    }
}

fn composite_over(bottom: &mut RgbaImage, top: &RgbaImage) -> Result<()> {
    if bottom.dimensions() != top.dimensions() {
        return Err(Error::Render(format!(
            "cannot composite {:?} over {:?}",
            top.dimensions(),
            bottom.dimensions()
        )));
    }
    for (dst, src) in bottom.pixels_mut().zip(top.pixels()) {
        match src.0[3] {
            0 => {}
            255 => *dst = *src,
            _ => dst.blend(src),
        }
    }
    Ok(())
}

/// Draws the contour border around a cut-out image.
///
/// The result is larger than the source (see [`CanvasLayout`]) with the
/// source centered on it. Geometry is deterministic, the stipple pattern is
/// not unless `config.seed` is set.
pub fn generate_contour_border(source: &RgbaImage, config: &BorderConfig) -> Result<RgbaImage> {
    Ok(ContourBorder::new(config.clone())?.render(source)?.into_image())
}

/// Same as [`generate_contour_border`] for an encoded image (PNG, JPEG, ...).
pub fn generate_contour_border_from_bytes(bytes: &[u8], config: &BorderConfig) -> Result<RgbaImage> {
    let source = image::load_from_memory(bytes).map_err(Error::Decode)?.to_rgba8();
    generate_contour_border(&source, config)
}

/// Crops `image` to its opaque content plus `padding` pixels, clamped to the
/// image. Fully transparent images come back unchanged.
pub fn crop_to_content(image: &RgbaImage, padding: u32) -> RgbaImage {
    let Some(bounds) = BinaryImage::from_alpha(image).bounding_box() else {
        return image.clone();
    };
    let x = bounds.x.saturating_sub(padding);
    let y = bounds.y.saturating_sub(padding);
    let right = (bounds.x + bounds.width).saturating_add(padding).min(image.width());
    let bottom = (bounds.y + bounds.height).saturating_add(padding).min(image.height());
    imageops::crop_imm(image, x, y, right - x, bottom - y).to_image()
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut bytes, CompressionType::Default, FilterType::Adaptive);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(Error::Encode)?;
    Ok(bytes)
}
