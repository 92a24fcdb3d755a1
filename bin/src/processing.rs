use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use contour_frame::{
    apply_cutout_mask, crop_to_content, encode_png, render_with_budget, BorderRender, ContourBorder, StippleStats,
};
use image::RgbaImage;
use log::{debug, info};

use crate::config::Config;

pub(crate) struct Processor {
    border: ContourBorder,
    budget: Duration,
    mask_threshold: u8,
    output_folder: PathBuf,
    crop: Option<u32>,
    skip_intermediates: bool,
}

impl Processor {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let border = ContourBorder::new(config.border.clone()).context("invalid border configuration")?;
        Ok(Processor {
            border,
            budget: config.budget(),
            mask_threshold: config.input.mask_threshold,
            output_folder: config.output.output_folder.clone(),
            crop: config.output.crop.then_some(config.output.crop_padding),
            skip_intermediates: config.output.skip_intermediates,
        })
    }

    /// Borders one image and writes `<stem>_border.png` to the output folder.
    pub(crate) fn process(&self, input: &Path, mask: Option<&Path>) -> Result<StippleStats> {
        let asset_name = input
            .file_stem()
            .with_context(|| format!("invalid file name {}", input.display()))?
            .to_string_lossy();

        let source = Self::load_source(input, mask, self.mask_threshold)?;
        info!("Processing: {} ({}x{} pixels)", input.display(), source.width(), source.height());

        let render = render_with_budget(&self.border, source, self.budget)
            .with_context(|| format!("failed to draw border for {}", input.display()))?;
        debug!("{}: {:?}", asset_name, render.stats);

        if !self.skip_intermediates {
            self.save_intermediates(&asset_name, &render)?;
        }

        let stats = render.stats;
        let image = match self.crop {
            Some(padding) => crop_to_content(&render.image, padding),
            None => render.into_image(),
        };

        // Encoded up front so a failure never leaves a truncated file behind.
        let bytes = encode_png(&image).with_context(|| format!("failed to encode {}", asset_name))?;
        let output_path = self.output_folder.join(format!("{}_border.png", asset_name));
        fs::write(&output_path, bytes).with_context(|| format!("failed to write {}", output_path.display()))?;
        info!("Saved {}", output_path.display());

        Ok(stats)
    }

    fn load_source(input: &Path, mask: Option<&Path>, threshold: u8) -> Result<RgbaImage> {
        let source = image::open(input)
            .with_context(|| format!("failed to open image {}", input.display()))?
            .to_rgba8();

        let Some(mask_path) = mask else {
            return Ok(source);
        };
        debug!("Loading mask from: {}", mask_path.display());
        let mask_image = image::open(mask_path)
            .with_context(|| format!("failed to open mask {}", mask_path.display()))?
            .to_luma8();
        apply_cutout_mask(&source, &mask_image, threshold)
            .with_context(|| format!("mask {} does not fit {}", mask_path.display(), input.display()))
    }

    fn save_intermediates(&self, asset_name: &str, render: &BorderRender) -> Result<()> {
        let path = |suffix: &str| self.output_folder.join(format!("{}_{}.png", asset_name, suffix));

        render.inner.occupancy().to_luma().save(path("inner")).context("failed to save inner silhouette")?;
        render.outer.occupancy().to_luma().save(path("outer")).context("failed to save outer silhouette")?;
        render.ring.image().save(path("ring")).context("failed to save ring")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba};
    use tempfile::tempdir;

    fn config_for(output: &Path) -> Config {
        let mut config = Config::default();
        config.output.output_folder = output.to_path_buf();
        config.border.seed = Some(3);
        config
    }

    fn disc(size: u32) -> RgbaImage {
        let c = size as f32 / 2.0;
        RgbaImage::from_fn(size, size, |x, y| {
            let (dx, dy) = (x as f32 - c, y as f32 - c);
            if dx * dx + dy * dy <= (c * 0.7).powi(2) {
                Rgba([90, 180, 60, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn writes_border_and_intermediates() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("salad.png");
        disc(48).save(&input).unwrap();

        let processor = Processor::new(&config_for(dir.path())).unwrap();
        let stats = processor.process(&input, None).unwrap();
        assert!(stats.primitives > 0);

        let border = image::open(dir.path().join("salad_border.png")).unwrap();
        assert_eq!((border.width(), border.height()), (96, 96));
        for suffix in ["inner", "outer", "ring"] {
            assert!(dir.path().join(format!("salad_{}.png", suffix)).exists(), "{}", suffix);
        }
    }

    #[test]
    fn opaque_photo_is_cut_out_by_its_mask() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("toast.png");
        let mask = dir.path().join("toast_mask.png");
        RgbaImage::from_pixel(40, 40, Rgba([200, 150, 90, 255])).save(&input).unwrap();
        GrayImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) { Luma([255]) } else { Luma([0]) }
        })
        .save(&mask)
        .unwrap();

        let mut config = config_for(dir.path());
        config.output.skip_intermediates = true;
        config.output.crop = true;
        config.output.crop_padding = 0;
        Processor::new(&config).unwrap().process(&input, Some(&mask)).unwrap();

        let border = image::open(dir.path().join("toast_border.png")).unwrap();
        // Cropped to the 20px subject plus gap and stroke on each side.
        assert!(border.width() < 80 && border.width() > 20);
        assert!(!dir.path().join("toast_ring.png").exists());
    }

    #[test]
    fn failure_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("empty.png");
        RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0])).save(&input).unwrap();

        let processor = Processor::new(&config_for(dir.path())).unwrap();
        assert!(processor.process(&input, None).is_err());
        assert!(!dir.path().join("empty_border.png").exists());
    }

    #[test]
    fn invalid_border_config_is_rejected() {
        let dir = tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.border.stroke_px = -1.0;
        assert!(Processor::new(&config).is_err());
    }
}
