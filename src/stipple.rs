use std::f32::consts::PI;

use geo::Coord;
use image::{GrayImage, Rgba, RgbaImage};
use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::{BorderConfig, SizeRange};
use crate::draw::{DrawPrimitive, Primitive};
use crate::error::Result;
use crate::ring::Ring;

/// Candidate grid resolution along the longer canvas side.
pub const TARGET_SAMPLES_PER_SIDE: u32 = 200;
pub const MIN_PRIMITIVES: usize = 500;
const DASH_WIDTH_FACTOR: (f32, f32) = (0.6, 1.2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StippleStats {
    pub stride: u32,
    pub candidates: usize,
    pub primitives: usize,
    pub dots: usize,
    pub dashes: usize,
    /// Pixels left opaque after clipping to the ring.
    pub painted_pixels: usize,
}

#[derive(Debug, Clone)]
pub struct Stippled {
    pub image: RgbaImage,
    pub stats: StippleStats,
}

/// Turns a solid ring into scattered dots and dashes that stay inside it.
#[derive(Debug, Clone)]
pub struct StippleRenderer {
    dot_ratio: f64,
    dot_size_range: SizeRange,
    line_length_range: SizeRange,
    stroke_px: f32,
    jitter_amount: f32,
    density: f32,
}

impl StippleRenderer {
    pub fn new(config: &BorderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dot_ratio: config.dot_ratio as f64,
            dot_size_range: config.dot_size_range,
            line_length_range: config.line_length_range,
            stroke_px: config.stroke_px,
            jitter_amount: config.jitter_amount,
            density: config.density(),
        })
    }

    /// Grid step giving roughly `TARGET_SAMPLES_PER_SIDE` samples per side.
    pub fn sample_stride(width: u32, height: u32) -> u32 {
        (width.max(height) / TARGET_SAMPLES_PER_SIDE).max(1)
    }

    pub fn candidates(ring: &Ring, stride: u32) -> Vec<Coord<f32>> {
        let (width, height) = ring.dimensions();
        let region = ring.region();
        let mut points = Vec::new();
        for y in (0..height).step_by(stride as usize) {
            for x in (0..width).step_by(stride as usize) {
                if region.get(x, y) {
                    points.push(Coord { x: x as f32, y: y as f32 });
                }
            }
        }
        points
    }

    pub fn target_count(&self, candidates: usize) -> usize {
        ((candidates as f32 * self.density).round() as usize).max(MIN_PRIMITIVES)
    }

    /// Scatters marks around randomly picked candidates. Jitter and mark sizes
    /// are capped at `diagonal`, the canvas diagonal.
    pub fn plan<R: Rng>(&self, candidates: &[Coord<f32>], stride: u32, diagonal: f32, rng: &mut R) -> Vec<Primitive> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let spread = 2.0 * stride as f32;
        let jitter = self.jitter_amount.min(diagonal);
        let count = self.target_count(candidates.len());
        let mut primitives = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(&anchor) = candidates.choose(rng) else {
                break;
            };
            let center = Coord {
                x: anchor.x + rng.gen_range(-spread..=spread) + rng.gen_range(-jitter..=jitter),
                y: anchor.y + rng.gen_range(-spread..=spread) + rng.gen_range(-jitter..=jitter),
            };
            let primitive = if rng.gen_bool(self.dot_ratio) {
                let radius = rng.gen_range(self.dot_size_range.min / 2.0..=self.dot_size_range.max / 2.0);
                let radius = radius.min(diagonal);
                Primitive::Dot { center, radius }
            } else {
                let angle = rng.gen_range(0.0..PI);
                let length = rng.gen_range(self.line_length_range.min..=self.line_length_range.max);
                let width = self.stroke_px * rng.gen_range(DASH_WIDTH_FACTOR.0..=DASH_WIDTH_FACTOR.1);
                let (length, width) = (length.min(diagonal), width.min(diagonal));
                Primitive::dash(center, angle, length, width)
            };
            primitives.push(primitive);
        }
        primitives
    }

    pub fn render<R: Rng>(&self, ring: &Ring, rng: &mut R) -> Stippled {
        let (width, height) = ring.dimensions();
        let stride = Self::sample_stride(width, height);
        let candidates = Self::candidates(ring, stride);
        if candidates.is_empty() {
            debug!("ring has no sample points at stride {}, leaving it as is", stride);
            return Stippled {
                image: ring.image().clone(),
                stats: StippleStats {
                    stride,
                    ..Default::default()
                },
            };
        }

        let diagonal = (width as f32).hypot(height as f32);
        let primitives = self.plan(&candidates, stride, diagonal, rng);
        let dots = primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Dot { .. }))
            .count();

        let mut stencil = GrayImage::new(width, height);
        primitives.as_slice().draw(&mut stencil);

        // Marks come from a coarse sample of the band, clip them to the exact band.
        let mut image = ring.image().clone();
        let mut painted_pixels = 0;
        for (pixel, mark) in image.pixels_mut().zip(stencil.pixels()) {
            if mark.0[0] == 0 || pixel.0[3] == 0 {
                *pixel = Rgba([0, 0, 0, 0]);
            } else {
                painted_pixels += 1;
            }
        }

        let stats = StippleStats {
            stride,
            candidates: candidates.len(),
            primitives: primitives.len(),
            dots,
            dashes: primitives.len() - dots,
            painted_pixels,
        };
        debug!("stippled ring: {:?}", stats);
        Stippled { image, stats }
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::binary_image::BinaryImage;
    use crate::config::Color;
    use crate::error::ErrorKind;
    use crate::ring::RingCompositor;
    use crate::silhouette::Silhouette;

    fn square_ring(canvas: u32, outer: (u32, u32), inner: (u32, u32)) -> Ring {
        let square = |(from, to): (u32, u32)| {
            Silhouette::from_coverage(GrayImage::from_fn(canvas, canvas, |x, y| {
                if (from..to).contains(&x) && (from..to).contains(&y) { Luma([255]) } else { Luma([0]) }
            }))
        };
        RingCompositor::compose(&square(outer), &square(inner), Color::WHITE).unwrap()
    }

    #[test]
    fn stride_targets_two_hundred_samples() {
        assert_eq!(StippleRenderer::sample_stride(100, 50), 1);
        assert_eq!(StippleRenderer::sample_stride(400, 400), 2);
        assert_eq!(StippleRenderer::sample_stride(300, 1000), 5);
    }

    #[test]
    fn candidates_lie_in_the_band() {
        let ring = square_ring(40, (5, 35), (10, 30));
        let points = StippleRenderer::candidates(&ring, 2);
        assert!(!points.is_empty());
        assert!(points.iter().all(|p| ring.region().get(p.x as u32, p.y as u32)));
    }

    #[test]
    fn target_count_has_a_floor() {
        let renderer = StippleRenderer::new(&BorderConfig::default()).unwrap();
        assert_eq!(renderer.target_count(10), MIN_PRIMITIVES);
        assert_eq!(renderer.target_count(10_000), 3_000);
    }

    #[test]
    fn wider_spacing_means_fewer_marks() {
        let sparse = StippleRenderer::new(&BorderConfig { spacing: 24.0, ..Default::default() }).unwrap();
        assert_eq!(sparse.target_count(10_000), 1_500);
    }

    #[test]
    fn empty_ring_is_returned_unchanged() {
        let ring = square_ring(20, (5, 10), (5, 10));
        let out = StippleRenderer::new(&BorderConfig::default()).unwrap().render(&ring, &mut StdRng::seed_from_u64(1));
        assert_eq!(out.stats.candidates, 0);
        assert_eq!(out.stats.primitives, 0);
        assert_eq!(&out.image, ring.image());
    }

    #[test]
    fn marks_never_leave_the_ring() {
        let ring = square_ring(80, (10, 70), (16, 64));
        let out = StippleRenderer::new(&BorderConfig::default()).unwrap().render(&ring, &mut StdRng::seed_from_u64(7));
        let painted = BinaryImage::from_alpha(&out.image);
        assert!(painted.is_subset_of(ring.region()));
        assert!(out.stats.painted_pixels > 0);
        assert_eq!(out.stats.painted_pixels, painted.count_ones());
        assert_eq!(out.stats.dots + out.stats.dashes, out.stats.primitives);
    }

    #[test]
    fn zero_sized_marks_leave_nothing() {
        let config = BorderConfig {
            dot_size_range: SizeRange::new(0.0, 0.0),
            line_length_range: SizeRange::new(0.0, 0.0),
            ..Default::default()
        };
        let ring = square_ring(60, (5, 55), (12, 48));
        let out = StippleRenderer::new(&config).unwrap().render(&ring, &mut StdRng::seed_from_u64(3));
        assert!(out.stats.primitives >= MIN_PRIMITIVES);
        assert_eq!(out.stats.painted_pixels, 0);
    }

    #[test]
    fn all_dots_or_all_dashes() {
        let ring = square_ring(60, (5, 55), (12, 48));
        let dots = StippleRenderer::new(&BorderConfig { dot_ratio: 1.0, ..Default::default() })
            .unwrap()
            .render(&ring, &mut StdRng::seed_from_u64(5));
        assert_eq!(dots.stats.dashes, 0);
        let dashes = StippleRenderer::new(&BorderConfig { dot_ratio: 0.0, ..Default::default() })
            .unwrap()
            .render(&ring, &mut StdRng::seed_from_u64(5));
        assert_eq!(dashes.stats.dots, 0);
    }

    #[test]
    fn same_seed_same_pattern() {
        let ring = square_ring(60, (5, 55), (12, 48));
        let renderer = StippleRenderer::new(&BorderConfig::default()).unwrap();
        let a = renderer.render(&ring, &mut StdRng::seed_from_u64(11));
        let b = renderer.render(&ring, &mut StdRng::seed_from_u64(11));
        assert_eq!(a.image, b.image);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = StippleRenderer::new(&BorderConfig { dot_ratio: 1.5, ..Default::default() }).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let inverted = BorderConfig { line_length_range: SizeRange::new(9.0, 2.0), ..Default::default() };
        assert!(StippleRenderer::new(&inverted).is_err());
    }

    #[test]
    fn planned_marks_fit_the_canvas() {
        let config = BorderConfig {
            dot_ratio: 0.5,
            dot_size_range: SizeRange::new(5e9, 5e9),
            line_length_range: SizeRange::new(1e12, 1e12),
            ..Default::default()
        };
        let candidates = [Coord { x: 10.0, y: 10.0 }];
        let marks = StippleRenderer::new(&config).unwrap().plan(&candidates, 1, 50.0, &mut StdRng::seed_from_u64(2));
        for mark in marks {
            match mark {
                Primitive::Dot { radius, .. } => assert_eq!(radius, 50.0),
                Primitive::Dash { start, end, .. } => {
                    let d = end - start;
                    assert!((d.x * d.x + d.y * d.y).sqrt() <= 50.0 + 1e-3);
                }
            }
        }
    }

    #[test]
    fn oversized_marks_and_jitter_stay_bounded() {
        let ring = square_ring(60, (5, 55), (12, 48));
        let configs = [
            BorderConfig { dot_ratio: 1.0, dot_size_range: SizeRange::new(5e9, 5e9), ..Default::default() },
            BorderConfig { dot_ratio: 0.0, line_length_range: SizeRange::new(1e12, 1e12), ..Default::default() },
            BorderConfig { dot_ratio: 1.0, dot_size_range: SizeRange::new(1e5, 1e5), ..Default::default() },
            BorderConfig { jitter_amount: 1e30, ..Default::default() },
        ];
        for config in &configs {
            let out = StippleRenderer::new(config).unwrap().render(&ring, &mut StdRng::seed_from_u64(1));
            assert!(BinaryImage::from_alpha(&out.image).is_subset_of(ring.region()));
        }
    }
}
