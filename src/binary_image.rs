use bit_vec::BitVec;
use image::{GrayImage, Luma, RgbaImage};
use num_traits::Zero;

use crate::error::{Error, Result};

/// Axis-aligned box of set pixels: `x`/`y` is the first set column/row and
/// `width`/`height` count pixels, so the last set column is `x + width - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + (self.width as f32 - 1.0) / 2.0,
            self.y as f32 + (self.height as f32 - 1.0) / 2.0,
        )
    }
}

/// One bit per pixel: set means "inside the shape".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryImage {
    width: u32,
    height: u32,
    buffer: BitVec,
}

impl BinaryImage {
    #[inline]
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: BitVec::from_elem(width as usize * height as usize, false),
        }
    }

    /// Builds a mask from interleaved samples, a pixel is set when none of
    /// its channels is zero.
    #[must_use]
    pub fn from_raw<T>(width: u32, height: u32, buffer: &[T]) -> Self
    where
        T: Zero,
    {
        let image_size = width as usize * height as usize;
        debug_assert!(
            buffer.len() >= image_size,
            "Buffer must not be smaller than image dimensions"
        );
        if image_size == 0 {
            return Self::new(width, height);
        }
        let compress_step = buffer.len() / image_size;
        Self {
            buffer: buffer
                .chunks(compress_step)
                .take(image_size)
                .map(|pixel| !pixel.iter().any(Zero::is_zero))
                .collect(),
            height,
            width,
        }
    }

    pub fn from_alpha(image: &RgbaImage) -> Self {
        let buffer = image.pixels().map(|pixel| pixel.0[3] > 0).collect();
        Self {
            width: image.width(),
            height: image.height(),
            buffer,
        }
    }

    pub fn from_mask(image: &GrayImage, threshold: u8) -> Self {
        let buffer = image.pixels().map(|pixel| pixel.0[0] > threshold).collect();
        Self {
            width: image.width(),
            height: image.height(),
            buffer,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        debug_assert!(x < self.width && y < self.height, "Pixel out of bounds");
        self.buffer.get(self.index(x, y)).unwrap_or(false)
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        debug_assert!(x < self.width && y < self.height, "Pixel out of bounds");
        let index = self.index(x, y);
        self.buffer.set(index, value);
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn count_ones(&self) -> usize {
        self.buffer.iter().filter(|bit| *bit).count()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.none()
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width.max(1) as usize;
        self.buffer
            .iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0u32, 0u32);
        let mut found = false;
        for (x, y) in self.iter_ones() {
            found = true;
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }
        found.then(|| BoundingBox {
            x: min.0,
            y: min.1,
            width: max.0 - min.0 + 1,
            height: max.1 - min.1 + 1,
        })
    }

    pub fn difference(&self, other: &BinaryImage) -> Result<BinaryImage> {
        self.check_dimensions(other)?;
        let mut buffer = self.buffer.clone();
        buffer.difference(&other.buffer);
        Ok(Self { buffer, ..*self })
    }

    pub fn is_subset_of(&self, other: &BinaryImage) -> bool {
        self.dimensions() == other.dimensions()
            && self.buffer.iter().zip(other.buffer.iter()).all(|(a, b)| !a || b)
    }

    pub fn is_disjoint(&self, other: &BinaryImage) -> bool {
        self.dimensions() == other.dimensions()
            && !self.buffer.iter().zip(other.buffer.iter()).any(|(a, b)| a && b)
    }

    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) { Luma([255u8]) } else { Luma([0u8]) }
        })
    }

    fn check_dimensions(&self, other: &BinaryImage) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(Error::Geometry(format!(
                "mask size mismatch: {}x{} vs {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        Ok(())
    }
}
