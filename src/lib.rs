mod binary_image;
mod budget;
mod config;
mod frame;
mod mask;
mod ring;
mod silhouette;
pub mod draw;
pub mod error;
pub mod stipple;

pub use crate::binary_image::{BinaryImage, BoundingBox};
pub use crate::budget::{generate_with_budget, render_with_budget, DEFAULT_BUDGET};
pub use crate::config::{BorderConfig, CanvasPolicy, Color, Expansion, SizeRange};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::frame::{
    crop_to_content, encode_png, generate_contour_border, generate_contour_border_from_bytes, BorderRender,
    ContourBorder,
};
pub use crate::mask::{apply_cutout_mask, AlphaMask};
pub use crate::ring::{Ring, RingCompositor};
pub use crate::silhouette::{CanvasLayout, Silhouette, SilhouetteExpander};
pub use crate::stipple::{StippleRenderer, StippleStats};
