//! Images with physical-space metadata.

pub mod grid;
#[allow(clippy::module_inception)]
pub mod image;

pub use image::Image;
