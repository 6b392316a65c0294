//! Utility modules

pub mod image;
pub mod nms;

pub use image::ImageUtils;
pub use nms::greedy_nms;
