//! SLIC superpixel flattening in Rust.
//!
//! This crate segments an image into superpixels with SLIC (Simple Linear Iterative
//! Clustering) and paints every superpixel with its mean color. Pixels are clustered in CIE
//! L\*a\*b\* plus position, transparent pixels (alpha 0) are left out of the clustering and keep
//! their original color. Alpha of every pixel is kept as it was.
//!
//! The following example describes how to process image in packed RGBA (RGBA 8bit) format:
//!
//! ```rust
//! use slic_flatten_rust::arrays::PackedImage;
//! use slic_flatten_rust::common::Config;
//! use slic_flatten_rust::driver::segment;
//!
//! fn main() {
//!     let (width, height) = (64, 48);
//!     let rgba: Vec<u8> = (0..width * height)
//!         .flat_map(|i| [(i % width) as u8 * 4, (i / width) as u8 * 5, 90, 255])
//!         .collect();
//!     // rows are tightly packed, origin is top-left
//!     let source = PackedImage::from_rgba8(&rgba, width as i32, height as i32).unwrap();
//!     // cell size 16, compactness 20
//!     let flattened = segment(&source, &Config::new(16, 20.0));
//!     assert_eq!(flattened.as_slice().len(), rgba.len());
//! }
//! ```
//!
//! Hosts with their own processing loop (progress bar, cancel and restart on parameter change)
//! implement `driver::Host` and step `driver::Segmentation`, or implement `driver::FilterHost`
//! and call `driver::run_filter()` which handles the whole filter run.
//!
//! It's also possible to use the building blocks directly (`slic::Clusters`,
//! `slic::iterate()`, `render::render()`) and get the distances map out of the algorithm.
//!
//! Processing is single-threaded and deterministic, the same input and parameters always give
//! the same output.
//!

pub mod arrays;
pub mod assign;
pub mod cielab;
pub mod cluster;
pub mod common;
pub mod driver;
pub mod error;
pub mod render;
pub mod slic;

pub use error::{Error, Result};
