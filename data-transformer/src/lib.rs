//! Seedable image and annotation augmentation.
//!
//! A [TransformPipeline] turns a raw [Sample] into a fixed-shape tensor in
//! N×C×H×W layout, re-expressing its bounding-box annotations under every
//! geometric step it applies. The output shape is computed up front by
//! [infer_shape] so callers can preallocate destinations, and
//! [BatchAdapter] drives the pipeline over whole batches.

mod common;

pub mod annotation;
pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod geometry;
pub mod normalize;
pub mod pipeline;
pub mod random;
pub mod sample;
pub mod shape;
pub mod step;
#[cfg(feature = "with-tch")]
mod with_tch;

pub use annotation::*;
pub use batch::*;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use pipeline::*;
pub use random::*;
pub use sample::*;
pub use shape::*;
pub use step::*;
pub use tensor_shape::{Dim, Shape};
