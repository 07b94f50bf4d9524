//! Tensor shapes whose dimensions may be left to be inferred at run time.

mod common;

pub mod dim;
pub use dim::*;

pub mod shape;
pub use shape::*;
