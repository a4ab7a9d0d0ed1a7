//! Cycle-stepped functional model of a fixed-function 2D convolution
//! accelerator: two loaders, a compute stage and an output serializer,
//! all advancing one unit of work per tick.

pub mod engine;

pub use engine::controller::{ConvAccelerator, ConvError};
pub use engine::params::{ConfigError, ConvParams};
