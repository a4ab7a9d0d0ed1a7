// Module Definition
pub mod arith;
pub mod controller;
pub mod io;
pub mod kernels; // Convolution compute stage
pub mod memory; // Shared image / kernel / feature-map buffers
pub mod params;
