// Buffer Memory
use ndarray::{Array2, Array3};

use crate::engine::params::ConvParams;

/// The three on-chip buffers the four stages share.
///
/// Implements "Scope Memory" - the buffers live exactly as long as the
/// accelerator instance that owns them, and each stage receives a
/// controlled borrow from the controller for the duration of one tick.
/// Reset deliberately leaves contents alone: the hardware this models
/// only resets progress counters, and stale data is overwritten by the
/// next activation before anything downstream reads it.
#[derive(Debug)]
pub struct ConvMemory {
    /// Pixel buffer, `[row][col]`, written by the image loader.
    pub image: Array2<i64>,
    /// Weight buffer, `[filter][row][col]`, written by the kernel loader.
    pub kernels: Array3<i64>,
    /// Convolution results, `[row][col][filter]`, written by the compute
    /// stage and drained by the serializer.
    pub feature_map: Array3<i64>,
}

impl ConvMemory {
    /// Allocates all buffers zeroed for the given parameter set.
    pub fn new(params: &ConvParams) -> Self {
        Self {
            image: Array2::zeros((params.img_height, params.img_width)),
            kernels: Array3::zeros((
                params.num_filters,
                params.kernel_size,
                params.kernel_size,
            )),
            feature_map: Array3::zeros((params.out_h(), params.out_w(), params.num_filters)),
        }
    }
}
