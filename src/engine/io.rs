// Load / Drain Stages
// One scalar per tick in, one scalar per tick out.
use ndarray::{Array2, Array3};

use crate::engine::arith::wrap_signed;
use crate::engine::params::ConvParams;

/// Streams the flattened input image into the 2D pixel buffer, row-major,
/// one pixel per tick. Idles once the whole image has been copied.
#[derive(Debug, Default)]
pub struct ImageLoader {
    index: usize,
}

impl ImageLoader {
    pub fn step(&mut self, input: &[i64], image: &mut Array2<i64>, params: &ConvParams) {
        if self.index < params.image_len() {
            let row = self.index / params.img_width;
            let col = self.index % params.img_width;
            // Input wires are data_width bits wide; fold on ingest.
            image[[row, col]] = wrap_signed(input[self.index], params.data_width);
            self.index += 1;
        }
    }

    /// True once every pixel has been written for this activation.
    pub fn done(&self, params: &ConvParams) -> bool {
        self.index >= params.image_len()
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

/// Streams the flattened weight vector into the 3D kernel buffer, one
/// weight per tick, filters outermost.
#[derive(Debug, Default)]
pub struct KernelLoader {
    index: usize,
}

impl KernelLoader {
    pub fn step(&mut self, input: &[i64], kernels: &mut Array3<i64>, params: &ConvParams) {
        if self.index < params.kernel_len() {
            let k2 = params.kernel_size * params.kernel_size;
            let filter = self.index / k2;
            let row = (self.index % k2) / params.kernel_size;
            let col = self.index % params.kernel_size;
            kernels[[filter, row, col]] = wrap_signed(input[self.index], params.data_width);
            self.index += 1;
        }
    }

    pub fn done(&self, params: &ConvParams) -> bool {
        self.index >= params.kernel_len()
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

/// Drains the feature-map buffer into the flattened output vector, one
/// scalar per tick, filters innermost. Gated by `buffer_ready`: while the
/// compute stage is still working this stage forces `ready` low and does
/// nothing else, so `ready` can never outlive a reset or leak across
/// activations.
#[derive(Debug, Default)]
pub struct OutputSerializer {
    index: usize,
    ready: bool,
}

impl OutputSerializer {
    pub fn step(
        &mut self,
        buffer_ready: bool,
        feature_map: &Array3<i64>,
        output: &mut [i64],
        params: &ConvParams,
    ) {
        if !buffer_ready {
            self.ready = false;
            return;
        }
        if self.index < params.output_len() {
            let per_row = params.out_w() * params.num_filters;
            let row = self.index / per_row;
            let col = (self.index % per_row) / params.num_filters;
            let filt = self.index % params.num_filters;
            output[self.index] = feature_map[[row, col, filt]];
            self.index += 1;
        } else {
            self.ready = true;
        }
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.ready = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::ConvMemory;

    #[test]
    fn image_loads_row_major_one_pixel_per_tick() {
        let p = ConvParams::new(3, 2, 2, 1, 8, 16).unwrap();
        let mut mem = ConvMemory::new(&p);
        let input = [10, 11, 12, 20, 21, 22];
        let mut loader = ImageLoader::default();

        loader.step(&input, &mut mem.image, &p);
        assert_eq!(mem.image[[0, 0]], 10);
        assert_eq!(mem.image[[0, 1]], 0); // not loaded yet
        assert!(!loader.done(&p));

        for _ in 0..5 {
            loader.step(&input, &mut mem.image, &p);
        }
        assert!(loader.done(&p));
        assert_eq!(mem.image[[1, 2]], 22);

        // Exhausted loader is a no-op.
        loader.step(&input, &mut mem.image, &p);
        assert!(loader.done(&p));
    }

    #[test]
    fn image_loader_folds_wide_values() {
        let p = ConvParams::new(2, 1, 1, 1, 4, 8).unwrap();
        let mut mem = ConvMemory::new(&p);
        let input = [9, -9]; // out of 4-bit range
        let mut loader = ImageLoader::default();
        loader.step(&input, &mut mem.image, &p);
        loader.step(&input, &mut mem.image, &p);
        assert_eq!(mem.image[[0, 0]], -7);
        assert_eq!(mem.image[[0, 1]], 7);
    }

    #[test]
    fn kernel_index_decomposition() {
        let p = ConvParams::new(4, 4, 2, 2, 8, 16).unwrap();
        let mut mem = ConvMemory::new(&p);
        let input: Vec<i64> = (1..=8).collect();
        let mut loader = KernelLoader::default();
        for _ in 0..8 {
            loader.step(&input, &mut mem.kernels, &p);
        }
        assert!(loader.done(&p));
        assert_eq!(mem.kernels[[0, 0, 0]], 1);
        assert_eq!(mem.kernels[[0, 1, 1]], 4);
        assert_eq!(mem.kernels[[1, 0, 0]], 5);
        assert_eq!(mem.kernels[[1, 1, 1]], 8);
    }

    #[test]
    fn serializer_idles_and_forces_ready_low_until_gated_open() {
        let p = ConvParams::new(2, 2, 2, 1, 8, 16).unwrap();
        let mut mem = ConvMemory::new(&p);
        mem.feature_map[[0, 0, 0]] = 42;
        let mut out = vec![0i64; p.output_len()];
        let mut ser = OutputSerializer::default();

        ser.step(false, &mem.feature_map, &mut out, &p);
        assert!(!ser.ready());
        assert_eq!(out[0], 0);

        // One copy tick, then one tick to raise ready.
        ser.step(true, &mem.feature_map, &mut out, &p);
        assert_eq!(out[0], 42);
        assert!(!ser.ready());
        ser.step(true, &mem.feature_map, &mut out, &p);
        assert!(ser.ready());

        // Dropping the gate pulls ready back down.
        ser.step(false, &mem.feature_map, &mut out, &p);
        assert!(!ser.ready());
    }
}
