// Convolution Compute Stage
// One full kernel window (K*K multiply-accumulates) per tick.
use ndarray::{Array2, Array3};

use crate::engine::arith::{mac_step, relu_truncate};
use crate::engine::params::ConvParams;

/// Walks every (row, col, filter) output position, one position per tick,
/// and writes the ReLU-truncated dot product into the feature-map buffer.
///
/// Two cursor triples advance in lockstep: `cur_*` selects the input
/// window being read, `out_*` selects the feature-map cell being written.
/// They are redundant in the current design but modeled as separate
/// registers, as the hardware keeps them; `cursors()` exposes both so
/// tests can assert they never diverge.
#[derive(Debug)]
pub struct ConvComputeEngine {
    cur_row: usize,
    cur_col: usize,
    cur_filter: usize,
    out_row: usize,
    out_col: usize,
    out_filter: usize,
    acc: i64,
    buffer_ready: bool,
}

impl ConvComputeEngine {
    pub fn new() -> Self {
        Self {
            cur_row: 0,
            cur_col: 0,
            cur_filter: 0,
            out_row: 0,
            out_col: 0,
            out_filter: 0,
            acc: 0,
            buffer_ready: false,
        }
    }

    /// Advances the stage by one tick.
    ///
    /// `inputs_loaded` gates the whole stage: a free-running compute
    /// process could overtake the loaders, so the stage holds until both
    /// buffers are fully populated and every window is computed from
    /// committed data.
    pub fn step(
        &mut self,
        inputs_loaded: bool,
        image: &Array2<i64>,
        kernels: &Array3<i64>,
        feature_map: &mut Array3<i64>,
        params: &ConvParams,
    ) {
        if !inputs_loaded || self.buffer_ready {
            return;
        }
        // Window-origin bounds, written exactly as the hardware compares
        // them (img dim minus kernel size, inclusive).
        let row_bound = params.img_height - params.kernel_size;
        let col_bound = params.img_width - params.kernel_size;

        if self.cur_row > row_bound {
            self.buffer_ready = true;
            return;
        }

        if self.cur_col <= col_bound && self.cur_filter < params.num_filters {
            let mut acc = 0i64;
            for i in 0..params.kernel_size {
                for j in 0..params.kernel_size {
                    acc = mac_step(
                        acc,
                        image[[self.cur_row + i, self.cur_col + j]],
                        kernels[[self.cur_filter, i, j]],
                        params.acc_width,
                    );
                }
            }
            self.acc = acc;
            feature_map[[self.out_row, self.out_col, self.out_filter]] =
                relu_truncate(acc, params.data_width);

            // Write-position cursor: filter fastest, then column, then row.
            self.out_filter += 1;
            if self.out_filter >= params.num_filters {
                self.out_filter = 0;
                if self.out_col >= col_bound {
                    self.out_col = 0;
                    self.out_row += 1;
                } else {
                    self.out_col += 1;
                }
            }
            // Read-window cursor advances through the same bounds.
            self.cur_filter += 1;
            if self.cur_filter >= params.num_filters {
                self.cur_filter = 0;
                if self.cur_col >= col_bound {
                    self.cur_col = 0;
                    self.cur_row += 1;
                } else {
                    self.cur_col += 1;
                }
            }
        } else {
            // Fallback row advance. Unreachable while both cursors step
            // through the same bounds, but kept as the hardware keeps it:
            // if the bounds were ever parameterized apart this is the
            // path that closes out an exhausted column.
            self.cur_col = 0;
            self.cur_row += 1;
        }
    }

    /// True once every output position has been computed.
    pub fn buffer_ready(&self) -> bool {
        self.buffer_ready
    }

    /// Last committed accumulator value (pre-ReLU), for inspection.
    pub fn acc(&self) -> i64 {
        self.acc
    }

    /// Both cursor triples, `(read-window, write-position)`.
    pub fn cursors(&self) -> ((usize, usize, usize), (usize, usize, usize)) {
        (
            (self.cur_row, self.cur_col, self.cur_filter),
            (self.out_row, self.out_col, self.out_filter),
        )
    }

    pub fn reset(&mut self) {
        self.cur_row = 0;
        self.cur_col = 0;
        self.cur_filter = 0;
        self.out_row = 0;
        self.out_col = 0;
        self.out_filter = 0;
        self.acc = 0;
        self.buffer_ready = false;
    }
}

impl Default for ConvComputeEngine {
    fn default() -> Self {
        Self::new()
    }
}
