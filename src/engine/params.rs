// Datapath Parameters
use thiserror::Error;

/// Raised when a parameter set cannot describe a realizable datapath.
/// All checks happen at construction; once a `ConvParams` exists, every
/// index the datapath derives from it is in bounds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("kernel size {kernel} exceeds image dimension {dim}")]
    KernelTooLarge { kernel: usize, dim: usize },

    #[error("dimension '{0}' must be nonzero")]
    ZeroDimension(&'static str),

    #[error("data width {0} out of supported range 1..=32")]
    DataWidthOutOfRange(u32),

    #[error("accumulator width {acc} out of supported range {data}..=64")]
    AccWidthOutOfRange { acc: u32, data: u32 },

    #[error("flattened {which} has length {got}, expected {expected}")]
    InputLengthMismatch {
        which: &'static str,
        got: usize,
        expected: usize,
    },
}

/// Static configuration of one accelerator instance.
///
/// Widths are in bits; every pixel, weight and output scalar is a signed
/// `data_width`-bit quantity, and the dot-product accumulator is a signed
/// `acc_width`-bit quantity. Host arithmetic runs in `i64`, so widths are
/// capped where the explicit wrap helpers stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvParams {
    pub img_width: usize,
    pub img_height: usize,
    pub kernel_size: usize,
    pub num_filters: usize,
    pub data_width: u32,
    pub acc_width: u32,
}

impl ConvParams {
    pub fn new(
        img_width: usize,
        img_height: usize,
        kernel_size: usize,
        num_filters: usize,
        data_width: u32,
        acc_width: u32,
    ) -> Result<Self, ConfigError> {
        if img_width == 0 {
            return Err(ConfigError::ZeroDimension("img_width"));
        }
        if img_height == 0 {
            return Err(ConfigError::ZeroDimension("img_height"));
        }
        if kernel_size == 0 {
            return Err(ConfigError::ZeroDimension("kernel_size"));
        }
        if num_filters == 0 {
            return Err(ConfigError::ZeroDimension("num_filters"));
        }
        if kernel_size > img_width {
            return Err(ConfigError::KernelTooLarge {
                kernel: kernel_size,
                dim: img_width,
            });
        }
        if kernel_size > img_height {
            return Err(ConfigError::KernelTooLarge {
                kernel: kernel_size,
                dim: img_height,
            });
        }
        if data_width == 0 || data_width > 32 {
            return Err(ConfigError::DataWidthOutOfRange(data_width));
        }
        if acc_width < data_width || acc_width > 64 {
            return Err(ConfigError::AccWidthOutOfRange {
                acc: acc_width,
                data: data_width,
            });
        }
        Ok(Self {
            img_width,
            img_height,
            kernel_size,
            num_filters,
            data_width,
            acc_width,
        })
    }

    /// Feature-map height: one output row per valid vertical window position.
    pub fn out_h(&self) -> usize {
        self.img_height - self.kernel_size + 1
    }

    /// Feature-map width: one output column per valid horizontal window position.
    pub fn out_w(&self) -> usize {
        self.img_width - self.kernel_size + 1
    }

    /// Length of the flattened input image.
    pub fn image_len(&self) -> usize {
        self.img_width * self.img_height
    }

    /// Length of the flattened kernel-weight vector.
    pub fn kernel_len(&self) -> usize {
        self.num_filters * self.kernel_size * self.kernel_size
    }

    /// Length of the flattened output feature map.
    pub fn output_len(&self) -> usize {
        self.out_h() * self.out_w() * self.num_filters
    }

    /// The "Lookahead": exact number of ticks a fresh activation needs
    /// before `ready` is observable.
    ///
    /// Both loaders run concurrently, so the load phase lasts
    /// `max(image_len, kernel_len)` ticks. The compute stage then emits one
    /// window per tick plus one trailing tick to raise `buffer_ready`, and
    /// the serializer mirrors that shape: one scalar per tick plus one
    /// trailing tick to raise `ready`. Within a tick the stages run in
    /// dependency order, so each trailing tick overlaps the next stage's
    /// first working tick.
    pub fn ticks_to_ready(&self) -> u64 {
        let load = self.image_len().max(self.kernel_len()) as u64;
        load + 2 * self.output_len() as u64
    }
}
