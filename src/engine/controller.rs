// Controller
use log::{debug, trace};
use thiserror::Error;

use crate::engine::io::{ImageLoader, KernelLoader, OutputSerializer};
use crate::engine::kernels::ConvComputeEngine;
use crate::engine::memory::ConvMemory;
use crate::engine::params::{ConfigError, ConvParams};

/// Runtime faults an external driver can hit. Arithmetic overflow is
/// never one of them: wraparound at the accumulator width is defined
/// behavior of the datapath.
#[derive(Debug, Error)]
pub enum ConvError {
    #[error("output read before ready")]
    NotReady,

    #[error("ready not observed within {0} ticks")]
    TickBudgetExceeded(u64),
}

/// Top-level engine: owns the buffers and the four stages, and advances
/// all of them by exactly one unit of work per `tick()`.
///
/// Within a tick the stages run serialized in dependency order (loaders,
/// then compute, then serializer); across ticks this preserves
/// synchronous-register semantics while keeping each stage's state fully
/// owned by the controller.
#[derive(Debug)]
pub struct ConvAccelerator {
    params: ConvParams,
    memory: ConvMemory,
    image_in: Vec<i64>,
    kernel_in: Vec<i64>,
    output: Vec<i64>,
    image_loader: ImageLoader,
    kernel_loader: KernelLoader,
    compute: ConvComputeEngine,
    serializer: OutputSerializer,
    cycle: u64,
}

impl ConvAccelerator {
    /// Builds an accelerator for `params` with its first activation's
    /// inputs installed. Rejects misconfiguration eagerly; a constructed
    /// instance can never index out of bounds.
    pub fn new(
        params: ConvParams,
        image: Vec<i64>,
        kernels: Vec<i64>,
    ) -> Result<Self, ConfigError> {
        check_len("image", image.len(), params.image_len())?;
        check_len("kernel weights", kernels.len(), params.kernel_len())?;
        debug!(
            "accelerator configured: {}x{} image, {} {}x{} kernels, {}/{}-bit datapath",
            params.img_width,
            params.img_height,
            params.num_filters,
            params.kernel_size,
            params.kernel_size,
            params.data_width,
            params.acc_width,
        );
        Ok(Self {
            memory: ConvMemory::new(&params),
            output: vec![0; params.output_len()],
            image_in: image,
            kernel_in: kernels,
            image_loader: ImageLoader::default(),
            kernel_loader: KernelLoader::default(),
            compute: ConvComputeEngine::new(),
            serializer: OutputSerializer::default(),
            cycle: 0,
            params,
        })
    }

    /// Installs fresh flattened inputs for the next activation. Call
    /// together with [`reset`](Self::reset); progress counters are not
    /// touched here.
    pub fn load_inputs(&mut self, image: Vec<i64>, kernels: Vec<i64>) -> Result<(), ConfigError> {
        check_len("image", image.len(), self.params.image_len())?;
        check_len("kernel weights", kernels.len(), self.params.kernel_len())?;
        self.image_in = image;
        self.kernel_in = kernels;
        Ok(())
    }

    /// One synchronous clock edge: every stage advances one unit of work.
    pub fn tick(&mut self) {
        let was_buffer_ready = self.compute.buffer_ready();
        let was_ready = self.serializer.ready();

        self.image_loader
            .step(&self.image_in, &mut self.memory.image, &self.params);
        self.kernel_loader
            .step(&self.kernel_in, &mut self.memory.kernels, &self.params);

        let loaders_done =
            self.image_loader.done(&self.params) && self.kernel_loader.done(&self.params);
        self.compute.step(
            loaders_done,
            &self.memory.image,
            &self.memory.kernels,
            &mut self.memory.feature_map,
            &self.params,
        );
        self.serializer.step(
            self.compute.buffer_ready(),
            &self.memory.feature_map,
            &mut self.output,
            &self.params,
        );

        self.cycle += 1;
        trace!("cycle {}", self.cycle);
        if !was_buffer_ready && self.compute.buffer_ready() {
            debug!("feature map complete at cycle {}", self.cycle);
        }
        if !was_ready && self.serializer.ready() {
            debug!("output serialized at cycle {}", self.cycle);
        }
    }

    /// Synchronous reset: zeroes every cursor, flag and the accumulator
    /// across all four stages at once. Buffer contents persist; the next
    /// activation overwrites them. Partial reset is not representable.
    pub fn reset(&mut self) {
        self.image_loader.reset();
        self.kernel_loader.reset();
        self.compute.reset();
        self.serializer.reset();
        self.cycle = 0;
        debug!("reset asserted, new activation");
    }

    /// Ticks until `ready`, up to `max_ticks`. Returns the number of
    /// ticks consumed. `params.ticks_to_ready()` is always a sufficient
    /// budget for a fresh activation.
    pub fn run_to_ready(&mut self, max_ticks: u64) -> Result<u64, ConvError> {
        for n in 1..=max_ticks {
            self.tick();
            if self.ready() {
                return Ok(n);
            }
        }
        Err(ConvError::TickBudgetExceeded(max_ticks))
    }

    /// True exactly when the full output vector has been written for the
    /// current activation and no reset has occurred since.
    pub fn ready(&self) -> bool {
        self.serializer.ready()
    }

    /// True once the compute stage has filled the feature-map buffer.
    pub fn buffer_ready(&self) -> bool {
        self.compute.buffer_ready()
    }

    /// The flattened feature map. Only complete once [`ready`](Self::ready)
    /// reports true.
    pub fn output(&self) -> Result<&[i64], ConvError> {
        if !self.ready() {
            return Err(ConvError::NotReady);
        }
        Ok(&self.output)
    }

    /// Cycles ticked since construction or the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn params(&self) -> &ConvParams {
        &self.params
    }

    /// Both compute-stage cursor triples, for lockstep cross-checks.
    pub fn compute_cursors(&self) -> ((usize, usize, usize), (usize, usize, usize)) {
        self.compute.cursors()
    }
}

fn check_len(which: &'static str, got: usize, expected: usize) -> Result<(), ConfigError> {
    if got != expected {
        return Err(ConfigError::InputLengthMismatch {
            which,
            got,
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_input_lengths() {
        let p = ConvParams::new(4, 4, 2, 1, 8, 16).unwrap();
        let err = ConvAccelerator::new(p, vec![0; 15], vec![0; 4]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InputLengthMismatch {
                got: 15,
                expected: 16,
                ..
            }
        ));
        assert!(ConvAccelerator::new(p, vec![0; 16], vec![0; 5]).is_err());
    }

    #[test]
    fn output_unreadable_before_ready() {
        let p = ConvParams::new(4, 4, 2, 1, 8, 16).unwrap();
        let mut acc = ConvAccelerator::new(p, vec![1; 16], vec![1; 4]).unwrap();
        assert!(matches!(acc.output(), Err(ConvError::NotReady)));
        acc.tick();
        assert!(matches!(acc.output(), Err(ConvError::NotReady)));
    }

    #[test]
    fn tick_budget_error_carries_budget() {
        let p = ConvParams::new(4, 4, 2, 1, 8, 16).unwrap();
        let mut acc = ConvAccelerator::new(p, vec![1; 16], vec![1; 4]).unwrap();
        assert!(matches!(
            acc.run_to_ready(3),
            Err(ConvError::TickBudgetExceeded(3))
        ));
    }
}
