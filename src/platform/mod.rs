/// Platform abstraction for sample output
/// This module provides a unified interface for handing generated samples to a
/// device (native audio via CPAL, WAV capture, in-memory recording).

use crate::gen::Sample;
use std::sync::{Arc, Mutex};

/// Full-scale code of the 16-bit unipolar DAC the samples are sized for
pub const DAC_FULL_SCALE: Sample = 0xFFFF;

/// Trait for anything that consumes generated samples
///
/// `write` may block (a slow device is a suspension point of the generator
/// thread). An error is fatal to the generator; sinks own any retry policy.
pub trait SampleSink: Send {
    /// Push one sample to the device
    fn write(&mut self, sample: Sample) -> Result<(), anyhow::Error>;
}

impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn write(&mut self, sample: Sample) -> Result<(), anyhow::Error> {
        (**self).write(sample)
    }
}

/// Map a DAC code onto the [-1.0, 1.0] range of an audio device
///
/// Codes outside the DAC range saturate, as the hardware output would.
pub fn dac_to_unit(sample: Sample) -> f32 {
    let clamped = sample.clamp(0, DAC_FULL_SCALE);
    (clamped as f32 / DAC_FULL_SCALE as f32) * 2.0 - 1.0
}

/// Sink that keeps every sample in a shared buffer
#[derive(Clone, Default)]
pub struct RecordingSink {
    samples: Arc<Mutex<Vec<Sample>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSink for RecordingSink {
    fn write(&mut self, sample: Sample) -> Result<(), anyhow::Error> {
        self.samples
            .lock()
            .map_err(|_| anyhow::anyhow!("Recording buffer poisoned"))?
            .push(sample);
        Ok(())
    }
}

/// Sink that discards samples
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SampleSink for NullSink {
    fn write(&mut self, _sample: Sample) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

// Platform-specific implementations
#[cfg(feature = "native")]
pub mod cpal_output;

#[cfg(feature = "bounce")]
pub mod wav_output;

// Re-export platform-specific types
#[cfg(feature = "native")]
pub use self::cpal_output::CpalSink;

#[cfg(feature = "bounce")]
pub use self::wav_output::WavSink;
