//! WAV capture of the generated waveform
//!
//! Every sample written becomes one mono 16-bit frame, so the file holds the
//! exact sequence of DAC codes rather than a real-time recording.

use super::{dac_to_unit, SampleSink};
use crate::gen::Sample;
use anyhow::Context;
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Nominal frame rate written into the WAV header
pub const DEFAULT_CAPTURE_RATE: u32 = 44100;

pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    path: PathBuf,
    frames: u64,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self, anyhow::Error> {
        let path = path.as_ref().to_path_buf();
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file {}", path.display()))?;
        info!("Capturing samples to {}", path.display());
        Ok(Self {
            writer: Some(writer),
            path,
            frames: 0,
        })
    }

    /// Number of frames written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flush the header and close the file
    pub fn finish(mut self) -> Result<(), anyhow::Error> {
        self.finalize()
    }

    fn finalize(&mut self) -> Result<(), anyhow::Error> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .with_context(|| format!("Failed to finalize {}", self.path.display()))?;
            info!("Wrote {} frames to {}", self.frames, self.path.display());
        }
        Ok(())
    }
}

impl SampleSink for WavSink {
    fn write(&mut self, sample: Sample) -> Result<(), anyhow::Error> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("WAV capture already finished"))?;
        let value = (dac_to_unit(sample) * i16::MAX as f32).round() as i16;
        writer.write_sample(value)?;
        self.frames += 1;
        Ok(())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            warn!("{:#}", err);
        }
    }
}
