#[cfg(feature = "native")]
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, SizedSample, Stream, StreamConfig,
};
use super::{dac_to_unit, SampleSink};
use crate::gen::Sample;
use log::{error, info};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Audio device standing in for the DAC
///
/// The stream plays back whatever level was written last, like a DAC holding
/// its output register between writes. `Stream` is not `Send` on every host,
/// so it stays with the owner of `CpalOutput`; the generator thread gets a
/// `CpalSink` that only touches the shared level.
#[cfg(feature = "native")]
pub struct CpalOutput {
    stream: Option<Stream>,
    device: Option<Device>,
    config: Option<StreamConfig>,
    sample_rate: f32,
    level: Arc<AtomicU32>,
}

/// `Send` handle that sets the level played by a `CpalOutput`
#[cfg(feature = "native")]
#[derive(Clone)]
pub struct CpalSink {
    level: Arc<AtomicU32>,
}

#[cfg(feature = "native")]
impl SampleSink for CpalSink {
    fn write(&mut self, sample: Sample) -> Result<(), anyhow::Error> {
        self.level.store(dac_to_unit(sample).to_bits(), Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(feature = "native")]
impl CpalOutput {
    pub fn new() -> Self {
        Self {
            stream: None,
            device: None,
            config: None,
            sample_rate: 44100.0,
            level: Arc::new(AtomicU32::new(0.0f32.to_bits())),
        }
    }

    /// Open the default output device and build a stream for it
    pub fn initialize(&mut self) -> Result<(), anyhow::Error> {
        self.setup_host_device()?;
        self.create_stream()
    }

    /// Handle for the generator thread
    pub fn sink(&self) -> CpalSink {
        CpalSink {
            level: self.level.clone(),
        }
    }

    /// Setup the CPAL host and device
    fn setup_host_device(&mut self) -> Result<(), anyhow::Error> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("Default output device is not available"))?;

        info!("Output device: {}", device.name()?);

        let config = device.default_output_config()?;
        info!("Default output config: {:?}", config);

        self.sample_rate = config.sample_rate().0 as f32;
        self.device = Some(device);
        self.config = Some(config.into());

        Ok(())
    }

    fn create_stream(&mut self) -> Result<(), anyhow::Error> {
        let device = self.device.as_ref().ok_or_else(|| anyhow::anyhow!("Device not initialized"))?;
        let config = self.config.as_ref().ok_or_else(|| anyhow::anyhow!("Config not initialized"))?;

        let supported_config = device.default_output_config()?;
        let level = self.level.clone();
        let stream = match supported_config.sample_format() {
            cpal::SampleFormat::I8 => Self::make_stream::<i8>(device, config, level)?,
            cpal::SampleFormat::I16 => Self::make_stream::<i16>(device, config, level)?,
            cpal::SampleFormat::I32 => Self::make_stream::<i32>(device, config, level)?,
            cpal::SampleFormat::I64 => Self::make_stream::<i64>(device, config, level)?,
            cpal::SampleFormat::U8 => Self::make_stream::<u8>(device, config, level)?,
            cpal::SampleFormat::U16 => Self::make_stream::<u16>(device, config, level)?,
            cpal::SampleFormat::U32 => Self::make_stream::<u32>(device, config, level)?,
            cpal::SampleFormat::U64 => Self::make_stream::<u64>(device, config, level)?,
            cpal::SampleFormat::F32 => Self::make_stream::<f32>(device, config, level)?,
            cpal::SampleFormat::F64 => Self::make_stream::<f64>(device, config, level)?,
            sample_format => {
                return Err(anyhow::anyhow!("Unsupported sample format '{}'", sample_format))
            }
        };

        self.stream = Some(stream);
        Ok(())
    }

    /// Create a typed stream for the given sample format
    fn make_stream<T>(
        device: &Device,
        config: &StreamConfig,
        level: Arc<AtomicU32>,
    ) -> Result<Stream, anyhow::Error>
    where
        T: SizedSample + FromSample<f32>,
    {
        let num_channels = config.channels as usize;
        let err_fn = |err| error!("Output stream error: {}", err);

        let stream = device.build_output_stream(
            config,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                let value: T = T::from_sample(f32::from_bits(level.load(Ordering::Relaxed)));
                for frame in output.chunks_mut(num_channels) {
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                }
            },
            err_fn,
            None,
        )?;

        Ok(stream)
    }

    /// Start the audio stream
    pub fn start(&mut self) -> Result<(), anyhow::Error> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Stream not created. Call initialize first."))?;
        stream.play()?;
        info!("Audio stream started at sample rate: {}", self.sample_rate);
        Ok(())
    }

    /// Stop the audio stream and park the output at the DAC midpoint
    pub fn stop(&mut self) -> Result<(), anyhow::Error> {
        self.level.store(0.0f32.to_bits(), Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            stream.pause()?;
            info!("Audio stream stopped");
        }
        Ok(())
    }
}

#[cfg(feature = "native")]
impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}
