/* Interactive waveform generator.
Initial values come from flags or prompts; afterwards the keyboard tunes the
waveform live while it plays on the selected output.
*/

#[cfg(all(feature = "cli", feature = "crossterm"))]
mod cli {
    use std::io;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use clap::{Parser, ValueEnum};
    use log::{info, warn};

    use wavegen::config::InitialConfig;
    use wavegen::terminal::{RawModeGuard, TerminalDisplay, TerminalInput};
    use wavegen::utils::{init_logger, level_for_verbosity};
    use wavegen::{Pacing, ParamLimits, ParamStore, SampleSink, Session, Shutdown, WaveformKind};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum Profile {
        /// 16-bit DAC: 0-10 Hz, amplitude 0-65535
        Dac16,
        /// 12-bit DAC: 0-100 Hz, amplitude 0-4095
        Dac12,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum PacingArg {
        /// One period spread across all samples
        PerSample,
        /// One full period between samples
        PerPeriod,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum Output {
        /// Default audio device (needs the `native` feature)
        Audio,
        /// WAV capture (needs the `bounce` feature)
        Wav,
        /// Discard samples
        Null,
    }

    // Capture by default when it is compiled in so samples always go somewhere
    #[cfg(feature = "bounce")]
    const DEFAULT_OUTPUT: Output = Output::Wav;
    #[cfg(not(feature = "bounce"))]
    const DEFAULT_OUTPUT: Output = Output::Null;

    #[derive(Parser, Debug)]
    #[command(about, version)]
    struct Args {
        /// Frequency of the wave in Hz
        #[arg(short, long)]
        frequency: Option<f64>,

        /// Pre-scale mean of the wave
        #[arg(short, long)]
        mean: Option<f64>,

        /// Amplitude of the wave
        #[arg(short, long)]
        amplitude: Option<u32>,

        /// Waveform: sine, square, sawtooth or triangular
        #[arg(short, long)]
        waveform: Option<WaveformKind>,

        /// Parameter ranges of the target board
        #[arg(long, value_enum, default_value_t = Profile::Dac16)]
        profile: Profile,

        #[arg(long, value_enum, default_value_t = PacingArg::PerSample)]
        pacing: PacingArg,

        #[arg(short, long, value_enum, default_value_t = DEFAULT_OUTPUT)]
        output: Output,

        /// Destination for `--output wav`
        #[arg(long, default_value = "wavegen.wav")]
        wav_path: PathBuf,

        /// Stop on our own after this many seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Increase log verbosity (-v, -vv, -vvv)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    }

    fn open_sink(
        args: &Args,
        audio: &mut Option<AudioDevice>,
    ) -> anyhow::Result<Box<dyn SampleSink>> {
        match args.output {
            Output::Null => {
                warn!("Output is 'null'; generated samples are discarded");
                Ok(Box::new(wavegen::platform::NullSink))
            }
            Output::Audio => {
                let device = AudioDevice::open()?;
                let sink = device.sink();
                *audio = Some(device);
                Ok(sink)
            }
            Output::Wav => open_wav(&args.wav_path),
        }
    }

    #[cfg(feature = "bounce")]
    fn open_wav(path: &std::path::Path) -> anyhow::Result<Box<dyn SampleSink>> {
        use wavegen::platform::wav_output::DEFAULT_CAPTURE_RATE;
        Ok(Box::new(wavegen::platform::WavSink::create(path, DEFAULT_CAPTURE_RATE)?))
    }

    #[cfg(not(feature = "bounce"))]
    fn open_wav(_path: &std::path::Path) -> anyhow::Result<Box<dyn SampleSink>> {
        Err(anyhow::anyhow!("WAV output needs the 'bounce' feature"))
    }

    #[cfg(feature = "native")]
    struct AudioDevice(wavegen::platform::cpal_output::CpalOutput);

    #[cfg(feature = "native")]
    impl AudioDevice {
        fn open() -> anyhow::Result<Self> {
            let mut output = wavegen::platform::cpal_output::CpalOutput::new();
            output.initialize()?;
            output.start()?;
            Ok(Self(output))
        }

        fn sink(&self) -> Box<dyn SampleSink> {
            Box::new(self.0.sink())
        }

        fn close(mut self) -> anyhow::Result<()> {
            self.0.stop()
        }
    }

    #[cfg(not(feature = "native"))]
    struct AudioDevice;

    #[cfg(not(feature = "native"))]
    impl AudioDevice {
        fn open() -> anyhow::Result<Self> {
            Err(anyhow::anyhow!("Audio output needs the 'native' feature"))
        }

        fn sink(&self) -> Box<dyn SampleSink> {
            Box::new(wavegen::platform::NullSink)
        }

        fn close(self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    pub fn run() -> anyhow::Result<()> {
        let args = Args::parse();
        init_logger(level_for_verbosity(args.verbose));

        let limits = match args.profile {
            Profile::Dac16 => ParamLimits::dac16(),
            Profile::Dac12 => ParamLimits::dac12(),
        };
        let pacing = match args.pacing {
            PacingArg::PerSample => Pacing::PerSample,
            PacingArg::PerPeriod => Pacing::PerPeriod,
        };

        let initial = InitialConfig {
            frequency: args.frequency,
            mean: args.mean,
            amplitude: args.amplitude,
            waveform: args.waveform,
        };
        let params = initial.resolve(&limits, &mut io::stdin().lock(), &mut io::stdout())?;
        info!("Starting with {:?}", params);

        let store = Arc::new(ParamStore::new(params, limits));
        let shutdown = Shutdown::new();

        let mut audio = None;
        let sink = open_sink(&args, &mut audio)?;

        let mut session = Session::new(store, shutdown).with_pacing(pacing);
        if let Some(seconds) = args.duration {
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|err| anyhow::anyhow!("Invalid duration {}: {}", seconds, err))?;
            session = session.with_watchdog(duration);
        }

        let result = {
            let _raw = RawModeGuard::enable()?;
            let handle = session.spawn(TerminalInput::new(), TerminalDisplay::new(limits), sink)?;
            handle.wait()
        };

        if let Some(device) = audio {
            device.close()?;
        }
        println!("Ending Program.");
        result
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_default_output_writes_somewhere() {
            let args = Args::try_parse_from(["wavegen"]).unwrap();
            assert_eq!(args.output, DEFAULT_OUTPUT);
            #[cfg(feature = "bounce")]
            assert_eq!(args.output, Output::Wav);
        }

        #[test]
        fn test_null_output_still_selectable() {
            let args = Args::try_parse_from(["wavegen", "--output", "null"]).unwrap();
            let mut audio = None;
            assert!(open_sink(&args, &mut audio).is_ok());
            assert!(audio.is_none());
        }
    }
}

#[cfg(all(feature = "cli", feature = "crossterm"))]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(not(all(feature = "cli", feature = "crossterm")))]
fn main() {
    println!("This binary is only available with the 'cli' and 'crossterm' features enabled.");
}
