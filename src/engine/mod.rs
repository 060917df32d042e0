//! Generator/output loop
//!
//! Advances the phase, snapshots the parameters, computes one sample, hands it
//! to the sink outside any lock and then paces itself to the target period.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use crate::gen::{compute_sample, PhaseCounter, Sample, STEPS};
use crate::params::ParamStore;
use crate::platform::SampleSink;

pub mod session;
pub mod shutdown;

pub use session::{Session, SessionHandle};
pub use shutdown::Shutdown;

/// How long a held output waits before re-reading the parameters
///
/// Also the longest single pacing wait; longer delays are split so an edit is
/// noticed within one interval.
pub const HOLD_INTERVAL: Duration = Duration::from_millis(100);

/// Rule for turning a frequency into a per-sample delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// One period spread over `STEPS` samples: `1000 / f / STEPS` ms each
    #[default]
    PerSample,
    /// A whole period per sample: `1000 / f` ms each
    PerPeriod,
}

impl Pacing {
    /// Delay after emitting one sample at `frequency`
    ///
    /// Returns `None` when the frequency cannot be paced (zero, negative or
    /// not finite); the generator then holds its output instead.
    pub fn delay(self, frequency: f64) -> Option<Duration> {
        if !(frequency > 0.0) || !frequency.is_finite() {
            return None;
        }
        let period_ms = 1000.0 / frequency;
        let delay_ms = match self {
            Pacing::PerSample => period_ms / STEPS as f64,
            Pacing::PerPeriod => period_ms,
        };
        // Whole nanoseconds; `as` saturates for absurdly low frequencies
        Some(Duration::from_nanos((delay_ms * 1_000_000.0).round() as u64))
    }
}

/// Generator lifecycle; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Running,
    Stopped,
}

/// What one loop iteration produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub phase: usize,
    pub sample: Sample,
    /// Wait before the next sample
    pub delay: Duration,
    /// True when the frequency could not be paced and the phase was held
    pub held: bool,
}

pub struct Generator<S: SampleSink> {
    store: Arc<ParamStore>,
    sink: S,
    shutdown: Shutdown,
    pacing: Pacing,
    phase: PhaseCounter,
    state: GeneratorState,
    emitted: u64,
    // Store revision the last sample was computed from
    revision: u64,
}

impl<S: SampleSink> Generator<S> {
    pub fn new(store: Arc<ParamStore>, sink: S, shutdown: Shutdown) -> Self {
        Self {
            store,
            sink,
            shutdown,
            pacing: Pacing::default(),
            phase: PhaseCounter::new(),
            state: GeneratorState::Running,
            emitted: 0,
            revision: 0,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn phase(&self) -> usize {
        self.phase.index()
    }

    /// Samples handed to the sink so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Emit one sample and advance the phase, without sleeping
    ///
    /// A sink failure stops the generator and is returned to the caller.
    pub fn step(&mut self) -> Result<Tick, anyhow::Error> {
        if self.state == GeneratorState::Stopped {
            return Err(anyhow::anyhow!("Generator already stopped"));
        }

        let (revision, params) = self.store.read_versioned();
        self.revision = revision;
        let phase = self.phase.index();
        let sample = compute_sample(phase, &params);

        // No lock is held here; the sink may block.
        if let Err(err) = self.sink.write(sample) {
            self.state = GeneratorState::Stopped;
            return Err(err.context(format!("Sample sink failed at phase {}", phase)));
        }
        self.emitted += 1;

        let tick = match self.pacing.delay(params.frequency) {
            Some(delay) => {
                self.phase.advance();
                Tick {
                    phase,
                    sample,
                    delay,
                    held: false,
                }
            }
            None => Tick {
                phase,
                sample,
                delay: HOLD_INTERVAL,
                held: true,
            },
        };
        Ok(tick)
    }

    /// Run until shutdown is signaled or the sink fails
    ///
    /// A sink failure signals shutdown so every other thread unwinds too.
    pub fn run(&mut self) -> Result<(), anyhow::Error> {
        info!("Generator running ({:?} pacing)", self.pacing);

        while self.state == GeneratorState::Running {
            if self.shutdown.is_signaled() {
                self.state = GeneratorState::Stopped;
                break;
            }

            let tick = match self.step() {
                Ok(tick) => tick,
                Err(err) => {
                    error!("{:#}", err);
                    self.shutdown.signal();
                    return Err(err);
                }
            };

            if self.pace(tick.delay) {
                self.state = GeneratorState::Stopped;
            }
        }

        debug!("Generator stopped after {} samples", self.emitted);
        Ok(())
    }

    /// Wait out `delay` in slices of at most `HOLD_INTERVAL`
    ///
    /// Returns early when the parameters change so the next sample uses them.
    /// Returns `true` if shutdown was signaled.
    pub fn pace(&self, delay: Duration) -> bool {
        let mut remaining = delay;
        while !remaining.is_zero() {
            let slice = remaining.min(HOLD_INTERVAL);
            if self.shutdown.wait_timeout(slice) {
                return true;
            }
            remaining -= slice;
            if !remaining.is_zero() && self.store.read_versioned().0 != self.revision {
                debug!("Parameters changed, cutting {:?} of pacing short", remaining);
                break;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::WaveformKind;
    use crate::params::{ParamLimits, ParameterSet};
    use crate::platform::{NullSink, RecordingSink};

    struct FailingSink;

    impl SampleSink for FailingSink {
        fn write(&mut self, _sample: Sample) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("device unplugged"))
        }
    }

    fn store(frequency: f64, kind: WaveformKind) -> Arc<ParamStore> {
        Arc::new(ParamStore::new(
            ParameterSet::new(frequency, 1.0, 1000, kind),
            ParamLimits::dac12(),
        ))
    }

    #[test]
    fn test_per_sample_delay() {
        assert_eq!(Pacing::PerSample.delay(1.0), Some(Duration::from_millis(10)));
        assert_eq!(Pacing::PerSample.delay(10.0), Some(Duration::from_millis(1)));
        assert_eq!(Pacing::PerPeriod.delay(2.0), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_unpaceable_frequencies() {
        assert_eq!(Pacing::PerSample.delay(0.0), None);
        assert_eq!(Pacing::PerSample.delay(-3.0), None);
        assert_eq!(Pacing::PerSample.delay(f64::NAN), None);
        assert_eq!(Pacing::PerSample.delay(f64::INFINITY), None);
    }

    #[test]
    fn test_step_emits_square_wave() {
        let sink = RecordingSink::new();
        let store = store(1.0, WaveformKind::Square);
        let mut generator = Generator::new(store, sink.clone(), Shutdown::new());

        for _ in 0..STEPS * 2 {
            generator.step().unwrap();
        }

        let samples = sink.samples();
        assert_eq!(samples.len(), STEPS * 2);
        assert!(samples[..50].iter().all(|&s| s == 0));
        assert!(samples[50..100].iter().all(|&s| s == 2000));
        assert_eq!(&samples[..STEPS], &samples[STEPS..]);
        assert_eq!(generator.phase(), 0);
    }

    #[test]
    fn test_zero_frequency_holds_phase() {
        let sink = RecordingSink::new();
        let store = store(0.0, WaveformKind::Sawtooth);
        let mut generator = Generator::new(store, sink, Shutdown::new());

        let first = generator.step().unwrap();
        let second = generator.step().unwrap();
        assert!(first.held && second.held);
        assert_eq!(first.delay, HOLD_INTERVAL);
        assert_eq!(first.sample, second.sample);
        assert_eq!(generator.phase(), 0);
    }

    #[test]
    fn test_parameter_change_applies_to_next_sample() {
        let store = store(1.0, WaveformKind::Square);
        let mut generator = Generator::new(store.clone(), RecordingSink::new(), Shutdown::new());

        let before = generator.step().unwrap();
        assert_eq!(before.delay, Duration::from_millis(10));

        store.apply_delta(crate::params::ParamDelta::Frequency(1.0));
        let after = generator.step().unwrap();
        assert_eq!(after.delay, Duration::from_millis(5));
    }

    #[test]
    fn test_pace_returns_after_edit() {
        let store = store(1.0, WaveformKind::Sine);
        let generator = Generator::new(store.clone(), RecordingSink::new(), Shutdown::new());

        store.apply_delta(crate::params::ParamDelta::Amplitude(1));
        let start = std::time::Instant::now();
        assert!(!generator.pace(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_pace_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.signal();
        let generator = Generator::new(store(1.0, WaveformKind::Sine), NullSink, shutdown);
        assert!(generator.pace(Duration::from_secs(30)));
    }

    #[test]
    fn test_sink_failure_stops_and_signals() {
        let shutdown = Shutdown::new();
        let store = store(10.0, WaveformKind::Sine);
        let mut generator = Generator::new(store, FailingSink, shutdown.clone());

        let err = generator.run().unwrap_err();
        assert!(format!("{:#}", err).contains("device unplugged"));
        assert_eq!(generator.state(), GeneratorState::Stopped);
        assert!(shutdown.is_signaled());
        assert!(generator.step().is_err());
    }

    #[test]
    fn test_run_exits_when_already_signaled() {
        let shutdown = Shutdown::new();
        shutdown.signal();
        let sink = RecordingSink::new();
        let mut generator = Generator::new(store(1.0, WaveformKind::Sine), sink.clone(), shutdown);

        generator.run().unwrap();
        assert_eq!(generator.state(), GeneratorState::Stopped);
        assert!(sink.is_empty());
    }
}
