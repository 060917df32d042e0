//! Per-sample waveform math
//!
//! Each shape maps a phase position in `[0, STEPS)` plus the current parameters
//! to one integer DAC sample. The shapes are pure; the only state is the
//! `PhaseCounter` owned by the generator loop.

use crate::gen::waveform::WaveformKind;
use crate::params::ParameterSet;
use std::f64::consts::PI;

/// Samples per waveform period
pub const STEPS: usize = 100;

/// One integer output value for the sink
pub type Sample = i32;

type ShapeFn = fn(usize, &ParameterSet) -> Sample;

// Indexed by `WaveformKind::index()`.
const SHAPES: [ShapeFn; 4] = [sine, square, sawtooth, triangular];

/// Compute the sample for `phase` using the shape selected in `params`
pub fn compute_sample(phase: usize, params: &ParameterSet) -> Sample {
    SHAPES[params.waveform.index()](phase % STEPS, params)
}

#[inline]
fn angle(phase: usize) -> f64 {
    2.0 * PI * phase as f64 / STEPS as f64
}

/// Round to nearest and saturate into the sample width
#[inline]
fn to_sample(value: f64) -> Sample {
    value.round() as Sample
}

fn sine(phase: usize, params: &ParameterSet) -> Sample {
    let raw = angle(phase).sin();
    to_sample((raw + params.mean) * params.amplitude as f64)
}

fn square(phase: usize, params: &ParameterSet) -> Sample {
    let raw = if phase < STEPS / 2 { -1.0 } else { 1.0 };
    to_sample((raw + params.mean) * params.amplitude as f64)
}

fn sawtooth(phase: usize, params: &ParameterSet) -> Sample {
    let raw = -1.0 + 2.0 * phase as f64 / (STEPS - 1) as f64;
    to_sample((raw + params.mean) * params.amplitude as f64)
}

fn triangular(phase: usize, params: &ParameterSet) -> Sample {
    // asin(sin(x)) folds the sine into a linear ramp in [-pi/2, pi/2]
    let raw = angle(phase).sin().asin();
    to_sample((raw + params.mean) * 2.0 * params.amplitude as f64 / PI)
}

/// Position within one waveform period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounter {
    index: usize,
}

impl PhaseCounter {
    pub fn new() -> Self {
        Self { index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Step to the next position, wrapping to 0 after `STEPS - 1`
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % STEPS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(kind: WaveformKind, mean: f64, amplitude: u32) -> ParameterSet {
        ParameterSet::new(1.0, mean, amplitude, kind)
    }

    #[test]
    fn test_square_halves() {
        let p = params(WaveformKind::Square, 1.0, 1000);
        for phase in 0..50 {
            assert_eq!(compute_sample(phase, &p), 0, "phase {phase}");
        }
        for phase in 50..100 {
            assert_eq!(compute_sample(phase, &p), 2000, "phase {phase}");
        }
    }

    #[test]
    fn test_sine_quarter_period_peak() {
        let p = params(WaveformKind::Sine, 0.0, 1);
        assert_eq!(compute_sample(25, &p), 1);
        assert_eq!(compute_sample(75, &p), -1);
        assert_eq!(compute_sample(0, &p), 0);
    }

    #[test]
    fn test_sawtooth_spans_full_ramp() {
        let p = params(WaveformKind::Sawtooth, 1.0, 1000);
        assert_eq!(compute_sample(0, &p), 0);
        assert_eq!(compute_sample(STEPS - 1, &p), 2000);
        let mut prev = compute_sample(0, &p);
        for phase in 1..STEPS {
            let s = compute_sample(phase, &p);
            assert!(s >= prev, "ramp not monotonic at {phase}");
            prev = s;
        }
    }

    #[test]
    fn test_triangular_peaks() {
        let p = params(WaveformKind::Triangular, 1.0, 1000);
        // asin(sin(pi/2)) = pi/2, so (pi/2 + 1) * 2000 / pi
        let expected_peak = ((PI / 2.0 + 1.0) * 2000.0 / PI).round() as Sample;
        assert_eq!(compute_sample(25, &p), expected_peak);
        let expected_trough = ((-PI / 2.0 + 1.0) * 2000.0 / PI).round() as Sample;
        assert_eq!(compute_sample(75, &p), expected_trough);
    }

    #[test]
    fn test_periodic_for_every_kind() {
        for kind in WaveformKind::ALL {
            let p = params(kind, 2.5, 3000);
            for phase in 0..STEPS {
                assert_eq!(
                    compute_sample(phase, &p),
                    compute_sample(phase + STEPS, &p),
                    "{kind} not periodic at {phase}"
                );
            }
        }
    }

    #[test]
    fn test_zero_amplitude_is_flat() {
        for kind in WaveformKind::ALL {
            let p = params(kind, 5.0, 0);
            assert!((0..STEPS).all(|phase| compute_sample(phase, &p) == 0));
        }
    }

    #[test]
    fn test_phase_counter_wraps() {
        let mut phase = PhaseCounter::new();
        for _ in 0..STEPS - 1 {
            phase.advance();
        }
        assert_eq!(phase.index(), STEPS - 1);
        phase.advance();
        assert_eq!(phase.index(), 0);
    }
}
