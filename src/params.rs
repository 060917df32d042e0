//! Shared parameter store for the waveform generator
//!
//! The control thread edits parameters while the generator thread reads them
//! once per sample. Every edit and every read goes through a single mutex so a
//! reader always sees a complete, in-range `ParameterSet`.

use crate::gen::WaveformKind;
use std::sync::{Mutex, MutexGuard};

/// Number of keypresses needed to sweep a continuous parameter across its range
pub const STEP_DIVISIONS: u32 = 100;

/// The four live-tunable values of the generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    /// Waveform frequency in Hz
    pub frequency: f64,
    /// Pre-scale DC offset added to the normalized waveform
    pub mean: f64,
    /// Output scale factor
    pub amplitude: u32,
    pub waveform: WaveformKind,
}

impl ParameterSet {
    pub fn new(frequency: f64, mean: f64, amplitude: u32, waveform: WaveformKind) -> Self {
        Self {
            frequency,
            mean,
            amplitude,
            waveform,
        }
    }
}

/// Which parameter an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Frequency,
    Mean,
    Amplitude,
    Waveform,
}

/// A signed change to exactly one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDelta {
    Frequency(f64),
    Mean(f64),
    Amplitude(i64),
    Waveform(i32),
}

/// Closed domains for each field
///
/// Different DAC boards want different ceilings, so the limits are data rather
/// than constants baked into the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamLimits {
    pub frequency_min: f64,
    pub frequency_max: f64,
    pub mean_min: f64,
    pub mean_max: f64,
    pub amplitude_min: u32,
    pub amplitude_max: u32,
}

impl Default for ParamLimits {
    fn default() -> Self {
        Self::dac16()
    }
}

impl ParamLimits {
    /// 16-bit DAC profile: 0-10 Hz, amplitude up to 65535
    pub fn dac16() -> Self {
        Self {
            frequency_min: 0.0,
            frequency_max: 10.0,
            mean_min: 1.0,
            mean_max: 10.0,
            amplitude_min: 0,
            amplitude_max: 65535,
        }
    }

    /// 12-bit DAC profile: 0-100 Hz, amplitude up to 4095
    pub fn dac12() -> Self {
        Self {
            frequency_min: 0.0,
            frequency_max: 100.0,
            mean_min: 1.0,
            mean_max: 10.0,
            amplitude_min: 0,
            amplitude_max: 4095,
        }
    }

    pub fn frequency_step(&self) -> f64 {
        (self.frequency_max - self.frequency_min) / STEP_DIVISIONS as f64
    }

    pub fn mean_step(&self) -> f64 {
        (self.mean_max - self.mean_min) / STEP_DIVISIONS as f64
    }

    /// Integer step, never smaller than one count
    pub fn amplitude_step(&self) -> i64 {
        let span = (self.amplitude_max - self.amplitude_min) as i64;
        (span / STEP_DIVISIONS as i64).max(1)
    }

    /// One keypress worth of change for `field` in the given direction
    pub fn step(&self, field: Field, direction: i32) -> ParamDelta {
        let sign = direction.signum();
        match field {
            Field::Frequency => ParamDelta::Frequency(self.frequency_step() * sign as f64),
            Field::Mean => ParamDelta::Mean(self.mean_step() * sign as f64),
            Field::Amplitude => ParamDelta::Amplitude(self.amplitude_step() * sign as i64),
            Field::Waveform => ParamDelta::Waveform(sign),
        }
    }

    /// Frequency after moving by `delta`, snapped to the step grid and clamped
    pub fn nudge_frequency(&self, frequency: f64, delta: f64) -> f64 {
        let moved = snap_to_grid(frequency + delta, self.frequency_min, self.frequency_step());
        self.clamp_frequency(moved)
    }

    /// Mean after moving by `delta`, snapped to the step grid and clamped
    pub fn nudge_mean(&self, mean: f64, delta: f64) -> f64 {
        self.clamp_mean(snap_to_grid(mean + delta, self.mean_min, self.mean_step()))
    }

    pub fn clamp_frequency(&self, frequency: f64) -> f64 {
        clamp_f64(frequency, self.frequency_min, self.frequency_max)
    }

    pub fn clamp_mean(&self, mean: f64) -> f64 {
        clamp_f64(mean, self.mean_min, self.mean_max)
    }

    pub fn clamp_amplitude(&self, amplitude: i64) -> u32 {
        amplitude.clamp(self.amplitude_min as i64, self.amplitude_max as i64) as u32
    }

    /// Force every field of `params` into range
    pub fn clamp(&self, params: ParameterSet) -> ParameterSet {
        ParameterSet {
            frequency: self.clamp_frequency(params.frequency),
            mean: self.clamp_mean(params.mean),
            amplitude: self.clamp_amplitude(params.amplitude as i64),
            waveform: params.waveform,
        }
    }

    pub fn contains(&self, params: &ParameterSet) -> bool {
        (self.frequency_min..=self.frequency_max).contains(&params.frequency)
            && (self.mean_min..=self.mean_max).contains(&params.mean)
            && (self.amplitude_min..=self.amplitude_max).contains(&params.amplitude)
    }
}

/// Fraction of a step within which a value counts as sitting on a grid point
const GRID_TOLERANCE: f64 = 1e-6;

// Repeated float steps leave residue such as 1e-16 Hz instead of 0; pull values
// that are within rounding error of `min + k * step` back onto that point.
fn snap_to_grid(value: f64, min: f64, step: f64) -> f64 {
    if !value.is_finite() || !(step > 0.0) {
        return value;
    }
    let steps = (value - min) / step;
    let nearest = steps.round();
    if (steps - nearest).abs() < GRID_TOLERANCE {
        min + nearest * step
    } else {
        value
    }
}

// NaN saturates to the lower bound instead of poisoning the store.
fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

struct StoreState {
    params: ParameterSet,
    revision: u64,
    frozen: bool,
}

/// Owner of the live `ParameterSet`
///
/// Share it between threads with `Arc<ParamStore>`. The lock is only ever held
/// for in-memory copies and updates, never across device or terminal I/O.
pub struct ParamStore {
    limits: ParamLimits,
    state: Mutex<StoreState>,
}

impl ParamStore {
    /// Create a store from already-validated initial values
    ///
    /// Values are clamped once more so the store invariant holds from the start.
    pub fn new(initial: ParameterSet, limits: ParamLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(StoreState {
                params: limits.clamp(initial),
                revision: 0,
                frozen: false,
            }),
        }
    }

    pub fn limits(&self) -> &ParamLimits {
        &self.limits
    }

    // The guarded data is plain values that are valid after every mutation, so
    // a panic in another holder cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply one delta, clamp the touched field and return the resulting set
    ///
    /// Once the store is frozen this is a no-op that returns the current set.
    pub fn apply_delta(&self, delta: ParamDelta) -> ParameterSet {
        let mut state = self.lock();
        if state.frozen {
            return state.params;
        }

        let params = &mut state.params;
        match delta {
            ParamDelta::Frequency(d) => {
                params.frequency = self.limits.nudge_frequency(params.frequency, d);
            }
            ParamDelta::Mean(d) => {
                params.mean = self.limits.nudge_mean(params.mean, d);
            }
            ParamDelta::Amplitude(d) => {
                params.amplitude = self.limits.clamp_amplitude(params.amplitude as i64 + d);
            }
            ParamDelta::Waveform(d) => {
                params.waveform = params.waveform.step(d);
            }
        }

        let snapshot = *params;
        state.revision += 1;
        snapshot
    }

    /// Copy the whole parameter set under the lock
    pub fn read_snapshot(&self) -> ParameterSet {
        self.lock().params
    }

    /// Snapshot together with the number of applied deltas
    pub fn read_versioned(&self) -> (u64, ParameterSet) {
        let state = self.lock();
        (state.revision, state.params)
    }

    /// Make the store read-only; later deltas are ignored
    pub fn freeze(&self) {
        self.lock().frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.lock().frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ParamStore {
        ParamStore::new(
            ParameterSet::new(1.0, 1.0, 100, WaveformKind::Sine),
            ParamLimits::dac12(),
        )
    }

    #[test]
    fn test_step_sizes() {
        let limits = ParamLimits::dac12();
        assert!((limits.frequency_step() - 1.0).abs() < 1e-12);
        assert!((limits.mean_step() - 0.09).abs() < 1e-12);
        // Integer division, as the 12-bit board counts in whole DAC codes
        assert_eq!(limits.amplitude_step(), 40);
        assert_eq!(ParamLimits::dac16().amplitude_step(), 655);
    }

    #[test]
    fn test_amplitude_step_never_zero() {
        let limits = ParamLimits {
            amplitude_max: 10,
            ..ParamLimits::dac12()
        };
        assert_eq!(limits.amplitude_step(), 1);
    }

    #[test]
    fn test_clamps_at_upper_bound() {
        let store = store();
        for _ in 0..500 {
            store.apply_delta(ParamDelta::Frequency(1.0));
            store.apply_delta(ParamDelta::Amplitude(40));
            store.apply_delta(ParamDelta::Mean(0.09));
        }
        let p = store.read_snapshot();
        assert_eq!(p.frequency, 100.0);
        assert_eq!(p.amplitude, 4095);
        assert_eq!(p.mean, 10.0);
    }

    #[test]
    fn test_clamps_at_lower_bound() {
        let store = store();
        let p = store.apply_delta(ParamDelta::Amplitude(-1_000_000));
        assert_eq!(p.amplitude, 0);
        let p = store.apply_delta(ParamDelta::Mean(-100.0));
        assert_eq!(p.mean, 1.0);
        let p = store.apply_delta(ParamDelta::Frequency(-5.0));
        assert_eq!(p.frequency, 0.0);
    }

    #[test]
    fn test_waveform_selector_clamps() {
        let store = store();
        let p = store.apply_delta(ParamDelta::Waveform(-1));
        assert_eq!(p.waveform, WaveformKind::Sine);
        for _ in 0..10 {
            store.apply_delta(ParamDelta::Waveform(1));
        }
        assert_eq!(store.read_snapshot().waveform, WaveformKind::Triangular);
    }

    #[test]
    fn test_stepping_down_lands_exactly_on_minimum() {
        let store = ParamStore::new(
            ParameterSet::new(1.0, 1.0, 100, WaveformKind::Sine),
            ParamLimits::dac16(),
        );
        let step = store.limits().frequency_step();
        for _ in 0..10 {
            store.apply_delta(ParamDelta::Frequency(-step));
        }
        assert_eq!(store.read_snapshot().frequency, 0.0);

        for _ in 0..7 {
            store.apply_delta(ParamDelta::Frequency(step));
        }
        for _ in 0..7 {
            store.apply_delta(ParamDelta::Frequency(-step));
        }
        assert_eq!(store.read_snapshot().frequency, 0.0);
    }

    #[test]
    fn test_mean_round_trip_returns_to_start() {
        let store = store();
        let step = store.limits().mean_step();
        for _ in 0..33 {
            store.apply_delta(ParamDelta::Mean(step));
        }
        for _ in 0..33 {
            store.apply_delta(ParamDelta::Mean(-step));
        }
        assert_eq!(store.read_snapshot().mean, 1.0);
    }

    #[test]
    fn test_off_grid_delta_is_kept() {
        let store = store();
        let p = store.apply_delta(ParamDelta::Frequency(0.37));
        assert!((p.frequency - 1.37).abs() < 1e-12);
    }

    #[test]
    fn test_nan_delta_saturates_low() {
        let store = store();
        let p = store.apply_delta(ParamDelta::Frequency(f64::NAN));
        assert_eq!(p.frequency, 0.0);
    }

    #[test]
    fn test_initial_values_are_clamped() {
        let store = ParamStore::new(
            ParameterSet::new(500.0, 0.0, 9000, WaveformKind::Square),
            ParamLimits::dac12(),
        );
        let p = store.read_snapshot();
        assert!(store.limits().contains(&p));
        assert_eq!(p.amplitude, 4095);
    }

    #[test]
    fn test_frozen_store_ignores_deltas() {
        let store = store();
        store.apply_delta(ParamDelta::Amplitude(40));
        store.freeze();
        assert!(store.is_frozen());

        let before = store.read_versioned();
        let p = store.apply_delta(ParamDelta::Amplitude(40));
        assert_eq!(p.amplitude, 140);
        assert_eq!(store.read_versioned(), before);
    }

    #[test]
    fn test_revision_counts_applied_deltas() {
        let store = store();
        store.apply_delta(ParamDelta::Mean(0.5));
        store.apply_delta(ParamDelta::Mean(0.5));
        assert_eq!(store.read_versioned().0, 2);
    }
}
