//! Live-tunable waveform generator for an analog output device
//!
//! A control thread edits frequency, mean, amplitude and waveform from the
//! keyboard while a generator thread emits paced samples to a sink. The two
//! share one `ParamStore` and stop together through `Shutdown`.

pub mod config;
pub mod control;
pub mod engine;
pub mod gen;
pub mod params;
pub mod utils;

// Sample sinks (audio device, WAV capture, in-memory)
pub mod platform;

// Crossterm keyboard input and status display
#[cfg(feature = "crossterm")]
pub mod terminal;

pub use control::{DisplayRenderer, InputSource, KeyEvent};
pub use engine::{Generator, Pacing, Session, SessionHandle, Shutdown};
pub use gen::{compute_sample, Sample, WaveformKind, STEPS};
pub use params::{Field, ParamDelta, ParamLimits, ParamStore, ParameterSet};
pub use platform::SampleSink;
