//! Initial configuration provider
//!
//! Values given on the command line are range-checked and rejected (not
//! clamped) when out of range. Missing values are asked for interactively,
//! re-prompting until the answer parses and is in range.

use std::io::{BufRead, Write};

use anyhow::Context;

use crate::gen::WaveformKind;
use crate::params::{ParamLimits, ParameterSet};

/// Longest answer accepted at a prompt
pub const MAX_INPUT: usize = 20;

/// Startup values; `None` means "ask the user"
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InitialConfig {
    pub frequency: Option<f64>,
    pub mean: Option<f64>,
    pub amplitude: Option<u32>,
    pub waveform: Option<WaveformKind>,
}

impl InitialConfig {
    /// Check every provided value against `limits`
    pub fn validate(&self, limits: &ParamLimits) -> Result<(), anyhow::Error> {
        if let Some(frequency) = self.frequency {
            check_range("Frequency", frequency, limits.frequency_min, limits.frequency_max)?;
        }
        if let Some(mean) = self.mean {
            check_range("Mean", mean, limits.mean_min, limits.mean_max)?;
        }
        if let Some(amplitude) = self.amplitude {
            check_range("Amplitude", amplitude, limits.amplitude_min, limits.amplitude_max)?;
        }
        Ok(())
    }

    /// Validate provided values and prompt for the missing ones
    pub fn resolve<R: BufRead, W: Write>(
        &self,
        limits: &ParamLimits,
        input: &mut R,
        output: &mut W,
    ) -> Result<ParameterSet, anyhow::Error> {
        self.validate(limits)?;

        let frequency = match self.frequency {
            Some(f) => f,
            None => prompt_float(
                input,
                output,
                "Input Frequency: ",
                limits.frequency_min,
                limits.frequency_max,
            )?,
        };
        let mean = match self.mean {
            Some(m) => m,
            None => prompt_float(input, output, "Input Mean: ", limits.mean_min, limits.mean_max)?,
        };
        let amplitude = match self.amplitude {
            Some(a) => a,
            None => prompt_int(
                input,
                output,
                "Input Amplitude: ",
                limits.amplitude_min,
                limits.amplitude_max,
            )?,
        };
        let waveform = match self.waveform {
            Some(w) => w,
            None => prompt_waveform(input, output)?,
        };

        Ok(ParameterSet::new(frequency, mean, amplitude, waveform))
    }
}

fn check_range<T>(name: &str, value: T, min: T, max: T) -> Result<(), anyhow::Error>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min {
        return Err(anyhow::anyhow!("{} {} is less than minimum {}", name, value, min));
    }
    if value > max {
        return Err(anyhow::anyhow!("{} {} is greater than maximum {}", name, value, max));
    }
    // Catches NaN, which compares false both ways
    if !(value >= min && value <= max) {
        return Err(anyhow::anyhow!("{} {} is not a number in [{}, {}]", name, value, min, max));
    }
    Ok(())
}

/// Read one trimmed answer; `None` if it was too long
fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>, anyhow::Error> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read from stdin")?;
    if read == 0 {
        return Err(anyhow::anyhow!("Input closed before a value was entered"));
    }
    let answer = line.trim();
    if answer.len() > MAX_INPUT {
        return Ok(None);
    }
    Ok(Some(answer.to_string()))
}

fn prompt_parsed<R, W, T>(
    input: &mut R,
    output: &mut W,
    msg: &str,
    min: T,
    max: T,
    kind: &str,
) -> Result<T, anyhow::Error>
where
    R: BufRead,
    W: Write,
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    loop {
        write!(output, "{}", msg)?;
        output.flush()?;

        let Some(answer) = read_answer(input)? else {
            writeln!(output, "Exceed maximum input size\n")?;
            continue;
        };
        let Ok(value) = answer.parse::<T>() else {
            writeln!(output, "Invalid format. {} is not {}\n", answer, kind)?;
            continue;
        };
        match check_range("Value", value, min, max) {
            Ok(()) => return Ok(value),
            Err(err) => writeln!(output, "{}\n", err)?,
        }
    }
}

/// Ask for a real number in `[min, max]` until one is given
pub fn prompt_float<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    msg: &str,
    min: f64,
    max: f64,
) -> Result<f64, anyhow::Error> {
    prompt_parsed(input, output, msg, min, max, "float")
}

/// Ask for an unsigned integer in `[min, max]` until one is given
pub fn prompt_int<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    msg: &str,
    min: u32,
    max: u32,
) -> Result<u32, anyhow::Error> {
    prompt_parsed(input, output, msg, min, max, "integer")
}

/// Show the numbered waveform menu and ask for a choice
pub fn prompt_waveform<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<WaveformKind, anyhow::Error> {
    writeln!(output, "Select Waveform:")?;
    for kind in WaveformKind::ALL {
        writeln!(output, "{}) {}", kind.index(), kind)?;
    }
    let last = WaveformKind::ALL.len() as u32 - 1;
    let choice = prompt_int(input, output, "Input: ", 0, last)?;
    WaveformKind::from_index(choice as usize).context("Waveform choice out of range")
}
