//! Crossterm-backed keyboard input and status display

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use log::warn;

use crate::control::{DisplayRenderer, InputSource, KeyEvent};
use crate::params::{ParamLimits, ParameterSet};

/// Puts the terminal in raw mode for as long as it lives
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> Result<Self, anyhow::Error> {
        execute!(io::stdout(), Clear(ClearType::All), cursor::Hide)?;
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            warn!("Failed to restore terminal: {}", err);
        }
        let _ = execute!(io::stdout(), cursor::Show);
        print!("\r\n");
        let _ = io::stdout().flush();
    }
}

/// Reads key presses from the terminal
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    pub fn new() -> Self {
        Self
    }
}

/// Translate a crossterm key into the control layer's key
pub fn translate_key(key: event::KeyEvent) -> Option<KeyEvent> {
    // Windows reports releases and repeats as separate events
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let translated = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyEvent::Interrupt,
        KeyCode::Up => KeyEvent::Up,
        KeyCode::Down => KeyEvent::Down,
        KeyCode::Left => KeyEvent::Left,
        KeyCode::Right => KeyEvent::Right,
        KeyCode::Esc => KeyEvent::Esc,
        KeyCode::Char(c) => KeyEvent::Char(c),
        _ => KeyEvent::Other,
    };
    Some(translated)
}

impl InputSource for TerminalInput {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, anyhow::Error> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(translate_key(key)),
            _ => Ok(None),
        }
    }
}

/// Redraws the key help and current parameters
pub struct TerminalDisplay {
    limits: ParamLimits,
}

impl TerminalDisplay {
    pub fn new(limits: ParamLimits) -> Self {
        Self { limits }
    }
}

impl DisplayRenderer for TerminalDisplay {
    fn render(&mut self, params: &ParameterSet) -> Result<(), anyhow::Error> {
        let mut out = io::stdout().lock();
        // Raw mode: every line needs an explicit carriage return
        write!(out, "\x1b[2J\x1b[H")?;
        write!(out, "=== Waveform Generator ===\r\n")?;
        write!(out, "Press E to Exit\r\n\r\n")?;
        write!(out, "Up/Down: Change Amplitude\r\n")?;
        write!(out, "Left/Right: Change Frequency\r\n")?;
        write!(out, "W/S: Change Mean\r\n")?;
        write!(out, "A/D: Change Waveform\r\n\r\n")?;
        write!(
            out,
            "Frequency: {:>8.3} Hz  [{} - {}]\r\n",
            params.frequency, self.limits.frequency_min, self.limits.frequency_max
        )?;
        write!(
            out,
            "Mean:      {:>8.3}     [{} - {}]\r\n",
            params.mean, self.limits.mean_min, self.limits.mean_max
        )?;
        write!(
            out,
            "Amplitude: {:>8}     [{} - {}]\r\n",
            params.amplitude, self.limits.amplitude_min, self.limits.amplitude_max
        )?;
        write!(out, "Waveform:  {}\r\n", params.waveform)?;
        out.flush()?;
        Ok(())
    }
}
