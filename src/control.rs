//! Keyboard control translator
//!
//! Turns discrete key events into parameter deltas. Layout:
//! - Up/Down: amplitude
//! - Right/Left: frequency
//! - W/S: mean
//! - A/D: previous/next waveform
//! - E (or Ctrl+C): exit

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, error, info};

use crate::engine::Shutdown;
use crate::params::{Field, ParamStore, ParameterSet};

/// How long one input poll may block before the shutdown flag is re-checked
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Terminal-independent key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Up,
    Down,
    Left,
    Right,
    Char(char),
    Esc,
    /// Ctrl+C in raw mode
    Interrupt,
    Other,
}

/// What a recognized key asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Move `field` one step in the direction of the sign
    Adjust(Field, i32),
    Exit,
}

/// Static key map; `None` for keys that do nothing
pub fn binding(key: KeyEvent) -> Option<ControlAction> {
    use ControlAction::*;
    match key {
        KeyEvent::Up => Some(Adjust(Field::Amplitude, 1)),
        KeyEvent::Down => Some(Adjust(Field::Amplitude, -1)),
        KeyEvent::Right => Some(Adjust(Field::Frequency, 1)),
        KeyEvent::Left => Some(Adjust(Field::Frequency, -1)),
        KeyEvent::Char('w') | KeyEvent::Char('W') => Some(Adjust(Field::Mean, 1)),
        KeyEvent::Char('s') | KeyEvent::Char('S') => Some(Adjust(Field::Mean, -1)),
        KeyEvent::Char('a') | KeyEvent::Char('A') => Some(Adjust(Field::Waveform, -1)),
        KeyEvent::Char('d') | KeyEvent::Char('D') => Some(Adjust(Field::Waveform, 1)),
        KeyEvent::Char('E') | KeyEvent::Interrupt => Some(Exit),
        _ => None,
    }
}

/// Source of key events for the control thread
pub trait InputSource: Send {
    /// Wait up to `timeout` for the next event
    ///
    /// `Ok(None)` means nothing arrived in time. Errors are fatal to the
    /// control thread.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, anyhow::Error>;
}

/// Status view refreshed after every accepted edit
pub trait DisplayRenderer: Send {
    fn render(&mut self, params: &ParameterSet) -> Result<(), anyhow::Error>;
}

/// Renderer that shows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplayRenderer for NullDisplay {
    fn render(&mut self, _params: &ParameterSet) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Replays a fixed list of keys, then reports no input until shutdown
///
/// Useful for demos and for driving a session without a terminal.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    keys: VecDeque<KeyEvent>,
}

impl ScriptedInput {
    pub fn new(keys: impl IntoIterator<Item = KeyEvent>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, anyhow::Error> {
        match self.keys.pop_front() {
            Some(key) => Ok(Some(key)),
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

/// Apply one key to the store
///
/// Returns the action taken, or `None` if the key is unbound. Exit is reported
/// but not acted on here.
pub fn handle_key<D: DisplayRenderer>(
    store: &ParamStore,
    display: &mut D,
    key: KeyEvent,
) -> Option<ControlAction> {
    let action = binding(key)?;
    if let ControlAction::Adjust(field, direction) = action {
        let delta = store.limits().step(field, direction);
        let params = store.apply_delta(delta);
        debug!("{:?} -> {:?}", key, delta);
        // Display problems never stop the control loop
        if let Err(err) = display.render(&params) {
            debug!("Display refresh failed: {:#}", err);
        }
    }
    Some(action)
}

/// Control thread body
///
/// Runs until the exit key, a shutdown from elsewhere, or an input failure
/// (which also signals shutdown).
pub fn run_control<I, D>(
    store: &ParamStore,
    mut input: I,
    mut display: D,
    shutdown: &Shutdown,
) -> Result<(), anyhow::Error>
where
    I: InputSource,
    D: DisplayRenderer,
{
    if let Err(err) = display.render(&store.read_snapshot()) {
        debug!("Display refresh failed: {:#}", err);
    }

    while !shutdown.is_signaled() {
        let key = match input.next_event(INPUT_POLL_INTERVAL) {
            Ok(Some(key)) => key,
            Ok(None) => continue,
            Err(err) => {
                error!("Input source failed: {:#}", err);
                shutdown.signal();
                return Err(err);
            }
        };

        // A key that arrives after shutdown is dropped
        if shutdown.is_signaled() {
            break;
        }

        if let Some(ControlAction::Exit) = handle_key(store, &mut display, key) {
            info!("Exit requested");
            shutdown.signal();
            break;
        }
    }

    Ok(())
}
