use std::fmt;
use std::str::FromStr;

/// Waveform shapes the generator can emit, in selector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveformKind {
    Sine,
    Square,
    Sawtooth,
    Triangular,
}

impl WaveformKind {
    pub const ALL: [WaveformKind; 4] = [
        WaveformKind::Sine,
        WaveformKind::Square,
        WaveformKind::Sawtooth,
        WaveformKind::Triangular,
    ];

    /// Position in the selector (and in the shape table)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            WaveformKind::Sine => "sine",
            WaveformKind::Square => "square",
            WaveformKind::Sawtooth => "sawtooth",
            WaveformKind::Triangular => "triangular",
        }
    }

    /// Move through the selector by `delta`, stopping at the first and last kind
    pub fn step(self, delta: i32) -> Self {
        let last = Self::ALL.len() as i64 - 1;
        let target = (self.index() as i64 + delta as i64).clamp(0, last);
        Self::ALL[target as usize]
    }
}

impl fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WaveformKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(WaveformKind::Sine),
            "square" | "sq" => Ok(WaveformKind::Square),
            "sawtooth" | "saw" => Ok(WaveformKind::Sawtooth),
            "triangular" | "triangle" | "tri" => Ok(WaveformKind::Triangular),
            other => Err(anyhow::anyhow!(
                "Undefined waveform '{}'. Options: sine, square, sawtooth, triangular",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("SINE".parse::<WaveformKind>().unwrap(), WaveformKind::Sine);
        assert_eq!(" Saw ".parse::<WaveformKind>().unwrap(), WaveformKind::Sawtooth);
        assert_eq!("Triangle".parse::<WaveformKind>().unwrap(), WaveformKind::Triangular);
        assert!("noise".parse::<WaveformKind>().is_err());
    }

    #[test]
    fn test_step_clamps_at_ends() {
        assert_eq!(WaveformKind::Sine.step(-1), WaveformKind::Sine);
        assert_eq!(WaveformKind::Sine.step(1), WaveformKind::Square);
        assert_eq!(WaveformKind::Triangular.step(1), WaveformKind::Triangular);
        assert_eq!(WaveformKind::Square.step(100), WaveformKind::Triangular);
    }

    #[test]
    fn test_index_roundtrip_matches_selector_order() {
        for (i, kind) in WaveformKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(WaveformKind::from_index(i), Some(*kind));
        }
        assert_eq!(WaveformKind::from_index(4), None);
    }
}
