// Generation configuration.
//
// Every tunable number in the pipeline lives in `GenerationConfig`: tick
// resolution, chord and melody lengths, the chord-extension probability,
// velocity ranges and per-voice pitch windows. It is plain serde data,
// loadable from JSON with any field omitted (omitted fields take their
// defaults), and `validate` rejects values the algorithms cannot honor.
//
// Melody and chord voices have separate pitch windows: chords are voiced
// across 24..=84, melody notes are kept in 48..=84 so the tune sits above
// the harmony's bass.

use crate::error::{GenerationError, Result};
use crate::pitch::{MIN_WINDOW_SPAN, PitchWindow};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive MIDI velocity range sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityRange {
    pub min: u8,
    pub max: u8,
}

impl VelocityRange {
    pub const fn new(min: u8, max: u8) -> Self {
        VelocityRange { min, max }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> u8 {
        rng.random_range(self.min..=self.max)
    }

    pub fn contains(&self, velocity: u8) -> bool {
        (self.min..=self.max).contains(&velocity)
    }

    fn is_valid(&self) -> bool {
        self.min <= self.max && self.max <= 127
    }
}

/// Chord progression parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordParams {
    /// Number of chords in a piece.
    pub length: usize,
    /// Chance that any one chord is extended to a seventh chord.
    pub seventh_probability: f64,
    /// "Chord dynamics" velocity assigned by the generator.
    pub velocity: VelocityRange,
    /// MIDI offset added to the root's pitch class before clamping (60 puts
    /// the root in the octave above middle C).
    pub root_register: u8,
    /// Double the root two and three octaves below the register.
    pub bass_doubling: bool,
}

impl Default for ChordParams {
    fn default() -> Self {
        ChordParams {
            length: 4,
            seventh_probability: 0.35,
            velocity: VelocityRange::new(63, 95),
            root_register: 60,
            bass_doubling: false,
        }
    }
}

/// Melody generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MelodyParams {
    /// Number of notes generated.
    pub length: usize,
    /// Context window length W fed to the sequence model.
    pub window_len: usize,
    /// Number of corpus events sampled as seed material.
    pub seed_count: usize,
}

impl Default for MelodyParams {
    fn default() -> Self {
        MelodyParams {
            length: 8,
            window_len: 16,
            seed_count: 3,
        }
    }
}

/// Playback-time humanization and per-voice ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceParams {
    /// Velocity range re-drawn for every chord note at playback.
    pub chord_velocity: VelocityRange,
    /// Velocity range re-drawn for every melody note at playback.
    pub melody_velocity: VelocityRange,
    pub chord_window: PitchWindow,
    pub melody_window: PitchWindow,
}

impl Default for PerformanceParams {
    fn default() -> Self {
        PerformanceParams {
            chord_velocity: VelocityRange::new(63, 80),
            melody_velocity: VelocityRange::new(53, 70),
            chord_window: PitchWindow { low: 24, high: 84 },
            melody_window: PitchWindow { low: 48, high: 84 },
        }
    }
}

/// Top-level configuration for one generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// MIDI ticks per quarter-note beat, shared with the MIDI writer.
    pub ticks_per_beat: u16,
    pub tempo_bpm: u16,
    pub chords: ChordParams,
    pub melody: MelodyParams,
    pub performance: PerformanceParams,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            ticks_per_beat: 384,
            tempo_bpm: 120,
            chords: ChordParams::default(),
            melody: MelodyParams::default(),
            performance: PerformanceParams::default(),
        }
    }
}

impl GenerationConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: GenerationConfig = serde_json::from_str(&data).map_err(|e| {
            GenerationError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is one the pipeline can use.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GenerationError::InvalidConfig(msg));

        if self.ticks_per_beat == 0 || self.ticks_per_beat > 0x7FFF {
            return invalid(format!("ticks_per_beat {} not in 1..=32767", self.ticks_per_beat));
        }
        if self.tempo_bpm == 0 {
            return invalid("tempo_bpm must be positive".to_string());
        }
        if self.chords.length == 0 {
            return invalid("chords.length must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.chords.seventh_probability) {
            return invalid(format!(
                "chords.seventh_probability {} not in [0, 1]",
                self.chords.seventh_probability
            ));
        }
        if self.chords.root_register > 127 {
            return invalid("chords.root_register above 127".to_string());
        }
        if self.melody.window_len == 0 {
            return invalid("melody.window_len must be at least 1".to_string());
        }
        if self.melody.seed_count == 0 {
            return invalid("melody.seed_count must be at least 1".to_string());
        }
        for (name, range) in [
            ("chords.velocity", self.chords.velocity),
            ("performance.chord_velocity", self.performance.chord_velocity),
            ("performance.melody_velocity", self.performance.melody_velocity),
        ] {
            if !range.is_valid() {
                return invalid(format!("{name} {}..={} is not a MIDI velocity range", range.min, range.max));
            }
        }
        // A note-on with velocity 0 is read as a note-off by receivers.
        for (name, range) in [
            ("performance.chord_velocity", self.performance.chord_velocity),
            ("performance.melody_velocity", self.performance.melody_velocity),
        ] {
            if range.min == 0 {
                return invalid(format!("{name} must start at 1 or above to be audible"));
            }
        }
        for (name, window) in [
            ("performance.chord_window", self.performance.chord_window),
            ("performance.melody_window", self.performance.melody_window),
        ] {
            if !window.is_valid() {
                return invalid(format!(
                    "{name} {}..={} must lie within 0..=127 and span at least {MIN_WINDOW_SPAN} semitones",
                    window.low, window.high
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GenerationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.ticks_per_beat, 384);
        assert_eq!(config.melody.window_len, 16);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"melody": {"length": 12}, "tempo_bpm": 90}"#).unwrap();
        assert_eq!(config.melody.length, 12);
        assert_eq!(config.melody.window_len, 16);
        assert_eq!(config.tempo_bpm, 90);
        assert_eq!(config.chords.length, 4);
    }

    #[test]
    fn test_validate_rejects_narrow_window() {
        let mut config = GenerationConfig::default();
        config.performance.melody_window = PitchWindow { low: 60, high: 66 };
        assert!(matches!(
            config.validate(),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_velocity_and_probability() {
        let mut config = GenerationConfig::default();
        config.performance.chord_velocity = VelocityRange::new(90, 60);
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.chords.seventh_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_performance_velocity() {
        let mut config = GenerationConfig::default();
        config.performance.melody_velocity = VelocityRange::new(0, 0);
        assert!(matches!(
            config.validate(),
            Err(GenerationError::InvalidConfig(msg)) if msg.contains("melody_velocity")
        ));

        let mut config = GenerationConfig::default();
        config.performance.chord_velocity = VelocityRange::new(0, 80);
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.performance.chord_velocity = VelocityRange::new(1, 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"ticks_per_beat": 480, "chords": {"bass_doubling": true}}"#)
            .unwrap();
        let config = GenerationConfig::load(&path).unwrap();
        assert_eq!(config.ticks_per_beat, 480);
        assert!(config.chords.bass_doubling);

        std::fs::write(&path, r#"{"ticks_per_beat": 0}"#).unwrap();
        assert!(GenerationConfig::load(&path).is_err());
    }
}
