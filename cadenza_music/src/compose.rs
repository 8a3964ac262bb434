// Top-level composition: scale request in, MIDI piece out.
//
// A `Composer` owns a validated `GenerationConfig` and a `SessionRegistry`
// (one lazily loaded inference session per mode). Composing runs the stages
// in order:
//
// 1. resolve the requested scale (fails fast, before any artifact is read);
// 2. fetch the session for the scale's mode;
// 3. build the chord progression;
// 4. generate the melody;
// 5. assemble both voices into a single timeline.
//
// `generate_music` adds encoding and the file write. Encoding happens fully
// in memory, so any failure in any stage leaves no file at the output path.

use crate::chords::{Chord, generate_chords};
use crate::config::GenerationConfig;
use crate::error::Result;
use crate::melody::{Melody, MelodyGenerator};
use crate::midi::write_midi;
use crate::scale::{lookup, scale_id_for};
use crate::timeline::{Timeline, assemble_timeline};
use cadenza_model::{Mode, SessionRegistry};
use rand::Rng;
use std::path::{Path, PathBuf};

/// A tonic plus a mode, e.g. "D" + minor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleRequest {
    pub tonic: String,
    pub mode: Mode,
}

impl ScaleRequest {
    /// Build from a tonic and a mode name; unrecognized mode names mean minor.
    pub fn new(tonic: impl Into<String>, mode: &str) -> Self {
        ScaleRequest {
            tonic: tonic.into().trim().to_string(),
            mode: Mode::parse_lenient(mode),
        }
    }

    /// Parse "d minor", "DMINOR", "F# major" or a bare tonic ("d", minor).
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some((tonic, mode)) = text.split_once(char::is_whitespace) {
            return ScaleRequest::new(tonic, mode.trim());
        }
        let upper = text.to_ascii_uppercase();
        for mode in Mode::ALL {
            match upper.strip_suffix(mode.suffix()) {
                Some(tonic) if !tonic.is_empty() => {
                    return ScaleRequest {
                        tonic: text[..tonic.len()].to_string(),
                        mode,
                    };
                }
                _ => {}
            }
        }
        ScaleRequest::new(text, "")
    }

    /// Canonical scale id ("DMINOR", "C#MAJOR").
    pub fn scale_id(&self) -> String {
        scale_id_for(&self.tonic, self.mode)
    }
}

/// A composed piece, before encoding.
#[derive(Debug, Clone)]
pub struct Piece {
    pub scale_id: &'static str,
    pub chords: Vec<Chord>,
    pub melody: Melody,
    pub timeline: Timeline,
}

/// What `generate_music` wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceSummary {
    pub scale_id: &'static str,
    pub path: PathBuf,
    pub chords: usize,
    pub melody_notes: usize,
    pub events: usize,
    pub ticks: u64,
    pub bytes: usize,
}

#[derive(Debug)]
pub struct Composer {
    config: GenerationConfig,
    sessions: SessionRegistry,
}

impl Composer {
    /// A composer loading artifacts from `artifacts` on demand.
    pub fn new(config: GenerationConfig, artifacts: impl Into<PathBuf>) -> Result<Self> {
        Composer::with_sessions(config, SessionRegistry::new(artifacts))
    }

    /// A composer over an existing registry (pre-populated sessions).
    pub fn with_sessions(config: GenerationConfig, sessions: SessionRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Composer { config, sessions })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Compose a piece in memory.
    pub fn compose(&self, request: &ScaleRequest, rng: &mut impl Rng) -> Result<Piece> {
        let scale = lookup(&request.scale_id())?;
        let session = self.sessions.get(scale.mode)?;

        let chords = generate_chords(scale.id, self.config.chords.length, &self.config, rng)?;
        let melody = MelodyGenerator::new(session, &self.config.melody).generate(
            scale.id,
            self.config.melody.length,
            rng,
        )?;
        let timeline = assemble_timeline(&chords, &melody, &self.config.performance, rng);

        tracing::info!(
            scale = scale.id,
            chords = chords.len(),
            melody_notes = melody.len(),
            events = timeline.len(),
            "composed piece"
        );
        Ok(Piece {
            scale_id: scale.id,
            chords,
            melody,
            timeline,
        })
    }

    /// Compose a piece and write it as a MIDI file at `output`.
    pub fn generate_music(
        &self,
        request: &ScaleRequest,
        output: &Path,
        rng: &mut impl Rng,
    ) -> Result<PieceSummary> {
        let piece = self.compose(request, rng)?;
        let bytes = write_midi(
            &piece.timeline.to_delta_events(),
            self.config.ticks_per_beat,
            self.config.tempo_bpm,
            output,
        )?;
        Ok(PieceSummary {
            scale_id: piece.scale_id,
            path: output.to_path_buf(),
            chords: piece.chords.len(),
            melody_notes: piece.melody.len(),
            events: piece.timeline.len(),
            ticks: piece.timeline.end_time(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use rand::SeedableRng;

    #[test]
    fn test_request_new_defaults_to_minor() {
        assert_eq!(ScaleRequest::new("D", "minor").scale_id(), "DMINOR");
        assert_eq!(ScaleRequest::new("g", "Major").scale_id(), "GMAJOR");
        assert_eq!(ScaleRequest::new("E", "dorian").mode, Mode::Minor);
        assert_eq!(ScaleRequest::new("Bb", "major").scale_id(), "A#MAJOR");
    }

    #[test]
    fn test_request_parse_forms() {
        assert_eq!(ScaleRequest::parse("d minor").scale_id(), "DMINOR");
        assert_eq!(ScaleRequest::parse("DMINOR").scale_id(), "DMINOR");
        assert_eq!(ScaleRequest::parse("f#major").scale_id(), "F#MAJOR");
        assert_eq!(ScaleRequest::parse(" c ").scale_id(), "CMINOR");
        assert_eq!(ScaleRequest::parse("A   major").scale_id(), "AMAJOR");
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut config = GenerationConfig::default();
        config.ticks_per_beat = 0;
        assert!(matches!(
            Composer::new(config, "unused"),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_scale_fails_before_loading_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let composer = Composer::new(GenerationConfig::default(), dir.path()).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let err = composer
            .compose(&ScaleRequest::new("H", "minor"), &mut rng)
            .unwrap_err();
        assert!(matches!(err, GenerationError::UnknownScale(_)), "{err}");
    }

    #[test]
    fn test_missing_artifacts_surface_as_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let composer = Composer::new(GenerationConfig::default(), dir.path()).unwrap();
        let output = dir.path().join("out.mid");
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let err = composer
            .generate_music(&ScaleRequest::new("D", "minor"), &output, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GenerationError::ArtifactLoad(_)), "{err}");
        assert!(!output.exists());
    }
}
