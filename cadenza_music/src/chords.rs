// Chord progression generation.
//
// A progression is planned from two small catalogs: a progression template
// (cyclic scale degrees for the chord roots) and a duration pattern (cyclic
// beat counts). Both are picked uniformly at random and independently, then
// expanded cyclically to the requested number of chords.
//
// Each chord is then built directly from scale degrees: root, third and fifth
// at +0/+2/+4 diatonic steps, plus a seventh at +6 when the per-chord coin
// flip says so. The root sits at a fixed register (`root_register` plus its
// pitch class) and the upper voices stack at the nearest position above it.
// Every voice is clamped into the chord window on its own. Because the
// pitches come straight from scale degrees, chords never need to be checked
// against the scale afterwards.
//
// Randomness comes only from the `rng` argument, so a seeded generator gives
// reproducible progressions.

use crate::config::GenerationConfig;
use crate::error::{GenerationError, Result};
use crate::pitch::clamp_to_range;
use crate::scale::{Scale, lookup};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Progression templates, as scale degrees 0-6 (0 = tonic).
pub static PROGRESSIONS: [[usize; 4]; 10] = [
    [0, 3, 4, 0],
    [0, 4, 5, 3],
    [0, 6, 5, 6],
    [0, 5, 2, 6],
    [0, 2, 3, 4],
    [0, 5, 3, 2],
    [0, 2, 6, 3],
    [0, 4, 3, 5],
    [0, 5, 4, 3],
    [0, 6, 0, 4],
];

/// Duration patterns in beats.
pub static DURATION_PATTERNS: [[u32; 4]; 3] = [[4, 4, 4, 4], [2, 6, 2, 6], [6, 2, 6, 2]];

/// Diatonic steps above the root for third, fifth and seventh.
const THIRD: usize = 2;
const FIFTH: usize = 4;
const SEVENTH: usize = 6;

/// One chord: absolute MIDI pitches, length in ticks and assigned velocity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    /// Scale degree of the root (0-6).
    pub degree: usize,
    /// Root first, then third, fifth and (for seventh chords) seventh. With
    /// bass doubling the two low roots come first.
    pub pitches: Vec<u8>,
    pub duration: u32,
    pub velocity: u8,
    pub seventh: bool,
}

/// Degrees and beat counts for every chord of a progression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionPlan {
    pub degrees: Vec<usize>,
    pub beats: Vec<u32>,
}

impl ProgressionPlan {
    /// Expand a progression template and a duration pattern cyclically to
    /// `length` chords.
    pub fn from_templates(progression: &[usize], pattern: &[u32], length: usize) -> Result<Self> {
        if length == 0 {
            return Err(GenerationError::InvalidLength {
                what: "chord progression",
                length,
            });
        }
        if progression.is_empty() || pattern.is_empty() {
            return Err(GenerationError::InvalidConfig(
                "progression template and duration pattern must be non-empty".to_string(),
            ));
        }
        Ok(ProgressionPlan {
            degrees: progression.iter().copied().cycle().take(length).collect(),
            beats: pattern.iter().copied().cycle().take(length).collect(),
        })
    }

    /// Pick a template and a pattern uniformly at random.
    pub fn choose(length: usize, rng: &mut impl Rng) -> Result<Self> {
        let progression = PROGRESSIONS.choose(rng).unwrap_or(&PROGRESSIONS[0]);
        let pattern = DURATION_PATTERNS.choose(rng).unwrap_or(&DURATION_PATTERNS[0]);
        tracing::debug!(?progression, ?pattern, length, "chose progression");
        ProgressionPlan::from_templates(progression, pattern, length)
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }
}

/// Build the chords of a plan in `scale`.
pub fn build_chords(
    scale: &Scale,
    plan: &ProgressionPlan,
    config: &GenerationConfig,
    rng: &mut impl Rng,
) -> Vec<Chord> {
    let params = &config.chords;
    let window = config.performance.chord_window;
    let ticks_per_beat = config.ticks_per_beat as u32;

    plan.degrees
        .iter()
        .zip(&plan.beats)
        .map(|(&degree, &beats)| {
            let seventh = rng.random_bool(params.seventh_probability);
            let root_pc = scale.degree_pc(degree) as i32;
            let root = clamp_to_range(root_pc + params.root_register as i32, window);

            // Upper voice `steps` diatonic steps above the root, in the
            // nearest position above it.
            let above_root = |steps: usize| {
                let pc = scale.degree_pc(degree + steps) as i32;
                clamp_to_range(root as i32 + (pc - root_pc).rem_euclid(12), window)
            };

            let mut pitches = Vec::with_capacity(6);
            if params.bass_doubling {
                pitches.push(clamp_to_range(root_pc + 36, window));
                pitches.push(clamp_to_range(root_pc + 48, window));
            }
            pitches.push(root);
            pitches.push(above_root(THIRD));
            pitches.push(above_root(FIFTH));
            if seventh {
                pitches.push(above_root(SEVENTH));
            }

            Chord {
                degree,
                pitches,
                duration: beats * ticks_per_beat,
                velocity: params.velocity.sample(rng),
                seventh,
            }
        })
        .collect()
}

/// Generate a random progression of `length` chords in `scale_id`.
pub fn generate_chords(
    scale_id: &str,
    length: usize,
    config: &GenerationConfig,
    rng: &mut impl Rng,
) -> Result<Vec<Chord>> {
    let scale = lookup(scale_id)?;
    let plan = ProgressionPlan::choose(length, rng)?;
    Ok(build_chords(scale, &plan, config, rng))
}

/// Per-chord durations in ticks.
pub fn chord_durations(chords: &[Chord]) -> Vec<u32> {
    chords.iter().map(|c| c.duration).collect()
}

/// Per-chord generator velocities.
pub fn chord_velocities(chords: &[Chord]) -> Vec<u8> {
    chords.iter().map(|c| c.velocity).collect()
}
