// Autoregressive melody generation with scale-snapping feedback.
//
// A generation run moves through three phases:
//
// 1. Seeding. Draw a few historical events from the reference corpus, only
//    from scales of the same mode as the target, and transpose each by the
//    offset between its source scale and the target. The normalized seed
//    rows fill a `ContextWindow` of W rows, left-padded with zero rows when
//    there are fewer than W seeds.
// 2. Inference, repeated `length` times. The model predicts one normalized
//    row from the window. Each feature is denormalized by its own
//    normalizer and rounded; duration is floored at one tick. The pitch is
//    then snapped onto the target scale, keeping its octave block, so every
//    emitted note is diatonic whatever the model said. The finished note is
//    re-normalized and pushed into the window, evicting the oldest row.
// 3. Done. The collected notes are returned.
//
// The session (model, normalizers, corpus) is passed in explicitly and only
// read. All randomness is in seeding and comes from the caller's `rng`.

use crate::config::MelodyParams;
use crate::error::{GenerationError, Result};
use crate::pitch::{fold_into_midi, scale_offset, snap_to_scale};
use crate::scale::{Scale, lookup};
use cadenza_model::{ContextWindow, FeatureRow, InferenceSession};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::sync::Arc;

/// One melody note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MelodyEvent {
    pub pitch: u8,
    pub duration: u32,
    pub velocity: u8,
}

/// An ordered melody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Melody {
    pub events: Vec<MelodyEvent>,
}

impl Melody {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.events.iter().map(|e| e.pitch).collect()
    }

    pub fn durations(&self) -> Vec<u32> {
        self.events.iter().map(|e| e.duration).collect()
    }

    pub fn velocities(&self) -> Vec<u8> {
        self.events.iter().map(|e| e.velocity).collect()
    }

    pub fn total_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.duration as u64).sum()
    }
}

/// A corpus note moved into the target scale, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SeedNote {
    pitch: i32,
    duration: u32,
    velocity: u8,
}

/// Generates melodies from one inference session.
#[derive(Debug, Clone)]
pub struct MelodyGenerator {
    session: Arc<InferenceSession>,
    window_len: usize,
    seed_count: usize,
}

impl MelodyGenerator {
    pub fn new(session: Arc<InferenceSession>, params: &MelodyParams) -> Self {
        MelodyGenerator {
            session,
            window_len: params.window_len.max(1),
            seed_count: params.seed_count,
        }
    }

    pub fn session(&self) -> &InferenceSession {
        &self.session
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Generate `length` notes in `scale_id`.
    pub fn generate(&self, scale_id: &str, length: usize, rng: &mut impl Rng) -> Result<Melody> {
        let scale = lookup(scale_id)?;
        if length == 0 {
            return Ok(Melody::default());
        }
        if self.session.mode() != scale.mode {
            tracing::warn!(
                session = %self.session.mode(),
                target = scale.id,
                "melody session mode differs from target scale mode"
            );
        }

        let seeds = self.sample_seeds(scale, rng)?;
        let mut window = self.seed_window(&seeds);

        let mut events = Vec::with_capacity(length);
        for step in 0..length {
            let event = self.predict_next(&window, scale);
            window.push(self.normalize(&event));
            tracing::trace!(
                step,
                pitch = event.pitch,
                duration = event.duration,
                velocity = event.velocity,
                "melody step"
            );
            events.push(event);
        }

        tracing::debug!(scale = scale.id, notes = events.len(), "melody generated");
        Ok(Melody { events })
    }

    /// Draw up to `seed_count` corpus events from the target's mode,
    /// transposed into the target scale.
    fn sample_seeds(&self, target: &Scale, rng: &mut impl Rng) -> Result<Vec<SeedNote>> {
        let mut skipped = 0usize;
        let candidates: Vec<SeedNote> = self
            .session
            .corpus()
            .events_in_mode(target.mode)
            .filter_map(|(source, event)| match lookup(source) {
                Ok(source_scale) => Some(SeedNote {
                    pitch: event.note + scale_offset(source_scale, target) as i32,
                    duration: event.duration,
                    velocity: event.velocity,
                }),
                Err(_) => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            tracing::warn!(skipped, "ignored corpus events with unrecognized scale ids");
        }
        if candidates.is_empty() {
            return Err(GenerationError::InsufficientSeedData { mode: target.mode });
        }

        let seeds: Vec<SeedNote> = candidates
            .choose_multiple(rng, self.seed_count)
            .copied()
            .collect();
        tracing::debug!(
            candidates = candidates.len(),
            seeds = seeds.len(),
            window = self.window_len,
            "seeded melody context"
        );
        Ok(seeds)
    }

    fn seed_window(&self, seeds: &[SeedNote]) -> ContextWindow {
        let normalizers = self.session.normalizers();
        let rows: Vec<FeatureRow> = seeds
            .iter()
            .map(|s| normalizers.normalize(s.pitch as f64, s.duration as f64, s.velocity as f64))
            .collect();
        ContextWindow::from_seed(self.window_len, &rows)
    }

    fn predict_next(&self, window: &ContextWindow, scale: &Scale) -> MelodyEvent {
        let raw = self.session.model().predict(window);
        let (pitch, duration, velocity) = self.session.normalizers().denormalize(&raw);
        finalize_prediction(pitch, duration, velocity, scale)
    }

    fn normalize(&self, event: &MelodyEvent) -> FeatureRow {
        self.session.normalizers().normalize(
            event.pitch as f64,
            event.duration as f64,
            event.velocity as f64,
        )
    }
}

/// Turn a denormalized prediction into a playable, diatonic note: round
/// everything, floor the duration at one tick, clamp velocity to MIDI,
/// snap the pitch onto `scale` and octave-fold it into 0..=127.
pub fn finalize_prediction(pitch: f64, duration: f64, velocity: f64, scale: &Scale) -> MelodyEvent {
    // Bounded so the octave arithmetic in the snap cannot overflow.
    let pitch = pitch.round().clamp(i16::MIN as f64, i16::MAX as f64) as i32;
    // `as` saturates: negative and NaN become 0, then the floor applies.
    let duration = (duration.round() as u32).max(1);
    let velocity = velocity.round().clamp(0.0, 127.0) as u8;
    MelodyEvent {
        pitch: fold_into_midi(snap_to_scale(pitch, scale)),
        duration,
        velocity,
    }
}
