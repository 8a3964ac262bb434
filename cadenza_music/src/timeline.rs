// Timeline assembly: merging chords and melody into one timed event stream.
//
// Chords and melody are generated with independent timing. Assembly first
// stretches (or squeezes) the melody so its total length matches the
// chords', rounding each note to the nearest tick with a one-tick floor.
// Each voice is then laid out on its own absolute-time cursor starting at
// zero, producing a note-on and a note-off per sounding note:
//
// - chord notes sound one octave above their constructed register, clamped
//   into the chord window;
// - melody notes are clamped into the melody window;
// - both voices get fresh playback velocities drawn from their performance
//   ranges, independent of the velocities the generators assigned.
//
// Both voices share one MIDI channel, so at any one tick every note-off is
// emitted before any note-on: a melody note ending on the key a new chord
// note starts on must not cut that chord note short. Zero-length notes sit
// between the two groups, on before off. Otherwise the merge is a stable
// sort on absolute time and ties keep input order (chords before melody).
// `to_delta_events` converts the result into the delta-time form MIDI
// tracks use.

use crate::chords::Chord;
use crate::config::PerformanceParams;
use crate::error::{GenerationError, Result};
use crate::melody::Melody;
use crate::pitch::clamp_to_range;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// An event at an absolute tick from the start of the piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    pub time: u64,
    pub kind: EventKind,
    pub pitch: u8,
    pub velocity: u8,
}

/// An event timed relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaEvent {
    pub delta: u64,
    pub kind: EventKind,
    pub pitch: u8,
    pub velocity: u8,
}

/// Events sorted by absolute time; at each tick stops precede starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Absolute time of the last event (0 when empty).
    pub fn end_time(&self) -> u64 {
        self.events.last().map_or(0, |e| e.time)
    }

    /// Delta-time form: each event's time minus the previous event's.
    pub fn to_delta_events(&self) -> Vec<DeltaEvent> {
        let mut previous = 0u64;
        self.events
            .iter()
            .map(|e| {
                let delta = e.time - previous;
                previous = e.time;
                DeltaEvent {
                    delta,
                    kind: e.kind,
                    pitch: e.pitch,
                    velocity: e.velocity,
                }
            })
            .collect()
    }
}

/// Scale `durations` so they sum to roughly `target_total`: each is
/// multiplied by `target_total / sum`, rounded to nearest, floored at 1.
/// Fails with `DegenerateDuration` when the durations sum to zero.
pub fn rescale_durations(durations: &[u32], target_total: u64) -> Result<Vec<u32>> {
    let total: u64 = durations.iter().map(|&d| d as u64).sum();
    if total == 0 {
        return Err(GenerationError::DegenerateDuration);
    }
    let factor = target_total as f64 / total as f64;
    Ok(durations
        .iter()
        .map(|&d| ((d as f64 * factor).round() as u32).max(1))
        .collect())
}

/// Lay chords and melody out on one timeline.
pub fn assemble_timeline(
    chords: &[Chord],
    melody: &Melody,
    performance: &PerformanceParams,
    rng: &mut impl Rng,
) -> Timeline {
    let chord_total: u64 = chords.iter().map(|c| c.duration as u64).sum();
    let raw_durations = melody.durations();
    let melody_durations = match rescale_durations(&raw_durations, chord_total) {
        Ok(scaled) => {
            tracing::debug!(
                chord_ticks = chord_total,
                melody_ticks = melody.total_ticks(),
                "rescaled melody to chord length"
            );
            scaled
        }
        Err(err) => {
            tracing::debug!(%err, "melody rescale skipped");
            raw_durations
        }
    };

    let chord_notes: usize = chords.iter().map(|c| c.pitches.len()).sum();
    let mut events = Vec::with_capacity(2 * (chord_notes + melody.len()));

    // Velocity 0 would read as a note-off, so sampled values floor at 1.
    let mut cursor = 0u64;
    for chord in chords {
        let end = cursor + chord.duration as u64;
        for &p in &chord.pitches {
            let pitch = clamp_to_range(p as i32 + 12, performance.chord_window);
            let velocity = performance.chord_velocity.sample(rng).max(1);
            push_note(&mut events, cursor, end, pitch, velocity);
        }
        cursor = end;
    }

    let mut cursor = 0u64;
    for (note, &duration) in melody.events.iter().zip(&melody_durations) {
        let end = cursor + duration as u64;
        let pitch = clamp_to_range(note.pitch as i32, performance.melody_window);
        let velocity = performance.melody_velocity.sample(rng).max(1);
        push_note(&mut events, cursor, end, pitch, velocity);
        cursor = end;
    }

    events.sort_by_key(|(rank, e)| (e.time, *rank));
    Timeline {
        events: events.into_iter().map(|(_, e)| e).collect(),
    }
}

/// Order of events sharing a tick.
const RANK_OFF: u8 = 0;
const RANK_ZERO_LENGTH_ON: u8 = 1;
const RANK_ZERO_LENGTH_OFF: u8 = 2;
const RANK_ON: u8 = 3;

fn push_note(
    events: &mut Vec<(u8, TimelineEvent)>,
    start: u64,
    end: u64,
    pitch: u8,
    velocity: u8,
) {
    let (on_rank, off_rank) = if end == start {
        (RANK_ZERO_LENGTH_ON, RANK_ZERO_LENGTH_OFF)
    } else {
        (RANK_ON, RANK_OFF)
    };
    events.push((
        on_rank,
        TimelineEvent {
            time: start,
            kind: EventKind::NoteOn,
            pitch,
            velocity,
        },
    ));
    events.push((
        off_rank,
        TimelineEvent {
            time: end,
            kind: EventKind::NoteOff,
            pitch,
            velocity,
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VelocityRange;
    use crate::melody::MelodyEvent;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn chord(pitches: &[u8], duration: u32) -> Chord {
        Chord {
            degree: 0,
            pitches: pitches.to_vec(),
            duration,
            velocity: 90,
            seventh: pitches.len() == 4,
        }
    }

    fn melody(notes: &[(u8, u32)]) -> Melody {
        Melody {
            events: notes
                .iter()
                .map(|&(pitch, duration)| MelodyEvent { pitch, duration, velocity: 100 })
                .collect(),
        }
    }

    fn sample_piece() -> (Vec<Chord>, Melody) {
        let chords = vec![
            chord(&[60, 64, 67], 1536),
            chord(&[65, 69, 72, 76], 768),
            chord(&[67, 71, 74], 2304),
            chord(&[60, 64, 67], 1536),
        ];
        let melody = melody(&[(72, 100), (74, 200), (76, 37), (77, 400), (79, 1), (72, 90)]);
        (chords, melody)
    }

    #[test]
    fn test_rescale_example() {
        let scaled = rescale_durations(&[100, 200, 300, 400], 6144).unwrap();
        assert_eq!(scaled, vec![614, 1229, 1843, 2458]);
        assert_eq!(scaled.iter().sum::<u32>(), 6144);
    }

    #[test]
    fn test_rescale_floor_and_zero_total() {
        assert_eq!(rescale_durations(&[1, 10_000], 100).unwrap(), vec![1, 100]);
        assert!(matches!(
            rescale_durations(&[0, 0], 100),
            Err(GenerationError::DegenerateDuration)
        ));
        assert!(matches!(
            rescale_durations(&[], 100),
            Err(GenerationError::DegenerateDuration)
        ));
    }

    #[test]
    fn test_rescale_law_within_one_tick_per_note() {
        let cases: [&[u32]; 4] = [&[1, 2, 3], &[384, 96, 96, 192, 7], &[5; 13], &[999, 1]];
        for durations in cases {
            for target in [1u64, 500, 6144, 100_000] {
                let scaled = rescale_durations(durations, target).unwrap();
                let total: u64 = scaled.iter().map(|&d| d as u64).sum();
                let tolerance = durations.len() as u64;
                assert!(
                    total.abs_diff(target) <= tolerance,
                    "{durations:?} -> {target}: got {total}"
                );
                assert!(scaled.iter().all(|&d| d >= 1));
            }
        }
    }

    #[test]
    fn test_delta_times_sum_to_end_time() {
        let (chords, melody) = sample_piece();
        let timeline = assemble_timeline(
            &chords,
            &melody,
            &PerformanceParams::default(),
            &mut StdRng::seed_from_u64(5),
        );

        let chord_notes: usize = chords.iter().map(|c| c.pitches.len()).sum();
        assert_eq!(timeline.len(), 2 * (chord_notes + melody.len()));

        let deltas = timeline.to_delta_events();
        let sum: u64 = deltas.iter().map(|d| d.delta).sum();
        assert_eq!(sum, timeline.end_time());
        assert_eq!(timeline.end_time(), 6144);
        assert!(timeline.events().windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(deltas[0].delta, 0);
    }

    #[test]
    fn test_melody_is_stretched_to_chord_length() {
        // Chord notes sound at 60/64/67; the melody uses none of those keys.
        let chords = vec![chord(&[48, 52, 55], 1536), chord(&[48, 52, 55], 1536)];
        let melody = melody(&[(74, 100), (77, 300), (79, 100)]);
        let timeline = assemble_timeline(
            &chords,
            &melody,
            &PerformanceParams::default(),
            &mut StdRng::seed_from_u64(5),
        );

        let melody_times = |kind: EventKind| -> Vec<u64> {
            timeline
                .events()
                .iter()
                .filter(|e| e.kind == kind && [74, 77, 79].contains(&e.pitch))
                .map(|e| e.time)
                .collect()
        };
        // 3072 / 500 = 6.144 ticks per source tick: 614, 1843, 614.
        assert_eq!(melody_times(EventKind::NoteOn), vec![0, 614, 2457]);
        assert_eq!(melody_times(EventKind::NoteOff), vec![614, 2457, 3071]);
        let last_off = *melody_times(EventKind::NoteOff).last().unwrap();
        assert!(last_off.abs_diff(3072) <= melody.len() as u64);
    }

    #[test]
    fn test_chords_sound_an_octave_up_and_clamped() {
        let chords = vec![chord(&[60, 64, 80], 384)];
        let timeline = assemble_timeline(
            &chords,
            &Melody::default(),
            &PerformanceParams::default(),
            &mut StdRng::seed_from_u64(0),
        );
        let mut on: Vec<u8> = timeline
            .events()
            .iter()
            .filter(|e| e.kind == EventKind::NoteOn)
            .map(|e| e.pitch)
            .collect();
        on.sort_unstable();
        // 80 + 12 = 92 is above the chord window's 84 and folds back to 80.
        assert_eq!(on, vec![72, 76, 80]);
    }

    #[test]
    fn test_performance_velocities_are_redrawn() {
        let (chords, melody) = sample_piece();
        let perf = PerformanceParams::default();
        let timeline = assemble_timeline(&chords, &melody, &perf, &mut StdRng::seed_from_u64(11));
        for e in timeline.events() {
            assert!(
                perf.chord_velocity.contains(e.velocity) || perf.melody_velocity.contains(e.velocity),
                "{e:?}"
            );
            assert_ne!(e.velocity, 90);
            assert_ne!(e.velocity, 100);
        }
    }

    #[test]
    fn test_equal_times_keep_input_order() {
        let chords = vec![chord(&[48, 52, 55], 100), chord(&[50, 53, 57], 100)];
        let melody = melody(&[(72, 50), (74, 50)]);
        let timeline = assemble_timeline(
            &chords,
            &melody,
            &PerformanceParams::default(),
            &mut StdRng::seed_from_u64(2),
        );
        let at = |time: u64| -> Vec<(EventKind, u8)> {
            timeline
                .events()
                .iter()
                .filter(|e| e.time == time)
                .map(|e| (e.kind, e.pitch))
                .collect()
        };
        assert_eq!(
            at(0),
            vec![
                (EventKind::NoteOn, 60),
                (EventKind::NoteOn, 64),
                (EventKind::NoteOn, 67),
                (EventKind::NoteOn, 72),
            ]
        );
        // Every stop at tick 100 precedes every start, each group in input order.
        assert_eq!(
            at(100),
            vec![
                (EventKind::NoteOff, 60),
                (EventKind::NoteOff, 64),
                (EventKind::NoteOff, 67),
                (EventKind::NoteOff, 72),
                (EventKind::NoteOn, 62),
                (EventKind::NoteOn, 65),
                (EventKind::NoteOn, 69),
                (EventKind::NoteOn, 74),
            ]
        );
    }

    #[test]
    fn test_shared_key_stops_before_it_restarts() {
        // Chords sound at 72, the same key the melody starts on.
        let chords = vec![chord(&[60], 100), chord(&[60], 100)];
        let melody = melody(&[(72, 50), (74, 50)]);
        let timeline = assemble_timeline(
            &chords,
            &melody,
            &PerformanceParams::default(),
            &mut StdRng::seed_from_u64(4),
        );
        let at_hundred: Vec<(EventKind, u8)> = timeline
            .events()
            .iter()
            .filter(|e| e.time == 100)
            .map(|e| (e.kind, e.pitch))
            .collect();
        assert_eq!(
            at_hundred,
            vec![
                (EventKind::NoteOff, 72),
                (EventKind::NoteOff, 72),
                (EventKind::NoteOn, 72),
                (EventKind::NoteOn, 74),
            ]
        );
    }

    #[test]
    fn test_zero_length_note_starts_before_it_stops() {
        let chords = vec![chord(&[60], 0), chord(&[60], 100)];
        let timeline = assemble_timeline(
            &chords,
            &Melody::default(),
            &PerformanceParams::default(),
            &mut StdRng::seed_from_u64(4),
        );
        let kinds: Vec<(u64, EventKind)> =
            timeline.events().iter().map(|e| (e.time, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (0, EventKind::NoteOn),
                (0, EventKind::NoteOff),
                (0, EventKind::NoteOn),
                (100, EventKind::NoteOff),
            ]
        );
    }

    #[test]
    fn test_sampled_velocity_never_zero() {
        let mut perf = PerformanceParams::default();
        perf.chord_velocity = VelocityRange::new(0, 0);
        perf.melody_velocity = VelocityRange::new(0, 0);
        let (chords, melody) = sample_piece();
        let timeline = assemble_timeline(&chords, &melody, &perf, &mut StdRng::seed_from_u64(1));
        assert!(timeline.events().iter().all(|e| e.velocity == 1));
    }

    #[test]
    fn test_empty_melody_skips_rescale() {
        let chords = vec![chord(&[60, 64, 67], 1536)];
        let timeline = assemble_timeline(
            &chords,
            &Melody::default(),
            &PerformanceParams::default(),
            &mut StdRng::seed_from_u64(0),
        );
        assert_eq!(timeline.len(), 6);
        assert_eq!(timeline.end_time(), 1536);
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let (chords, melody) = sample_piece();
        let perf = PerformanceParams::default();
        let a = assemble_timeline(&chords, &melody, &perf, &mut StdRng::seed_from_u64(8));
        let b = assemble_timeline(&chords, &melody, &perf, &mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
    }
}
