// Pitch utilities: octave clamping, scale membership, scale-snapping and
// transposition between scales.
//
// All functions are pure. The id-based wrappers (`is_in_scale`,
// `nearest_in_scale_semitone`, `transposition_offset`) only fail when a scale
// id is not in the table; the `Scale`-based forms cannot fail at all.
//
// Two conventions are fixed here:
// - Nearest-semitone distance is the plain |s - pc| over 0..=11, with no
//   wrap-around, so snapping never changes the octave block `pitch div 12`.
//   Ties go to the lower semitone.
// - Transposition offsets live in -5..=6: a tritone is +6 in both directions.

use crate::scale::{Scale, UnknownScaleError, lookup};
use serde::{Deserialize, Serialize};

/// Smallest span (high - low) for which every pitch class has a
/// representative inside the window.
pub const MIN_WINDOW_SPAN: u8 = 11;

/// Inclusive playable range for one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchWindow {
    pub low: u8,
    pub high: u8,
}

impl PitchWindow {
    /// The full MIDI key range.
    pub const MIDI: PitchWindow = PitchWindow { low: 0, high: 127 };

    /// A window, or None if it is too narrow to hold every pitch class or
    /// extends past MIDI 127.
    pub fn new(low: u8, high: u8) -> Option<Self> {
        let w = PitchWindow { low, high };
        w.is_valid().then_some(w)
    }

    pub fn is_valid(&self) -> bool {
        self.high <= 127 && self.high >= self.low && self.high - self.low >= MIN_WINDOW_SPAN
    }

    pub fn contains(&self, pitch: i32) -> bool {
        (self.low as i32..=self.high as i32).contains(&pitch)
    }
}

/// Shift `pitch` by whole octaves until it lies inside `window`.
///
/// For a valid window the result keeps the pitch class and the operation is
/// idempotent. An invalid window still yields a MIDI-range value.
pub fn clamp_to_range(pitch: i32, window: PitchWindow) -> u8 {
    let low = window.low as i32;
    let high = window.high as i32;
    let shifted = if pitch < low {
        pitch + 12 * ((low - pitch + 11) / 12)
    } else if pitch > high {
        pitch - 12 * ((pitch - high + 11) / 12)
    } else {
        pitch
    };
    shifted.clamp(0, 127) as u8
}

/// Octave-shift any pitch into 0..=127.
pub fn fold_into_midi(pitch: i32) -> u8 {
    clamp_to_range(pitch, PitchWindow::MIDI)
}

/// True iff `pitch mod 12` is one of the scale's pitch classes.
pub fn is_in_scale(pitch: i32, scale_id: &str) -> Result<bool, UnknownScaleError> {
    Ok(lookup(scale_id)?.contains(pitch))
}

/// Scale pitch class closest to `pitch_class` (0-11); ties go low.
pub fn nearest_semitone(pitch_class: u8, scale: &Scale) -> u8 {
    let pc = (pitch_class % 12) as i32;
    let semitones = scale.semitones();
    let mut best = semitones[0];
    for &s in &semitones[1..] {
        let d = (s as i32 - pc).abs();
        let best_d = (best as i32 - pc).abs();
        if d < best_d || (d == best_d && s < best) {
            best = s;
        }
    }
    best
}

/// Id-based form of [`nearest_semitone`].
pub fn nearest_in_scale_semitone(
    pitch_class: u8,
    scale_id: &str,
) -> Result<u8, UnknownScaleError> {
    Ok(nearest_semitone(pitch_class, lookup(scale_id)?))
}

/// Replace an out-of-scale pitch class with the nearest scale member,
/// keeping the octave block `pitch div 12`. In-scale pitches pass through.
pub fn snap_to_scale(pitch: i32, scale: &Scale) -> i32 {
    if scale.contains(pitch) {
        return pitch;
    }
    let octave = pitch.div_euclid(12);
    let pc = pitch.rem_euclid(12) as u8;
    octave * 12 + nearest_semitone(pc, scale) as i32
}

/// Signed semitone shift taking material in `from` to `to`, measured
/// between tonics and folded into -5..=6.
pub fn scale_offset(from: &Scale, to: &Scale) -> i8 {
    let diff = (to.tonic as i8 - from.tonic as i8).rem_euclid(12);
    if diff <= 6 { diff } else { diff - 12 }
}

/// Id-based form of [`scale_offset`].
pub fn transposition_offset(from_scale: &str, to_scale: &str) -> Result<i8, UnknownScaleError> {
    Ok(scale_offset(lookup(from_scale)?, lookup(to_scale)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::SCALES;

    const WIDE: PitchWindow = PitchWindow { low: 24, high: 84 };

    #[test]
    fn test_window_validation() {
        assert!(PitchWindow::new(48, 84).is_some());
        assert!(PitchWindow::new(60, 71).is_some());
        assert!(PitchWindow::new(60, 70).is_none());
        assert!(PitchWindow::new(120, 140).is_none());
        assert!(PitchWindow::new(84, 24).is_none());
    }

    #[test]
    fn test_clamp_to_range_in_bounds_and_idempotent() {
        for window in [WIDE, PitchWindow { low: 48, high: 59 }, PitchWindow::MIDI] {
            for x in -200..=300 {
                let once = clamp_to_range(x, window);
                assert!(window.contains(once as i32), "{x} -> {once} outside {window:?}");
                assert_eq!(clamp_to_range(once as i32, window), once);
                assert_eq!(once as i32 % 12, x.rem_euclid(12));
            }
        }
    }

    #[test]
    fn test_clamp_to_range_examples() {
        assert_eq!(clamp_to_range(2, WIDE), 26);
        assert_eq!(clamp_to_range(60, WIDE), 60);
        assert_eq!(clamp_to_range(96, WIDE), 84);
        assert_eq!(clamp_to_range(97, WIDE), 73);
    }

    #[test]
    fn test_is_in_scale() {
        assert!(is_in_scale(62, "DMINOR").unwrap());
        assert!(is_in_scale(70, "DMINOR").unwrap()); // Bb
        assert!(!is_in_scale(66, "DMINOR").unwrap()); // F#
        assert!(is_in_scale(60, "NOPE").is_err());
    }

    #[test]
    fn test_nearest_semitone_ties_go_low() {
        // C major: C# (1) is equidistant from C (0) and D (2).
        assert_eq!(nearest_in_scale_semitone(1, "CMAJOR").unwrap(), 0);
        // F# (6) between F (5) and G (7).
        assert_eq!(nearest_in_scale_semitone(6, "CMAJOR").unwrap(), 5);
        // In-scale classes map to themselves.
        assert_eq!(nearest_in_scale_semitone(11, "CMAJOR").unwrap(), 11);
        // D (2) sits between C# (1) and D# (3) in C# major.
        assert_eq!(nearest_in_scale_semitone(2, "C#MAJOR").unwrap(), 1);
    }

    #[test]
    fn test_nearest_semitone_no_wraparound() {
        // B minor contains 1 (C#) and 11 (B) but not 0; plain distance picks C#.
        assert_eq!(nearest_in_scale_semitone(0, "BMINOR").unwrap(), 1);
    }

    #[test]
    fn test_snap_to_scale_always_diatonic() {
        for s in &SCALES {
            for p in -30..160 {
                let snapped = snap_to_scale(p, s);
                assert!(s.contains(snapped), "{} snapped {p} to {snapped}", s.id);
                assert_eq!(snapped.div_euclid(12), p.div_euclid(12));
            }
        }
    }

    #[test]
    fn test_snap_examples() {
        let d_minor = lookup("DMINOR").unwrap();
        assert_eq!(snap_to_scale(66, d_minor), 65); // F# -> F
        assert_eq!(snap_to_scale(61, d_minor), 60); // C# -> C (tie with D goes low)
        assert_eq!(snap_to_scale(62, d_minor), 62);
    }

    #[test]
    fn test_transposition_offset_antisymmetric_except_tritone() {
        for a in &SCALES {
            for b in &SCALES {
                let ab = scale_offset(a, b);
                let ba = scale_offset(b, a);
                assert!((-5..=6).contains(&ab));
                if ab == 6 {
                    assert_eq!(ba, 6, "{} -> {}", a.id, b.id);
                } else {
                    assert_eq!(ab, -ba, "{} -> {}", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn test_transposition_offset_examples() {
        assert_eq!(transposition_offset("AMINOR", "CMINOR").unwrap(), 3);
        assert_eq!(transposition_offset("CMINOR", "AMINOR").unwrap(), -3);
        assert_eq!(transposition_offset("CMAJOR", "F#MAJOR").unwrap(), 6);
        assert_eq!(transposition_offset("F#MAJOR", "CMAJOR").unwrap(), 6);
        assert_eq!(transposition_offset("CMINOR", "BMINOR").unwrap(), -1);
        assert!(transposition_offset("CMINOR", "XMINOR").is_err());
    }
}
