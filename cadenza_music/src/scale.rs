// Scale table: the 24 major and natural-minor scales.
//
// Each scale is keyed by an id made of its tonic and mode ("DMINOR",
// "F#MAJOR") and lists its seven degree names, degree 0 being the tonic.
// Names keep conventional spellings (C minor is C D Eb F G Ab Bb), so the
// semitone of each degree is derived from the tonic plus the mode's interval
// pattern rather than re-parsed from the names. A test checks the two agree.
//
// The table is static and never mutated. Everything that needs scale
// membership, degree pitch classes or transposition goes through `lookup`.

use cadenza_model::Mode;
use thiserror::Error;

/// The requested scale id is not in the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scale: {0}")]
pub struct UnknownScaleError(pub String);

/// One diatonic scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    pub id: &'static str,
    pub mode: Mode,
    /// Pitch class of degree 0.
    pub tonic: u8,
    /// Degree names, tonic first.
    pub notes: [&'static str; 7],
}

/// Semitone offsets of degrees 0-6 above the tonic.
pub fn mode_intervals(mode: Mode) -> [u8; 7] {
    match mode {
        Mode::Major => [0, 2, 4, 5, 7, 9, 11],
        Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
    }
}

impl Scale {
    /// Pitch class (0-11) of a degree; degrees wrap mod 7.
    pub fn degree_pc(&self, degree: usize) -> u8 {
        (self.tonic + mode_intervals(self.mode)[degree % 7]) % 12
    }

    /// Pitch classes of all seven degrees, tonic first.
    pub fn semitones(&self) -> [u8; 7] {
        std::array::from_fn(|d| self.degree_pc(d))
    }

    /// Whether pitch class `pc` (0-11) belongs to the scale.
    pub fn contains_pc(&self, pc: u8) -> bool {
        self.semitones().contains(&(pc % 12))
    }

    /// Whether a MIDI pitch (any octave, negative allowed) is diatonic.
    pub fn contains(&self, pitch: i32) -> bool {
        self.contains_pc(pitch.rem_euclid(12) as u8)
    }
}

const fn scale(id: &'static str, mode: Mode, tonic: u8, notes: [&'static str; 7]) -> Scale {
    Scale {
        id,
        mode,
        tonic,
        notes,
    }
}

/// Every registered scale.
pub static SCALES: [Scale; 24] = [
    scale("CMAJOR", Mode::Major, 0, ["C", "D", "E", "F", "G", "A", "B"]),
    scale("C#MAJOR", Mode::Major, 1, ["C#", "D#", "F", "F#", "G#", "A#", "C"]),
    scale("DMAJOR", Mode::Major, 2, ["D", "E", "F#", "G", "A", "B", "C#"]),
    scale("D#MAJOR", Mode::Major, 3, ["D#", "F", "G", "G#", "A#", "C", "D"]),
    scale("EMAJOR", Mode::Major, 4, ["E", "F#", "G#", "A", "B", "C#", "D#"]),
    scale("FMAJOR", Mode::Major, 5, ["F", "G", "A", "Bb", "C", "D", "E"]),
    scale("F#MAJOR", Mode::Major, 6, ["F#", "G#", "A#", "B", "C#", "D#", "F"]),
    scale("GMAJOR", Mode::Major, 7, ["G", "A", "B", "C", "D", "E", "F#"]),
    scale("G#MAJOR", Mode::Major, 8, ["G#", "A#", "C", "C#", "D#", "F", "G"]),
    scale("AMAJOR", Mode::Major, 9, ["A", "B", "C#", "D", "E", "F#", "G#"]),
    scale("A#MAJOR", Mode::Major, 10, ["A#", "C", "D", "D#", "F", "G", "A"]),
    scale("BMAJOR", Mode::Major, 11, ["B", "C#", "D#", "E", "F#", "G#", "A#"]),
    scale("CMINOR", Mode::Minor, 0, ["C", "D", "Eb", "F", "G", "Ab", "Bb"]),
    scale("C#MINOR", Mode::Minor, 1, ["C#", "D#", "E", "F#", "G#", "A", "B"]),
    scale("DMINOR", Mode::Minor, 2, ["D", "E", "F", "G", "A", "Bb", "C"]),
    scale("D#MINOR", Mode::Minor, 3, ["D#", "F", "F#", "G#", "A#", "B", "C#"]),
    scale("EMINOR", Mode::Minor, 4, ["E", "F#", "G", "A", "B", "C", "D"]),
    scale("FMINOR", Mode::Minor, 5, ["F", "G", "Ab", "Bb", "C", "Db", "Eb"]),
    scale("F#MINOR", Mode::Minor, 6, ["F#", "G#", "A", "B", "C#", "D", "E"]),
    scale("GMINOR", Mode::Minor, 7, ["G", "A", "Bb", "C", "D", "Eb", "F"]),
    scale("G#MINOR", Mode::Minor, 8, ["G#", "A#", "B", "C#", "D#", "E", "F#"]),
    scale("AMINOR", Mode::Minor, 9, ["A", "B", "C", "D", "E", "F", "G"]),
    scale("A#MINOR", Mode::Minor, 10, ["A#", "C", "C#", "D#", "F", "F#", "G#"]),
    scale("BMINOR", Mode::Minor, 11, ["B", "C#", "D", "E", "F#", "G", "A"]),
];

/// Sharp spelling of each pitch class, used to build canonical scale ids.
const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Find a scale by id (ASCII case-insensitive).
pub fn lookup(scale_id: &str) -> Result<&'static Scale, UnknownScaleError> {
    let id = scale_id.trim();
    SCALES
        .iter()
        .find(|s| s.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| UnknownScaleError(scale_id.to_string()))
}

/// The seven degree names of a scale, tonic first.
pub fn scale_notes(scale_id: &str) -> Result<&'static [&'static str; 7], UnknownScaleError> {
    lookup(scale_id).map(|s| &s.notes)
}

/// Pitch class of a note name. Accepts sharps, flats and the enharmonic
/// spellings E#, Fb, B#, Cb; case-insensitive on the letter.
pub fn note_semitone(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental: i32 = match chars.as_str() {
        "" => 0,
        "#" => 1,
        "b" | "B" => -1,
        _ => return None,
    };
    Some((base + accidental).rem_euclid(12) as u8)
}

/// Canonical id for a tonic name and mode, e.g. ("Bb", Minor) -> "A#MINOR".
/// Unparseable tonics are passed through upper-cased so lookup reports them.
pub fn scale_id_for(tonic: &str, mode: Mode) -> String {
    let tonic_name = match note_semitone(tonic) {
        Some(pc) => SHARP_NAMES[pc as usize].to_string(),
        None => tonic.trim().to_ascii_uppercase(),
    };
    format!("{}{}", tonic_name, mode.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_agree_with_semitones() {
        for s in &SCALES {
            let from_names: Vec<u8> = s.notes.iter().map(|n| note_semitone(n).unwrap()).collect();
            assert_eq!(from_names, s.semitones().to_vec(), "{}", s.id);
            assert_eq!(s.id, scale_id_for(s.notes[0], s.mode));
        }
    }

    #[test]
    fn test_lookup_case_insensitive() {
        assert_eq!(lookup("dminor").unwrap().id, "DMINOR");
        assert_eq!(lookup(" F#MAJOR ").unwrap().tonic, 6);
        assert_eq!(
            lookup("HMINOR").unwrap_err(),
            UnknownScaleError("HMINOR".to_string())
        );
    }

    #[test]
    fn test_scale_notes() {
        assert_eq!(
            scale_notes("CMINOR").unwrap(),
            &["C", "D", "Eb", "F", "G", "Ab", "Bb"]
        );
        assert!(scale_notes("CLYDIAN").is_err());
    }

    #[test]
    fn test_note_semitone_enharmonics() {
        assert_eq!(note_semitone("Db"), Some(1));
        assert_eq!(note_semitone("C#"), Some(1));
        assert_eq!(note_semitone("E#"), Some(5));
        assert_eq!(note_semitone("Cb"), Some(11));
        assert_eq!(note_semitone("bb"), Some(10));
        assert_eq!(note_semitone("H"), None);
        assert_eq!(note_semitone("C##"), None);
    }

    #[test]
    fn test_scale_id_for_flat_tonic() {
        assert_eq!(scale_id_for("Bb", Mode::Minor), "A#MINOR");
        assert_eq!(scale_id_for("d", Mode::Major), "DMAJOR");
        assert_eq!(scale_id_for("xyz", Mode::Minor), "XYZMINOR");
    }

    #[test]
    fn test_contains_negative_pitch() {
        let c_major = lookup("CMAJOR").unwrap();
        assert!(c_major.contains(-12));
        assert!(!c_major.contains(-11));
        assert!(c_major.contains(64));
    }
}
