// Tonal mode of a scale: major or minor.
//
// The melody model ships as two independent artifact sets, one trained on
// major-key material and one on minor-key material. Everything that has to
// pick between the two (artifact directories, corpus filtering, session
// caching) keys off this enum. Scale ids carry the mode as a suffix
// ("DMINOR", "F#MAJOR"), so the mode of any id can be read without the
// scale table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Major or minor. Anything that is not explicitly major is treated as minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Major, Mode::Minor];

    /// Suffix used in scale ids ("MAJOR" / "MINOR").
    pub fn suffix(self) -> &'static str {
        match self {
            Mode::Major => "MAJOR",
            Mode::Minor => "MINOR",
        }
    }

    /// Lowercase name, also the artifact sub-directory name.
    pub fn name(self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }

    /// Parse a user-supplied mode name. Unrecognized names fall back to minor.
    pub fn parse_lenient(name: &str) -> Mode {
        match name.trim().to_ascii_lowercase().as_str() {
            "major" | "maj" | "ionian" => Mode::Major,
            _ => Mode::Minor,
        }
    }

    /// Mode implied by a scale id's suffix, or None if the id has neither suffix.
    pub fn of_scale_id(scale_id: &str) -> Option<Mode> {
        let upper = scale_id.to_ascii_uppercase();
        if upper.ends_with("MAJOR") {
            Some(Mode::Major)
        } else if upper.ends_with("MINOR") {
            Some(Mode::Minor)
        } else {
            None
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
