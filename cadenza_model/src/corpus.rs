// Reference corpus of historical melody events.
//
// The corpus is the seed material for melody generation: note events lifted
// from real melodies, grouped by the scale the source piece was written in.
// On disk it is JSON keyed by scale id:
//
//   {"DMINOR": {"melodies": [{"note": 62, "duration": 384, "velocity": 80}, ...]},
//    "CMAJOR": {"melodies": [...]}}
//
// Older exports used the key "melodias"; it is accepted as an alias.
// Groups are kept in a BTreeMap so iteration order, and therefore seeded
// sampling, is reproducible.

use crate::error::{ArtifactLoadError, read_json};
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One historical note: MIDI pitch, duration in ticks, velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEvent {
    pub note: i32,
    pub duration: u32,
    pub velocity: u8,
}

/// All events drawn from pieces in one scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleGroup {
    #[serde(default, alias = "melodias")]
    pub melodies: Vec<CorpusEvent>,
}

/// Read-only collection of historical events tagged by source scale id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceCorpus {
    groups: BTreeMap<String, ScaleGroup>,
}

impl ReferenceCorpus {
    pub fn new() -> Self {
        ReferenceCorpus::default()
    }

    /// Load from a JSON file. Scale ids are upper-cased on load.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let raw: BTreeMap<String, ScaleGroup> = read_json(path)?;
        let mut corpus = ReferenceCorpus::new();
        for (scale, group) in raw {
            corpus.extend(&scale, group.melodies);
        }
        tracing::debug!(
            path = %path.display(),
            scales = corpus.groups.len(),
            events = corpus.len(),
            "loaded reference corpus"
        );
        Ok(corpus)
    }

    /// Append events under a scale id.
    pub fn extend(&mut self, scale_id: &str, events: impl IntoIterator<Item = CorpusEvent>) {
        self.groups
            .entry(scale_id.to_ascii_uppercase())
            .or_default()
            .melodies
            .extend(events);
    }

    /// Total number of events across all scales.
    pub fn len(&self) -> usize {
        self.groups.values().map(|g| g.melodies.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scale ids present in the corpus.
    pub fn scale_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Every event tagged with its source scale id.
    pub fn events(&self) -> impl Iterator<Item = (&str, &CorpusEvent)> {
        self.groups
            .iter()
            .flat_map(|(scale, g)| g.melodies.iter().map(move |e| (scale.as_str(), e)))
    }

    /// Events from scales of the given mode.
    pub fn events_in_mode(&self, mode: Mode) -> impl Iterator<Item = (&str, &CorpusEvent)> {
        self.events()
            .filter(move |(scale, _)| Mode::of_scale_id(scale) == Some(mode))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "DMINOR": {"melodias": [
            {"note": 62, "duration": 384, "velocity": 80},
            {"note": 65, "duration": 192, "velocity": 72}
        ]},
        "cmajor": {"melodies": [{"note": 60, "duration": 384, "velocity": 90}]},
        "AMINOR": {}
    }"#;

    #[test]
    fn test_load_accepts_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let corpus = ReferenceCorpus::load(&path).unwrap();
        assert_eq!(corpus.len(), 3);
        let ids: Vec<&str> = corpus.scale_ids().collect();
        assert_eq!(ids, vec!["AMINOR", "CMAJOR", "DMINOR"]);
    }

    #[test]
    fn test_events_in_mode() {
        let mut corpus = ReferenceCorpus::new();
        corpus.extend("DMINOR", [CorpusEvent { note: 62, duration: 10, velocity: 80 }]);
        corpus.extend("GMAJOR", [CorpusEvent { note: 67, duration: 10, velocity: 80 }]);

        let minor: Vec<_> = corpus.events_in_mode(Mode::Minor).collect();
        assert_eq!(minor.len(), 1);
        assert_eq!(minor[0].0, "DMINOR");
        assert_eq!(minor[0].1.note, 62);
        assert_eq!(corpus.events_in_mode(Mode::Major).count(), 1);
    }

    #[test]
    fn test_json_round_trip_keeps_grouping() {
        let mut corpus = ReferenceCorpus::new();
        corpus.extend("EMINOR", [CorpusEvent { note: 64, duration: 96, velocity: 70 }]);
        let json = corpus.to_json().unwrap();
        assert!(json.contains("\"EMINOR\""));
        assert!(json.contains("\"melodies\""));
        let back: ReferenceCorpus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, corpus);
    }
}
