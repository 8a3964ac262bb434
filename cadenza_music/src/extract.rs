// Reference corpus extraction from MIDI files.
//
// Source melodies are monophonic MIDI files named "<title> - <SCALEID>.mid",
// e.g. "Greensleeves - AMINOR.mid". Extraction walks every track and pairs
// note-ons with note-offs using a single active-note slot: a new note-on
// replaces whatever was sounding, and a note-off (or a note-on with velocity
// 0) closes the slot, emitting an event only when its key matches the active
// note. Durations are floored at one tick. Time restarts at zero for each
// track, since the tracks of a multi-track file run in parallel.
//
// `index_corpus` applies this to a whole directory, grouping events by the
// scale named in each file name. Files whose scale is not in the table, or
// that fail to parse, are skipped with a warning.

use crate::scale;
use cadenza_model::{CorpusEvent, ReferenceCorpus};
use midly::{MidiMessage, Smf, TrackEventKind};
use std::io;
use std::path::{Path, PathBuf};

/// Extract (pitch, duration, velocity) events from SMF bytes.
pub fn extract_melody(bytes: &[u8]) -> Result<Vec<CorpusEvent>, midly::Error> {
    let smf = Smf::parse(bytes)?;
    let mut melody = Vec::new();

    for track in &smf.tracks {
        let mut now: u64 = 0;
        // (key, velocity, start)
        let mut active: Option<(u8, u8, u64)> = None;

        for event in track {
            now += event.delta.as_int() as u64;
            let TrackEventKind::Midi { message, .. } = event.kind else {
                continue;
            };
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    active = Some((key.as_int(), vel.as_int(), now));
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    let Some((note, velocity, start)) = active.take() else {
                        continue;
                    };
                    if note == key.as_int() {
                        let duration = (now - start).clamp(1, u32::MAX as u64) as u32;
                        melody.push(CorpusEvent {
                            note: note as i32,
                            duration,
                            velocity,
                        });
                    }
                }
                _ => {}
            }
        }
    }
    Ok(melody)
}

/// The scale id named in a corpus file name ("Title - DMINOR.mid" gives
/// "DMINOR"). Returns `None` when the name has no " - " separator.
pub fn scale_from_filename(file_name: &str) -> Option<String> {
    let mut parts = file_name.split(" - ");
    parts.next()?;
    let tag = parts.next()?;
    let tag = tag.strip_suffix(".mid").unwrap_or(tag).trim();
    if tag.is_empty() {
        return None;
    }
    Some(tag.to_ascii_uppercase())
}

/// Build a corpus from every `.mid` file directly inside `dir`.
pub fn index_corpus(dir: &Path) -> io::Result<ReferenceCorpus> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("mid"))
        })
        .collect();
    files.sort();

    let mut corpus = ReferenceCorpus::new();
    let mut indexed = 0usize;
    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(scale) = scale_from_filename(name).and_then(|id| scale::lookup(&id).ok()) else {
            tracing::warn!(file = name, "no recognized scale in file name, skipping");
            continue;
        };
        let bytes = std::fs::read(path)?;
        match extract_melody(&bytes) {
            Ok(events) => {
                tracing::debug!(file = name, scale = scale.id, events = events.len(), "indexed");
                corpus.extend(scale.id, events);
                indexed += 1;
            }
            Err(err) => {
                tracing::warn!(file = name, %err, "unreadable midi file, skipping");
            }
        }
    }
    tracing::info!(
        dir = %dir.display(),
        files = indexed,
        events = corpus.len(),
        "indexed reference corpus"
    );
    Ok(corpus)
}
