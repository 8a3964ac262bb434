// MIDI output for assembled timelines.
//
// Converts the delta-time event stream from `timeline.rs` into a Standard
// MIDI File: Format 0 (single track), metrical timing at the configured
// ticks per beat, a track name, one tempo meta event, every note on
// channel 0, and a closing end-of-track.
//
// The whole file is encoded into memory first; `write_midi` only touches
// the filesystem once encoding has succeeded, so a failed encode never
// leaves a partial file behind.
//
// Uses the `midly` crate for MIDI writing.

use crate::error::{GenerationError, Result};
use crate::timeline::{DeltaEvent, EventKind};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

const TRACK_NAME: &[u8] = b"Cadenza";

/// Largest delta a MIDI variable-length quantity can carry.
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Largest tempo (microseconds per quarter) a tempo meta event can carry.
const MAX_TEMPO_MICROS: u32 = 0xFF_FFFF;

const MAX_TICKS_PER_BEAT: u16 = 0x7FFF;

/// Build an in-memory SMF from delta-timed events.
pub fn timeline_to_smf(
    events: &[DeltaEvent],
    ticks_per_beat: u16,
    tempo_bpm: u16,
) -> Result<Smf<'static>> {
    if ticks_per_beat == 0 || ticks_per_beat > MAX_TICKS_PER_BEAT {
        return Err(GenerationError::Midi(format!(
            "ticks per beat {ticks_per_beat} outside 1..={MAX_TICKS_PER_BEAT}"
        )));
    }
    if tempo_bpm == 0 {
        return Err(GenerationError::Midi("tempo of 0 bpm".into()));
    }
    let tempo_micros = 60_000_000 / tempo_bpm as u32;
    if tempo_micros > MAX_TEMPO_MICROS {
        return Err(GenerationError::Midi(format!(
            "tempo {tempo_bpm} bpm is too slow to encode"
        )));
    }

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(ticks_per_beat)),
    ));

    let channel = u4::new(0);
    let mut track: Track<'static> = Vec::with_capacity(events.len() + 3);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(TRACK_NAME)),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros))),
    });

    for event in events {
        if event.delta > MAX_DELTA {
            return Err(GenerationError::Midi(format!(
                "delta of {} ticks exceeds the MIDI maximum",
                event.delta
            )));
        }
        let key = u7::new(event.pitch.min(127));
        let vel = u7::new(event.velocity.min(127));
        let message = match event.kind {
            EventKind::NoteOn => MidiMessage::NoteOn { key, vel },
            EventKind::NoteOff => MidiMessage::NoteOff { key, vel },
        };
        track.push(TrackEvent {
            delta: u28::new(event.delta as u32),
            kind: TrackEventKind::Midi { channel, message },
        });
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    Ok(smf)
}

/// Encode delta-timed events as SMF bytes.
pub fn encode_midi(events: &[DeltaEvent], ticks_per_beat: u16, tempo_bpm: u16) -> Result<Vec<u8>> {
    let smf = timeline_to_smf(events, ticks_per_beat, tempo_bpm)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)
        .map_err(|e| GenerationError::Midi(format!("encoding failed: {e}")))?;
    Ok(buf)
}

/// Encode and write to `path`. Returns the number of bytes written.
pub fn write_midi(
    events: &[DeltaEvent],
    ticks_per_beat: u16,
    tempo_bpm: u16,
    path: &Path,
) -> Result<usize> {
    let bytes = encode_midi(events, ticks_per_beat, tempo_bpm)?;
    std::fs::write(path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote midi file");
    Ok(bytes.len())
}
