// Cadenza Music Generator - CLI entry point.
//
// Two subcommands:
//
//   cadenza generate --tonic D --mode minor --output out.mid
//     [--seed N] [--artifacts DIR] [--config FILE]
//     [--chord-length N] [--melody-length N] [--tempo BPM]
//
//   cadenza index-corpus <midi-dir> <corpus.json>
//
// `generate` loads the artifact set for the requested mode from
// `<artifacts>/<major|minor>/` and writes a single-track MIDI file.
// `index-corpus` turns a directory of "<title> - <SCALEID>.mid" files into
// the corpus JSON the artifact set expects. Logging goes through
// `tracing`; set RUST_LOG to adjust.

use anyhow::{Context, Result};
use cadenza_music::extract::index_corpus;
use cadenza_music::{Composer, GenerationConfig, ScaleRequest};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cadenza")]
#[command(about = "Chord-and-melody MIDI generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a piece and write it as a MIDI file
    Generate {
        /// Tonic note name (C, F#, Bb, ...)
        #[arg(long, default_value = "C")]
        tonic: String,

        /// "major" or "minor"; anything else means minor
        #[arg(long, default_value = "minor")]
        mode: String,

        /// Output MIDI path
        #[arg(short, long, default_value = "output.mid")]
        output: PathBuf,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Artifact root containing major/ and minor/ sets
        #[arg(long, default_value = "artifacts", env = "CADENZA_ARTIFACTS")]
        artifacts: PathBuf,

        /// Generation config (JSON); flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of chords
        #[arg(long)]
        chord_length: Option<usize>,

        /// Number of melody notes
        #[arg(long)]
        melody_length: Option<usize>,

        /// Tempo in beats per minute
        #[arg(long)]
        tempo: Option<u16>,
    },

    /// Build a reference corpus from a directory of tagged MIDI files
    IndexCorpus {
        /// Directory of "<title> - <SCALEID>.mid" files
        dir: PathBuf,

        /// Corpus JSON to write
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadenza=info,cadenza_music=info,cadenza_model=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Generate {
            tonic,
            mode,
            output,
            seed,
            artifacts,
            config,
            chord_length,
            melody_length,
            tempo,
        } => {
            let mut config = match config {
                Some(path) => GenerationConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => GenerationConfig::default(),
            };
            if let Some(n) = chord_length {
                config.chords.length = n;
            }
            if let Some(n) = melody_length {
                config.melody.length = n;
            }
            if let Some(bpm) = tempo {
                config.tempo_bpm = bpm;
            }

            let request = ScaleRequest::new(tonic, &mode);
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_os_rng(),
            };
            tracing::info!(
                scale = %request.scale_id(),
                seed = ?seed,
                artifacts = %artifacts.display(),
                "generating"
            );

            let composer = Composer::new(config, artifacts).context("invalid configuration")?;
            let summary = composer
                .generate_music(&request, &output, &mut rng)
                .with_context(|| format!("failed to generate {}", request.scale_id()))?;

            println!(
                "Wrote {} ({}: {} chords, {} melody notes, {} ticks)",
                summary.path.display(),
                summary.scale_id,
                summary.chords,
                summary.melody_notes,
                summary.ticks
            );
        }
        Command::IndexCorpus { dir, output } => {
            let corpus = index_corpus(&dir)
                .with_context(|| format!("failed to index {}", dir.display()))?;
            let json = corpus.to_json().context("failed to serialize corpus")?;
            std::fs::write(&output, json)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Indexed {} events across {} scales into {}",
                corpus.len(),
                corpus.scale_ids().count(),
                output.display()
            );
        }
    }
    Ok(())
}
