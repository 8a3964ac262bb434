// Inference sessions: the loaded model, normalizers and corpus for one mode.
//
// A session is an explicitly constructed, owned object handed to the melody
// generator, rather than process-wide globals. The two modes use separate
// artifact sets laid out as
//
//   <artifacts>/<major|minor>/model.json
//                            /note_scaler.json
//                            /duration_scaler.json
//                            /velocity_scaler.json
//                            /corpus.json
//
// Loading is the expensive part, so `SessionRegistry` loads each mode at
// most once and hands out shared `Arc`s. Sessions are immutable after
// construction and `SequenceModel::predict` takes `&self`, so concurrent
// requests can share one without locking. Tests pre-insert sessions built
// around stub models.

use crate::corpus::ReferenceCorpus;
use crate::error::ArtifactLoadError;
use crate::mode::Mode;
use crate::normalizer::{FeatureNormalizers, MinMaxNormalizer};
use crate::sequence::{LstmModel, SequenceModel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File locations of one mode's artifact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub pitch_normalizer: PathBuf,
    pub duration_normalizer: PathBuf,
    pub velocity_normalizer: PathBuf,
    pub corpus: PathBuf,
}

impl ArtifactPaths {
    /// Standard layout under an artifacts root directory.
    pub fn for_mode(root: &Path, mode: Mode) -> Self {
        let dir = root.join(mode.name());
        ArtifactPaths {
            model: dir.join("model.json"),
            pitch_normalizer: dir.join("note_scaler.json"),
            duration_normalizer: dir.join("duration_scaler.json"),
            velocity_normalizer: dir.join("velocity_scaler.json"),
            corpus: dir.join("corpus.json"),
        }
    }
}

/// Everything the melody generator needs for one mode.
pub struct InferenceSession {
    mode: Mode,
    model: Box<dyn SequenceModel>,
    normalizers: FeatureNormalizers,
    corpus: ReferenceCorpus,
}

impl std::fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("mode", &self.mode)
            .field("normalizers", &self.normalizers)
            .field("corpus_events", &self.corpus.len())
            .finish_non_exhaustive()
    }
}

impl InferenceSession {
    /// Assemble a session from already-loaded parts.
    pub fn new(
        mode: Mode,
        model: Box<dyn SequenceModel>,
        normalizers: FeatureNormalizers,
        corpus: ReferenceCorpus,
    ) -> Self {
        InferenceSession {
            mode,
            model,
            normalizers,
            corpus,
        }
    }

    /// Load every artifact for `mode`. Any missing or malformed file fails
    /// the whole load.
    pub fn load(paths: &ArtifactPaths, mode: Mode) -> Result<Self, ArtifactLoadError> {
        let model = LstmModel::load(&paths.model)?;
        let normalizers = FeatureNormalizers {
            pitch: MinMaxNormalizer::load(&paths.pitch_normalizer)?,
            duration: MinMaxNormalizer::load(&paths.duration_normalizer)?,
            velocity: MinMaxNormalizer::load(&paths.velocity_normalizer)?,
        };
        let corpus = ReferenceCorpus::load(&paths.corpus)?;
        tracing::info!(%mode, corpus_events = corpus.len(), "inference session loaded");
        Ok(InferenceSession::new(mode, Box::new(model), normalizers, corpus))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn model(&self) -> &dyn SequenceModel {
        self.model.as_ref()
    }

    pub fn normalizers(&self) -> &FeatureNormalizers {
        &self.normalizers
    }

    pub fn corpus(&self) -> &ReferenceCorpus {
        &self.corpus
    }
}

/// Lazily loads and caches one session per mode.
#[derive(Debug)]
pub struct SessionRegistry {
    root: PathBuf,
    sessions: Mutex<HashMap<Mode, Arc<InferenceSession>>>,
}

impl SessionRegistry {
    /// A registry that loads from `root` on first use of each mode.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SessionRegistry {
            root: root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Install a session for its mode, replacing any cached one.
    pub fn insert(&self, session: InferenceSession) -> Arc<InferenceSession> {
        let session = Arc::new(session);
        self.lock().insert(session.mode(), Arc::clone(&session));
        session
    }

    /// The session for `mode`, loading it on first request. A failed load is
    /// not cached; the next request tries again from disk.
    ///
    /// Loading runs without the map lock held, so requests for cached modes
    /// never wait on a disk load. If two requests race to load the same mode,
    /// the first to finish is kept and both get it.
    pub fn get(&self, mode: Mode) -> Result<Arc<InferenceSession>, ArtifactLoadError> {
        if let Some(s) = self.lock().get(&mode) {
            return Ok(Arc::clone(s));
        }
        let paths = ArtifactPaths::for_mode(&self.root, mode);
        let loaded = Arc::new(InferenceSession::load(&paths, mode)?);
        let mut sessions = self.lock();
        let session = sessions.entry(mode).or_insert(loaded);
        Ok(Arc::clone(session))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Mode, Arc<InferenceSession>>> {
        // The map is only ever mutated by whole-value inserts, so a poisoned
        // lock still guards a consistent map.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
