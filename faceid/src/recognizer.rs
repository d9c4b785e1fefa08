use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};
use visage_facedb::{DetectionStats, Enrolled, FaceDb, Location, Metadata, NewDetection};

use crate::config::Config;
use crate::enrollment::{Capture, EnrollEvent, EnrollState, Enrollment};
use crate::error::FaceIdError;
use crate::logger::DetectionLogger;
use crate::matcher::{Match, Matcher};
use crate::store::{EncodingStore, Snapshot};

/// One processed frame, as produced by the external face encoder.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    /// `None` when no face was found in the frame.
    pub encoding: Option<Vec<f32>>,
    pub location: Option<Location>,
    pub frame_quality: Option<f32>,
    /// Encoded frame, kept as the reference image if this face is enrolled.
    pub image: Vec<u8>,
}

/// Outcome of [`Recognizer::observe`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    NoFace,
    Known {
        matched: Match,
        /// Whether the detection log was written.
        logged: bool,
    },
    Unknown {
        /// Consecutive unknown observations, this one included.
        streak: u32,
        /// Set once the streak reaches `prompt_after_unknown` and no
        /// enrollment is in progress.
        prompt_enrollment: bool,
    },
}

/// Per-observation pipeline: match, log, count unknowns, enroll.
///
/// Owns the encoding snapshot and the enrollment workflow; the database is
/// shared.
pub struct Recognizer {
    db: Arc<FaceDb>,
    store: EncodingStore,
    matcher: Matcher,
    logger: DetectionLogger,
    enrollment: Enrollment,
    prompt_after: u32,
    unknown_streak: u32,
    last_unknown: Option<Capture>,
}

impl Recognizer {
    /// Builds a recognizer over `db` and loads the first snapshot.
    pub fn new(db: Arc<FaceDb>, config: &Config) -> Result<Self, FaceIdError> {
        config.validate()?;
        if db.dim() != config.dim {
            return Err(FaceIdError::Config(format!(
                "database dim {} does not match config dim {}",
                db.dim(),
                config.dim
            )));
        }
        let store = EncodingStore::new(config.dim);
        store.refresh(&db)?;
        Ok(Self {
            db,
            store,
            matcher: Matcher::new(config.match_threshold),
            logger: DetectionLogger::new(),
            enrollment: Enrollment::new(config.reference_image_type.clone()),
            prompt_after: config.prompt_after_unknown.max(1),
            unknown_streak: 0,
            last_unknown: None,
        })
    }

    /// Opens the configured database and builds a recognizer over it.
    pub fn open(config: &Config) -> Result<Self, FaceIdError> {
        let db = Arc::new(config.open_db()?);
        Self::new(db, config)
    }

    pub fn db(&self) -> &Arc<FaceDb> {
        &self.db
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn logger(&self) -> &DetectionLogger {
        &self.logger
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    pub fn unknown_streak(&self) -> u32 {
        self.unknown_streak
    }

    /// Reloads the snapshot from the database.
    pub fn refresh(&self) -> Result<usize, FaceIdError> {
        Ok(self.store.refresh(&self.db)?)
    }

    /// Processes one observation.
    ///
    /// Only an unmatched face can be enrolled afterwards; a match or an
    /// empty frame drops the pending capture.
    pub fn observe(&mut self, obs: Observation) -> Recognition {
        let Some(encoding) = obs.encoding else {
            self.last_unknown = None;
            return Recognition::NoFace;
        };

        let snapshot = self.store.snapshot();
        if let Some(matched) = self.matcher.best_match(&snapshot, Some(&encoding)) {
            self.unknown_streak = 0;
            self.last_unknown = None;
            let detection = NewDetection {
                confidence: matched.confidence.clamp(0.0, 1.0),
                frame_quality: obs.frame_quality,
                location: obs.location,
                environment: environment(obs.frame_quality, obs.location),
            };
            let logged = self.logger.log(&self.db, matched.identity_id, &detection);
            debug!(name = %matched.name, confidence = matched.confidence, "face recognized");
            return Recognition::Known { matched, logged };
        }

        self.unknown_streak = self.unknown_streak.saturating_add(1);
        self.last_unknown = Some(Capture {
            vector: encoding,
            quality: obs.frame_quality,
            image: obs.image,
        });
        let prompt_enrollment =
            self.unknown_streak >= self.prompt_after && self.enrollment.state() == EnrollState::Idle;
        if prompt_enrollment && self.unknown_streak == self.prompt_after {
            info!(streak = self.unknown_streak, "unknown face persists, enrollment suggested");
        }
        Recognition::Unknown {
            streak: self.unknown_streak,
            prompt_enrollment,
        }
    }

    pub fn enrollment_state(&self) -> EnrollState {
        self.enrollment.state()
    }

    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }

    /// Declines the enrollment prompt: the unknown streak starts over.
    pub fn dismiss_prompt(&mut self) {
        if self.unknown_streak > 0 {
            debug!(streak = self.unknown_streak, "enrollment prompt dismissed");
        }
        self.unknown_streak = 0;
    }

    /// Starts enrolling the current unmatched observation.
    pub fn start_enrollment(&mut self) -> Result<(), FaceIdError> {
        let capture = self.last_unknown.clone().ok_or(FaceIdError::NoObservation)?;
        self.enrollment.handle(EnrollEvent::Start(capture), &self.db)?;
        Ok(())
    }

    /// Forwards an operator event to the enrollment workflow.
    ///
    /// `Start` carries its own capture; use [`Self::start_enrollment`] to
    /// enroll the last unmatched observation instead.
    ///
    /// After a commit the snapshot is refreshed, so the new identity matches
    /// from the next observation on. A failed refresh is logged and leaves
    /// the old snapshot in place; the enrollment itself is already durable.
    /// `Cancel` also dismisses the prompt.
    pub fn enrollment_event(&mut self, event: EnrollEvent) -> Result<Option<Enrolled>, FaceIdError> {
        if event == EnrollEvent::Cancel {
            self.dismiss_prompt();
        }
        let enrolled = self.enrollment.handle(event, &self.db)?;
        if let Some(e) = &enrolled {
            self.unknown_streak = 0;
            self.last_unknown = None;
            if let Err(err) = self.store.refresh(&self.db) {
                warn!(id = e.identity.id, error = %err, "snapshot refresh after enrollment failed");
            }
        }
        Ok(enrolled)
    }

    pub fn stats(&self, identity_id: u64) -> Result<DetectionStats, FaceIdError> {
        Ok(self.db.detection_stats(identity_id)?)
    }
}

fn environment(frame_quality: Option<f32>, location: Option<Location>) -> Metadata {
    let mut env = Metadata::new();
    if let Some(q) = frame_quality {
        env.insert("lighting".into(), json!(q));
    }
    if let Some(loc) = location {
        env.insert("face_size".into(), json!(loc.width * loc.height));
    }
    env
}
