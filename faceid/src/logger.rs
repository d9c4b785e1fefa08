use tracing::{debug, warn};
use visage_facedb::{FaceDb, NewDetection};

/// Writes detection logs without ever failing the caller.
///
/// Storage errors are logged, counted and kept as [`Self::last_error`];
/// [`Self::log`] only reports success as a bool.
#[derive(Debug, Default)]
pub struct DetectionLogger {
    failures: u64,
    last_error: Option<String>,
}

impl DetectionLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one detection. Returns false if it could not be stored.
    pub fn log(&mut self, db: &FaceDb, identity_id: u64, detection: &NewDetection) -> bool {
        match db.log_detection(identity_id, detection) {
            Ok(log) => {
                debug!(
                    identity_id,
                    log_id = log.id,
                    confidence = log.confidence,
                    "detection logged"
                );
                true
            }
            Err(e) => {
                warn!(identity_id, error = %e, "failed to log detection");
                self.failures += 1;
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Number of detections that could not be stored.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
