use chrono::Utc;

use crate::db::{FaceDb, check_unit, decode, encode};
use crate::error::FaceDbError;
use crate::keys::{detection_key, detection_prefix};
use crate::types::{DetectionLog, DetectionStats, NewDetection};

impl FaceDb {
    /// Records one recognition event for identity `identity_id`.
    ///
    /// Soft-deleted identities still accept logs, since a snapshot taken
    /// before the delete may keep matching them until it is refreshed.
    pub fn log_detection(
        &self,
        identity_id: u64,
        detection: &NewDetection,
    ) -> Result<DetectionLog, FaceDbError> {
        check_unit("confidence", detection.confidence)?;
        if let Some(q) = detection.frame_quality {
            check_unit("frame_quality", q)?;
        }

        self.write(|tx| {
            if self.load_person(&*tx, identity_id)?.is_none() {
                return Err(FaceDbError::NotFound(identity_id));
            }

            let id = self.next_id(tx, "detection")?;
            let detected_at = Utc::now();
            let log = DetectionLog {
                id,
                identity_id,
                confidence: detection.confidence,
                frame_quality: detection.frame_quality,
                location: detection.location,
                environment: detection.environment.clone(),
                detected_at,
            };
            let ts = detected_at.timestamp_nanos_opt().unwrap_or_default();
            tx.set(
                &detection_key(&self.prefix, identity_id, ts, id),
                &encode(&log)?,
            )?;
            Ok(log)
        })
    }

    /// Count and averages over every log of `identity_id`.
    /// All fields are zero when there are no logs.
    pub fn detection_stats(&self, identity_id: u64) -> Result<DetectionStats, FaceDbError> {
        let entries = self
            .store
            .scan(&detection_prefix(&self.prefix, identity_id))?;

        let mut count = 0u64;
        let mut confidence_sum = 0.0f64;
        let mut quality_sum = 0.0f64;
        let mut quality_count = 0u64;
        for (_, value) in entries {
            let log: DetectionLog = decode(&value)?;
            count += 1;
            confidence_sum += log.confidence as f64;
            if let Some(q) = log.frame_quality {
                quality_sum += q as f64;
                quality_count += 1;
            }
        }

        if count == 0 {
            return Ok(DetectionStats::default());
        }
        Ok(DetectionStats {
            count,
            avg_confidence: confidence_sum / count as f64,
            avg_frame_quality: if quality_count > 0 {
                quality_sum / quality_count as f64
            } else {
                0.0
            },
        })
    }

    /// The `limit` most recent logs of `identity_id`, newest first.
    pub fn recent_detections(
        &self,
        identity_id: u64,
        limit: usize,
    ) -> Result<Vec<DetectionLog>, FaceDbError> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let entries = self
            .store
            .scan(&detection_prefix(&self.prefix, identity_id))?;

        // KV scan is ascending by time; walk it backwards.
        entries
            .iter()
            .rev()
            .take(limit)
            .map(|(_, v)| decode(v))
            .collect()
    }
}
