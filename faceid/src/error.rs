use thiserror::Error;
use visage_facedb::FaceDbError;

/// Errors returned by faceid operations.
#[derive(Debug, Error)]
pub enum FaceIdError {
    #[error("faceid: {0}")]
    Db(#[from] FaceDbError),

    #[error("faceid: config error: {0}")]
    Config(String),

    #[error("faceid: a name is required before committing")]
    EmptyName,

    #[error("faceid: no unmatched face to enroll")]
    NoObservation,
}
