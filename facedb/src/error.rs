use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceDbError {
    #[error("facedb: name must not be empty")]
    EmptyName,

    #[error("facedb: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("facedb: {field} out of range [0, 1]: {value}")]
    OutOfRange { field: &'static str, value: f32 },

    #[error("facedb: identity {0} not found")]
    NotFound(u64),

    #[error("facedb: storage error: {0}")]
    Storage(String),

    #[error("facedb: serialization error: {0}")]
    Serialization(String),
}

impl FaceDbError {
    /// Input was rejected before anything was written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FaceDbError::EmptyName
                | FaceDbError::DimensionMismatch { .. }
                | FaceDbError::OutOfRange { .. }
        )
    }
}

impl From<visage_kv::KVError> for FaceDbError {
    fn from(e: visage_kv::KVError) -> Self {
        FaceDbError::Storage(e.to_string())
    }
}
