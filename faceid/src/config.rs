//! Recognition settings, loadable from YAML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use visage_facedb::{DEFAULT_DIM, FaceDb};

use crate::error::FaceIdError;

/// Environment variable that overrides [`Config::db_path`].
pub const DB_PATH_ENV: &str = "FACE_RECOGNITION_DB";

pub const DEFAULT_DB_PATH: &str = "face_recognition.db";
pub const DEFAULT_THRESHOLD: f32 = 0.6;
pub const DEFAULT_PROMPT_AFTER: u32 = 30;

/// Controls matching, enrollment and storage.
///
/// Zero or empty fields fall back to their defaults, so a partial YAML file
/// is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the redb database file.
    pub db_path: PathBuf,

    /// Prepended to every storage key.
    pub key_prefix: String,

    /// Encoding dimension. Default: 128.
    pub dim: usize,

    /// Minimum confidence (`1 - distance`) to accept a match. Default: 0.6.
    /// Higher = fewer false matches, more unknowns.
    pub match_threshold: f32,

    /// Consecutive unknown observations before enrollment is suggested.
    /// Default: 30.
    pub prompt_after_unknown: u32,

    /// Type tag stored with the enrollment reference image.
    pub reference_image_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            key_prefix: "fr".into(),
            dim: DEFAULT_DIM,
            match_threshold: DEFAULT_THRESHOLD,
            prompt_after_unknown: DEFAULT_PROMPT_AFTER,
            reference_image_type: "front".into(),
        }
    }
}

impl Config {
    /// Reads a YAML config file, fills defaults and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FaceIdError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            FaceIdError::Config(format!("read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parses YAML, fills defaults and validates.
    pub fn from_yaml(content: &str) -> Result<Self, FaceIdError> {
        let cfg: Config =
            serde_yaml::from_str(content).map_err(|e| FaceIdError::Config(e.to_string()))?;
        let cfg = cfg.with_defaults();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies `FACE_RECOGNITION_DB` if it is set.
    pub fn from_env(self) -> Self {
        self.with_db_path_override(std::env::var(DB_PATH_ENV).ok())
    }

    pub fn with_db_path_override(mut self, path: Option<String>) -> Self {
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            self.db_path = PathBuf::from(path);
        }
        self
    }

    pub fn with_defaults(mut self) -> Self {
        let d = Self::default();
        if self.db_path.as_os_str().is_empty() {
            self.db_path = d.db_path;
        }
        if self.key_prefix.is_empty() {
            self.key_prefix = d.key_prefix;
        }
        if self.dim == 0 {
            self.dim = d.dim;
        }
        if self.match_threshold == 0.0 {
            self.match_threshold = d.match_threshold;
        }
        if self.prompt_after_unknown == 0 {
            self.prompt_after_unknown = d.prompt_after_unknown;
        }
        if self.reference_image_type.is_empty() {
            self.reference_image_type = d.reference_image_type;
        }
        self
    }

    pub fn validate(&self) -> Result<(), FaceIdError> {
        if !(self.match_threshold > 0.0 && self.match_threshold <= 1.0) {
            return Err(FaceIdError::Config(format!(
                "match_threshold must be in (0, 1], got {}",
                self.match_threshold
            )));
        }
        if self.dim == 0 {
            return Err(FaceIdError::Config("dim must be positive".into()));
        }
        Ok(())
    }

    /// Opens the configured database. Failure here is fatal for callers:
    /// nothing in the recognition pipeline runs without storage.
    pub fn open_db(&self) -> Result<FaceDb, FaceIdError> {
        Ok(FaceDb::open(&self.db_path, self.key_prefix.as_str(), self.dim)?)
    }
}
