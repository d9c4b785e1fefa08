use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque key/value metadata. Stored as-is and never inspected.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// An enrolled person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,

    /// Display name, never empty.
    pub name: String,

    /// False once soft-deleted.
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,

    /// Names of the groups this identity belongs to, in group creation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Stored form of an [`Identity`]. Membership lives in separate keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersonRecord {
    #[serde(rename = "id")]
    pub id: u64,
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "active")]
    pub is_active: bool,
    #[serde(rename = "notes", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "meta", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
    #[serde(rename = "ct")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "ut", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PersonRecord {
    pub(crate) fn into_identity(self, groups: Vec<String>) -> Identity {
        Identity {
            id: self.id,
            name: self.name,
            is_active: self.is_active,
            notes: self.notes,
            metadata: self.metadata,
            groups,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A named set of identities. Names are unique and case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A face encoding owned by one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub id: u64,
    pub identity_id: u64,
    pub vector: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A stored reference picture of an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub id: u64,
    pub identity_id: u64,
    pub data: Vec<u8>,
    /// e.g. "front".
    pub image_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Face position in normalized frame coordinates, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One recognition event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionLog {
    pub id: u64,
    pub identity_id: u64,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_quality: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: Metadata,
    pub detected_at: DateTime<Utc>,
}

/// Aggregate over an identity's detection logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub count: u64,
    pub avg_confidence: f64,
    /// Averaged over logs that carry a frame quality; 0 if none do.
    pub avg_frame_quality: f64,
}

/// Input for creating an identity.
#[derive(Debug, Clone, Default)]
pub struct NewIdentity {
    pub name: String,
    pub groups: Vec<String>,
    pub notes: Option<String>,
    pub metadata: Metadata,
}

impl NewIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

/// Partial update. `None` fields are left unchanged; `groups`, when set,
/// replaces the whole membership set.
#[derive(Debug, Clone, Default)]
pub struct IdentityUpdate {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<Metadata>,
    pub groups: Option<Vec<String>>,
}

/// Input for storing a reference image.
#[derive(Debug, Clone)]
pub struct NewReferenceImage {
    pub data: Vec<u8>,
    pub image_type: String,
    pub metadata: Metadata,
}

impl NewReferenceImage {
    pub fn new(data: Vec<u8>, image_type: impl Into<String>) -> Self {
        Self {
            data,
            image_type: image_type.into(),
            metadata: Metadata::new(),
        }
    }
}

/// Input for logging a detection.
#[derive(Debug, Clone, Default)]
pub struct NewDetection {
    pub confidence: f32,
    pub frame_quality: Option<f32>,
    pub location: Option<Location>,
    pub environment: Metadata,
}

impl NewDetection {
    pub fn new(confidence: f32) -> Self {
        Self {
            confidence,
            ..Default::default()
        }
    }
}

/// Everything written by one enrollment commit.
#[derive(Debug, Clone)]
pub struct Enrolled {
    pub identity: Identity,
    pub encoding: Encoding,
    pub image: ReferenceImage,
}

/// An active encoding of an active identity, joined with the display name.
#[derive(Debug, Clone)]
pub struct KnownEncoding {
    pub identity_id: u64,
    pub encoding_id: u64,
    pub name: String,
    pub vector: Vec<f32>,
}

/// An encoding whose length differs from the configured dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidEncoding {
    pub identity_id: u64,
    pub encoding_id: u64,
    pub len: usize,
}

/// Result of [`crate::FaceDb::verify_encodings`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct EncodingReport {
    pub dim: usize,
    pub total: usize,
    pub invalid: Vec<InvalidEncoding>,
}

impl EncodingReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}
