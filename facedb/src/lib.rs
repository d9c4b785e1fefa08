//! Persistence for enrolled face identities.
//!
//! [`FaceDb`] stores identities, groups, face encodings, reference images
//! and detection logs on top of a transactional [`visage_kv::KVStore`].
//! Rows are msgpack records under ordered keys (see [`keys`]); secondary
//! indexes are plain keys written in the same transaction as their row.
//!
//! # Lifecycle
//!
//! - [`FaceDb::enroll`] writes an identity, its first encoding and its first
//!   reference image in one transaction.
//! - [`FaceDb::soft_delete`] only flips the active flag. Inactive identities
//!   and their encodings disappear from lookups and from
//!   [`FaceDb::matchable_encodings`]; detection history is kept.
//! - Groups are get-or-create by unique name and are never deleted.

mod db;
mod detection;
mod encoding;
pub mod error;
mod identity;
pub mod keys;
pub mod types;

pub use db::{DEFAULT_DIM, FaceDb};
pub use error::FaceDbError;
pub use types::{
    DetectionLog, DetectionStats, Encoding, EncodingReport, Enrolled, Group, Identity,
    IdentityUpdate, InvalidEncoding, KnownEncoding, Location, Metadata, NewDetection,
    NewIdentity, NewReferenceImage, ReferenceImage,
};
