//! Face identity matching and enrollment.
//!
//! Builds on [`visage_facedb`]:
//!
//! - [`EncodingStore`] keeps an immutable [`Snapshot`] of every matchable
//!   encoding and swaps it whole on refresh.
//! - [`Matcher`] finds the nearest snapshot entry by Euclidean distance and
//!   accepts it when `1 - distance` reaches the threshold.
//! - [`DetectionLogger`] records matches without failing the caller.
//! - [`Enrollment`] is the operator-driven state machine that turns an
//!   unmatched face into a stored identity.
//! - [`Recognizer`] ties them together per observation.
//!
//! # Example
//!
//! ```no_run
//! use visage_faceid::{Config, Observation, Recognition, Recognizer};
//!
//! let cfg = Config::default().from_env();
//! let mut rec = Recognizer::open(&cfg)?;
//! let obs = Observation {
//!     encoding: Some(vec![0.0; cfg.dim]),
//!     ..Default::default()
//! };
//! if let Recognition::Known { matched, .. } = rec.observe(obs) {
//!     println!("{} ({:.2})", matched.name, matched.confidence);
//! }
//! # Ok::<(), visage_faceid::FaceIdError>(())
//! ```

pub mod config;
mod enrollment;
mod error;
mod logger;
mod matcher;
mod recognizer;
mod store;

pub use config::Config;
pub use enrollment::{Capture, EnrollEvent, EnrollState, Enrollment};
pub use error::FaceIdError;
pub use logger::DetectionLogger;
pub use matcher::{Match, Matcher, euclidean};
pub use recognizer::{Observation, Recognition, Recognizer};
pub use store::{EncodingStore, Snapshot};

#[cfg(test)]
mod tests;
