//! Operator-driven enrollment of an unmatched face.
//!
//! ```text
//! Idle --Start--> CapturingName <--SwitchField--> CapturingGroup
//!                   |  Confirm (name, no group)       |  Confirm
//!                   +-------------------------------> Committing --> Idle
//! any --Cancel--> Idle
//! ```
//!
//! Nothing is written before `Committing`; the commit itself is one
//! transaction ([`FaceDb::enroll`]).

use std::fmt;

use serde_json::json;
use tracing::{debug, info, warn};
use visage_facedb::{Enrolled, FaceDb, Metadata, NewIdentity, NewReferenceImage};

use crate::error::FaceIdError;

/// Where the enrollment workflow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnrollState {
    #[default]
    Idle,
    CapturingName,
    CapturingGroup,
    Committing,
}

impl EnrollState {
    /// Returns true while operator input is being collected.
    pub fn is_capturing(&self) -> bool {
        matches!(self, EnrollState::CapturingName | EnrollState::CapturingGroup)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollState::Idle => "idle",
            EnrollState::CapturingName => "capturing_name",
            EnrollState::CapturingGroup => "capturing_group",
            EnrollState::Committing => "committing",
        }
    }
}

impl fmt::Display for EnrollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unmatched observation an enrollment will store.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub vector: Vec<f32>,
    pub quality: Option<f32>,
    /// Encoded reference picture (e.g. JPEG bytes of the frame).
    pub image: Vec<u8>,
}

/// Discrete operator events.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollEvent {
    Start(Capture),
    SwitchField,
    Char(char),
    Backspace,
    Confirm,
    Cancel,
}

/// The enrollment state machine.
pub struct Enrollment {
    state: EnrollState,
    name: String,
    group: String,
    capture: Option<Capture>,
    image_type: String,
}

impl Enrollment {
    /// `image_type` tags the stored reference image (e.g. "front").
    pub fn new(image_type: impl Into<String>) -> Self {
        Self {
            state: EnrollState::Idle,
            name: String::new(),
            group: String::new(),
            capture: None,
            image_type: image_type.into(),
        }
    }

    pub fn state(&self) -> EnrollState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Applies one event.
    ///
    /// Returns the stored rows when the event completed a commit. An empty
    /// name on confirm yields [`FaceIdError::EmptyName`] and leaves the state
    /// unchanged. If the commit itself fails the buffers are kept and the
    /// workflow goes back to `CapturingGroup`, so the operator can retry or
    /// cancel.
    pub fn handle(
        &mut self,
        event: EnrollEvent,
        db: &FaceDb,
    ) -> Result<Option<Enrolled>, FaceIdError> {
        debug!(state = %self.state, event = ?event_name(&event), "enrollment event");

        if event == EnrollEvent::Cancel {
            if self.state != EnrollState::Idle {
                info!(state = %self.state, "enrollment cancelled");
            }
            self.reset();
            return Ok(None);
        }

        match (self.state, event) {
            (EnrollState::Idle, EnrollEvent::Start(capture)) => {
                self.reset();
                self.capture = Some(capture);
                self.state = EnrollState::CapturingName;
                Ok(None)
            }
            (EnrollState::Idle, _) | (_, EnrollEvent::Start(_)) => Ok(None),

            (EnrollState::CapturingName, EnrollEvent::SwitchField) => {
                self.state = EnrollState::CapturingGroup;
                Ok(None)
            }
            (EnrollState::CapturingGroup, EnrollEvent::SwitchField) => {
                self.state = EnrollState::CapturingName;
                Ok(None)
            }

            (state, EnrollEvent::Char(c)) if state.is_capturing() => {
                if !c.is_control() {
                    self.buffer_mut().push(c);
                }
                Ok(None)
            }
            (state, EnrollEvent::Backspace) if state.is_capturing() => {
                self.buffer_mut().pop();
                Ok(None)
            }

            (EnrollState::CapturingName, EnrollEvent::Confirm) => {
                if self.name.trim().is_empty() {
                    return Err(FaceIdError::EmptyName);
                }
                if self.group.trim().is_empty() {
                    // Offer an optional group before committing.
                    self.state = EnrollState::CapturingGroup;
                    return Ok(None);
                }
                self.commit(db).map(Some)
            }
            (EnrollState::CapturingGroup, EnrollEvent::Confirm) => {
                if self.name.trim().is_empty() {
                    return Err(FaceIdError::EmptyName);
                }
                self.commit(db).map(Some)
            }

            _ => Ok(None),
        }
    }

    fn buffer_mut(&mut self) -> &mut String {
        if self.state == EnrollState::CapturingGroup {
            &mut self.group
        } else {
            &mut self.name
        }
    }

    fn commit(&mut self, db: &FaceDb) -> Result<Enrolled, FaceIdError> {
        let Some(capture) = self.capture.as_ref() else {
            self.reset();
            return Err(FaceIdError::NoObservation);
        };
        self.state = EnrollState::Committing;

        let mut identity = NewIdentity::new(self.name.trim());
        let group = self.group.trim();
        if !group.is_empty() {
            identity = identity.with_group(group);
        }
        let mut metadata = Metadata::new();
        if let Some(q) = capture.quality {
            metadata.insert("quality".into(), json!(q));
        }
        let image = NewReferenceImage {
            data: capture.image.clone(),
            image_type: self.image_type.clone(),
            metadata,
        };

        match db.enroll(&identity, &capture.vector, capture.quality, &image) {
            Ok(enrolled) => {
                self.reset();
                Ok(enrolled)
            }
            Err(e) => {
                warn!(error = %e, name = %self.name, "enrollment commit failed");
                self.state = EnrollState::CapturingGroup;
                Err(e.into())
            }
        }
    }

    fn reset(&mut self) {
        self.state = EnrollState::Idle;
        self.name.clear();
        self.group.clear();
        self.capture = None;
    }
}

fn event_name(event: &EnrollEvent) -> &'static str {
    match event {
        EnrollEvent::Start(_) => "start",
        EnrollEvent::SwitchField => "switch_field",
        EnrollEvent::Char(_) => "char",
        EnrollEvent::Backspace => "backspace",
        EnrollEvent::Confirm => "confirm",
        EnrollEvent::Cancel => "cancel",
    }
}
