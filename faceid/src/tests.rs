use std::sync::Arc;

use tempfile::tempdir;
use visage_facedb::{DEFAULT_DIM, FaceDb, Location, NewDetection, NewIdentity, NewReferenceImage};
use visage_kv::MemoryStore;

use crate::{Config, EnrollEvent, EnrollState, FaceIdError, Observation, Recognition, Recognizer};

fn config() -> Config {
    Config {
        prompt_after_unknown: 3,
        ..Config::default()
    }
}

fn recognizer() -> Recognizer {
    let db = Arc::new(FaceDb::new(Box::new(MemoryStore::new()), "fr", DEFAULT_DIM));
    Recognizer::new(db, &config()).unwrap()
}

fn filled(v: f32) -> Vec<f32> {
    vec![v; DEFAULT_DIM]
}

fn seen(encoding: Vec<f32>) -> Observation {
    Observation {
        encoding: Some(encoding),
        location: Some(Location {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.4,
        }),
        frame_quality: Some(0.7),
        image: vec![0xff, 0xd8],
    }
}

fn enroll_alice(rec: &Recognizer) -> u64 {
    let enrolled = rec
        .db()
        .enroll(
            &NewIdentity::new("Alice"),
            &filled(0.1),
            Some(0.9),
            &NewReferenceImage::new(vec![1], "front"),
        )
        .unwrap();
    rec.refresh().unwrap();
    enrolled.identity.id
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[test]
fn exact_vector_matches_with_full_confidence() {
    let mut rec = recognizer();
    let alice = enroll_alice(&rec);

    match rec.observe(seen(filled(0.1))) {
        Recognition::Known { matched, logged } => {
            assert_eq!(matched.name, "Alice");
            assert_eq!(matched.confidence, 1.0);
            assert_eq!(matched.identity_id, alice);
            assert!(logged);
        }
        other => panic!("expected a match, got {other:?}"),
    }

    let logs = rec.db().recent_detections(alice, 10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].frame_quality, Some(0.7));
    assert!(logs[0].location.is_some());
    assert!(logs[0].environment.contains_key("face_size"));
}

#[test]
fn distant_vector_is_unknown() {
    let mut rec = recognizer();
    let alice = enroll_alice(&rec);

    let mut query = filled(0.1);
    query[0] += 0.5;
    assert!(matches!(
        rec.observe(seen(query)),
        Recognition::Unknown { streak: 1, .. }
    ));
    assert_eq!(rec.stats(alice).unwrap().count, 0);
}

#[test]
fn soft_deleted_identity_stops_matching_after_refresh() {
    let mut rec = recognizer();
    let alice = enroll_alice(&rec);

    assert!(rec.db().soft_delete(alice).unwrap());
    // Still in the old snapshot.
    assert!(matches!(rec.observe(seen(filled(0.1))), Recognition::Known { .. }));

    rec.refresh().unwrap();
    assert!(matches!(rec.observe(seen(filled(0.1))), Recognition::Unknown { .. }));
    // History survives the delete.
    assert_eq!(rec.stats(alice).unwrap().count, 1);
}

#[test]
fn no_face_leaves_streak_alone() {
    let mut rec = recognizer();
    rec.observe(seen(filled(0.9)));
    assert_eq!(rec.observe(Observation::default()), Recognition::NoFace);
    assert_eq!(rec.unknown_streak(), 1);
}

#[test]
fn match_at_threshold_is_accepted() {
    let mut rec = recognizer();
    let alice = enroll_alice(&rec);

    // Distance 0.4 along one axis: confidence exactly 0.6.
    let mut query = filled(0.1);
    query[3] += 0.4;
    match rec.observe(seen(query)) {
        Recognition::Known { matched, .. } => {
            assert_eq!(matched.identity_id, alice);
            assert!((matched.confidence - 0.6).abs() < 1e-6);
        }
        other => panic!("expected a match at the threshold, got {other:?}"),
    }
}

#[test]
fn prompt_after_consecutive_unknowns() {
    let mut rec = recognizer();
    enroll_alice(&rec);

    let prompts: Vec<bool> = (0..4)
        .map(|_| match rec.observe(seen(filled(0.9))) {
            Recognition::Unknown {
                prompt_enrollment, ..
            } => prompt_enrollment,
            other => panic!("expected unknown, got {other:?}"),
        })
        .collect();
    assert_eq!(prompts, vec![false, false, true, true]);

    // A match resets the streak.
    rec.observe(seen(filled(0.1)));
    assert_eq!(rec.unknown_streak(), 0);
}

#[test]
fn dismissed_prompt_starts_over() {
    let mut rec = recognizer();
    for _ in 0..3 {
        rec.observe(seen(filled(0.9)));
    }
    rec.dismiss_prompt();
    assert_eq!(rec.unknown_streak(), 0);
    assert!(matches!(
        rec.observe(seen(filled(0.9))),
        Recognition::Unknown {
            streak: 1,
            prompt_enrollment: false
        }
    ));
}

#[test]
fn cancel_dismisses_prompt() {
    let mut rec = recognizer();
    for _ in 0..3 {
        rec.observe(seen(filled(0.9)));
    }
    rec.start_enrollment().unwrap();
    rec.enrollment_event(EnrollEvent::Cancel).unwrap();

    assert_eq!(rec.unknown_streak(), 0);
    assert!(matches!(
        rec.observe(seen(filled(0.9))),
        Recognition::Unknown {
            prompt_enrollment: false,
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// Enrollment
// ---------------------------------------------------------------------------

#[test]
fn enrollment_without_unknown_face_fails() {
    let mut rec = recognizer();
    let err = rec.start_enrollment().unwrap_err();
    assert!(matches!(err, FaceIdError::NoObservation));
    assert_eq!(rec.enrollment_state(), EnrollState::Idle);
}

#[test]
fn enrollment_needs_the_current_frame_unmatched() {
    let mut rec = recognizer();
    enroll_alice(&rec);

    rec.observe(seen(filled(0.9)));
    assert!(matches!(rec.observe(seen(filled(0.1))), Recognition::Known { .. }));
    assert!(matches!(
        rec.start_enrollment().unwrap_err(),
        FaceIdError::NoObservation
    ));

    rec.observe(seen(filled(0.9)));
    rec.observe(Observation::default());
    assert!(matches!(
        rec.start_enrollment().unwrap_err(),
        FaceIdError::NoObservation
    ));
    assert_eq!(rec.enrollment_state(), EnrollState::Idle);
}

#[test]
fn enroll_name_only_then_match() {
    let mut rec = recognizer();
    rec.observe(seen(filled(0.3)));

    rec.start_enrollment().unwrap();
    assert_eq!(rec.enrollment_state(), EnrollState::CapturingName);
    rec.enrollment_event(EnrollEvent::Char('B')).unwrap();
    rec.enrollment_event(EnrollEvent::Char('o')).unwrap();
    assert!(rec.enrollment_event(EnrollEvent::Confirm).unwrap().is_none());
    assert_eq!(rec.enrollment_state(), EnrollState::CapturingGroup);
    assert_eq!(rec.enrollment().name(), "Bo");

    let enrolled = rec.enrollment_event(EnrollEvent::Confirm).unwrap().unwrap();
    assert_eq!(rec.enrollment_state(), EnrollState::Idle);

    let bo = rec.db().get_identity_by_name("Bo").unwrap().unwrap();
    assert_eq!(bo.id, enrolled.identity.id);
    assert!(bo.groups.is_empty());
    assert_eq!(rec.db().get_encodings(bo.id).unwrap().len(), 1);
    let images = rec.db().reference_images(bo.id).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].image_type, "front");
    assert_eq!(images[0].data, vec![0xff, 0xd8]);

    // Matchable without a manual refresh.
    match rec.observe(seen(filled(0.3))) {
        Recognition::Known { matched, .. } => assert_eq!(matched.name, "Bo"),
        other => panic!("expected Bo, got {other:?}"),
    }
}

#[test]
fn enroll_with_group() {
    let mut rec = recognizer();
    rec.observe(seen(filled(0.4)));

    rec.start_enrollment().unwrap();
    for c in "Cy".chars() {
        rec.enrollment_event(EnrollEvent::Char(c)).unwrap();
    }
    rec.enrollment_event(EnrollEvent::SwitchField).unwrap();
    for c in "Staff".chars() {
        rec.enrollment_event(EnrollEvent::Char(c)).unwrap();
    }
    let enrolled = rec.enrollment_event(EnrollEvent::Confirm).unwrap().unwrap();
    assert_eq!(enrolled.identity.groups, vec!["Staff"]);
    assert_eq!(
        rec.db().list_identities_by_group("Staff").unwrap()[0].name,
        "Cy"
    );
}

#[test]
fn cancelled_enrollment_writes_nothing() {
    let mut rec = recognizer();
    rec.observe(seen(filled(0.4)));
    rec.start_enrollment().unwrap();
    rec.enrollment_event(EnrollEvent::Char('X')).unwrap();
    rec.enrollment_event(EnrollEvent::Cancel).unwrap();

    assert_eq!(rec.enrollment_state(), EnrollState::Idle);
    assert!(rec.db().list_identities(true).unwrap().is_empty());
    assert!(rec.snapshot().is_empty());
}

// ---------------------------------------------------------------------------
// Stats and persistence
// ---------------------------------------------------------------------------

#[test]
fn stats_average_confidence() {
    let rec = recognizer();
    let alice = enroll_alice(&rec);
    for c in [0.6, 0.8, 1.0] {
        rec.db().log_detection(alice, &NewDetection::new(c)).unwrap();
    }
    let stats = rec.stats(alice).unwrap();
    assert_eq!(stats.count, 3);
    assert!((stats.avg_confidence - 0.8).abs() < 1e-6);
}

#[test]
fn mismatched_dim_is_a_config_error() {
    let db = Arc::new(FaceDb::new(Box::new(MemoryStore::new()), "fr", 4));
    let err = Recognizer::new(db, &config()).err().unwrap();
    assert!(matches!(err, FaceIdError::Config(_)));
}

#[test]
fn open_from_config_persists_enrollments() {
    let dir = tempdir().unwrap();
    let cfg = Config {
        dim: 4,
        ..config()
    }
    .with_db_path_override(Some(dir.path().join("faces.redb").display().to_string()));

    {
        let mut rec = Recognizer::open(&cfg).unwrap();
        rec.observe(seen(vec![0.2; 4]));
        rec.start_enrollment().unwrap();
        rec.enrollment_event(EnrollEvent::Char('D')).unwrap();
        rec.enrollment_event(EnrollEvent::Confirm).unwrap();
        rec.enrollment_event(EnrollEvent::Confirm).unwrap().unwrap();
    }

    let mut rec = Recognizer::open(&cfg).unwrap();
    assert_eq!(rec.snapshot().len(), 1);
    assert!(matches!(
        rec.observe(seen(vec![0.2; 4])),
        Recognition::Known { .. }
    ));
}
