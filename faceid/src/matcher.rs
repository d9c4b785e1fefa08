use serde::Serialize;

use crate::store::Snapshot;

/// An accepted match against a snapshot entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub name: String,
    /// `1 - euclidean distance`.
    pub confidence: f32,
    pub identity_id: u64,
}

/// Nearest-neighbour search over a [`Snapshot`].
///
/// Stateless apart from the acceptance threshold, so one matcher can be
/// shared by any number of readers.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    threshold: f32,
}

impl Matcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Returns the closest entry if its confidence reaches the threshold.
    ///
    /// A missing query, an empty snapshot or a query whose length differs
    /// from the snapshot dimension all yield `None`. When several entries
    /// share the minimal distance the first one in snapshot order wins.
    pub fn best_match(&self, snapshot: &Snapshot, query: Option<&[f32]>) -> Option<Match> {
        let query = query?;
        if snapshot.is_empty() || query.len() != snapshot.dim() {
            return None;
        }

        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;
        for (i, entry) in snapshot.entries().iter().enumerate() {
            let d = euclidean(query, &entry.vector);
            if d < best_dist {
                best_dist = d;
                best_idx = Some(i);
            }
        }

        let idx = best_idx?;
        let confidence = 1.0 - best_dist;
        if confidence < self.threshold {
            return None;
        }
        let entry = &snapshot.entries()[idx];
        Some(Match {
            name: entry.name.clone(),
            confidence,
            identity_id: entry.identity_id,
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_THRESHOLD)
    }
}

/// Euclidean distance between two vectors.
/// Uses f64 intermediate precision.
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    sum.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_facedb::KnownEncoding;

    fn entry(id: u64, name: &str, vector: Vec<f32>) -> KnownEncoding {
        KnownEncoding {
            identity_id: id,
            encoding_id: id,
            name: name.into(),
            vector,
        }
    }

    #[test]
    fn exact_vector_has_full_confidence() {
        let snap = Snapshot::new(2, vec![entry(1, "A", vec![0.1, 0.7])]);
        let m = Matcher::default()
            .best_match(&snap, Some(&[0.1, 0.7]))
            .unwrap();
        assert_eq!(m.confidence, 1.0);
        assert_eq!(m.identity_id, 1);
    }

    #[test]
    fn no_match_cases() {
        let matcher = Matcher::default();
        let empty = Snapshot::new(2, vec![]);
        assert!(matcher.best_match(&empty, Some(&[0.0, 0.0])).is_none());

        let snap = Snapshot::new(2, vec![entry(1, "A", vec![0.0, 0.0])]);
        assert!(matcher.best_match(&snap, None).is_none());
        assert!(matcher.best_match(&snap, Some(&[0.0, 0.0, 0.0])).is_none());
        // distance 0.5 -> confidence 0.5
        assert!(matcher.best_match(&snap, Some(&[0.3, 0.4])).is_none());
    }

    #[test]
    fn picks_nearest_entry() {
        let snap = Snapshot::new(
            2,
            vec![entry(1, "A", vec![1.0, 1.0]), entry(2, "B", vec![0.0, 0.1])],
        );
        let m = Matcher::default().best_match(&snap, Some(&[0.0, 0.0])).unwrap();
        assert_eq!(m.name, "B");
        assert!((m.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn ties_go_to_first_entry() {
        let snap = Snapshot::new(
            2,
            vec![
                entry(1, "A", vec![0.1, 0.0]),
                entry(2, "B", vec![-0.1, 0.0]),
                entry(3, "C", vec![0.1, 0.0]),
            ],
        );
        let m = Matcher::default().best_match(&snap, Some(&[0.0, 0.0])).unwrap();
        assert_eq!(m.identity_id, 1);
    }

    #[test]
    fn threshold_is_configurable() {
        let snap = Snapshot::new(2, vec![entry(1, "A", vec![0.0, 0.0])]);
        let query: &[f32] = &[0.3, 0.4];
        assert!(Matcher::new(0.6).best_match(&snap, Some(query)).is_none());
        assert!(Matcher::new(0.4).best_match(&snap, Some(query)).is_some());
    }

    #[test]
    fn confidence_equal_to_threshold_is_accepted() {
        let snap = Snapshot::new(2, vec![entry(1, "A", vec![0.0, 0.0])]);
        let matcher = Matcher::new(0.6);
        for query in [[0.0f32, 0.4], [0.4, 0.0], [0.24, 0.32]] {
            let m = matcher.best_match(&snap, Some(&query)).unwrap();
            assert!((m.confidence - 0.6).abs() < 1e-6);
        }
        assert!(Matcher::new(0.61).best_match(&snap, Some(&[0.0, 0.4])).is_none());
    }

    #[test]
    fn snapshot_drops_wrong_lengths() {
        let snap = Snapshot::new(
            2,
            vec![entry(1, "A", vec![0.0, 0.0]), entry(2, "B", vec![0.0; 3])],
        );
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn euclidean_basics() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean(&[0.1, 0.2], &[0.1, 0.2]), 0.0);
    }

    #[test]
    fn default_threshold() {
        assert_eq!(Matcher::default().threshold(), 0.6);
        let mut m = Matcher::default();
        m.set_threshold(0.9);
        assert_eq!(m.threshold(), 0.9);
    }
}
