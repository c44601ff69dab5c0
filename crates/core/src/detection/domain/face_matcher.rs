/// Reference descriptors enrolled for one identity.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledDescriptors {
    pub label: String,
    pub descriptors: Vec<Vec<f32>>,
}

impl LabeledDescriptors {
    pub fn new(label: impl Into<String>, descriptors: Vec<Vec<f32>>) -> Self {
        Self {
            label: label.into(),
            descriptors,
        }
    }
}

/// Closest enrolled label for a query. `label` is `None` when nothing is
/// within the threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct BestMatch {
    pub label: Option<String>,
    pub distance: f64,
}

/// Nearest-neighbour identity lookup over enrolled descriptors.
///
/// A label's distance to a query is the mean Euclidean distance to each of
/// its reference descriptors; the smallest wins if it is strictly below the
/// threshold.
#[derive(Clone, Debug)]
pub struct FaceMatcher {
    labeled: Vec<LabeledDescriptors>,
    threshold: f64,
}

impl FaceMatcher {
    /// Returns `None` if no label carries at least one descriptor, which
    /// callers treat as "recognition disabled".
    pub fn new(labeled: Vec<LabeledDescriptors>, threshold: f64) -> Option<Self> {
        let labeled: Vec<LabeledDescriptors> = labeled
            .into_iter()
            .filter(|l| !l.descriptors.is_empty())
            .collect();
        if labeled.is_empty() {
            return None;
        }
        Some(Self { labeled, threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labeled.iter().map(|l| l.label.as_str())
    }

    pub fn find_best_match(&self, descriptor: &[f32]) -> BestMatch {
        let mut best_label: Option<&str> = None;
        let mut best_distance = f64::INFINITY;
        for entry in &self.labeled {
            let total: f64 = entry
                .descriptors
                .iter()
                .map(|reference| euclidean_distance(reference, descriptor))
                .sum();
            let mean = total / entry.descriptors.len() as f64;
            if mean < best_distance {
                best_distance = mean;
                best_label = Some(&entry.label);
            }
        }

        BestMatch {
            label: best_label
                .filter(|_| best_distance < self.threshold)
                .map(str::to_string),
            distance: best_distance,
        }
    }
}

/// Distance over the common prefix of both vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matcher(threshold: f64) -> FaceMatcher {
        FaceMatcher::new(
            vec![
                LabeledDescriptors::new("chen", vec![vec![0.0, 0.0, 1.0]]),
                LabeledDescriptors::new("james", vec![vec![1.0, 0.0, 0.0], vec![0.8, 0.2, 0.0]]),
            ],
            threshold,
        )
        .unwrap()
    }

    #[test]
    fn test_euclidean_distance() {
        assert_relative_eq!(euclidean_distance(&[0.0, 3.0], &[4.0, 0.0]), 5.0);
        assert_relative_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_match_within_threshold() {
        let best = matcher(0.6).find_best_match(&[0.0, 0.1, 0.95]);
        assert_eq!(best.label.as_deref(), Some("chen"));
        assert!(best.distance < 0.6);
    }

    #[test]
    fn test_mean_distance_over_label_descriptors() {
        let best = matcher(0.6).find_best_match(&[1.0, 0.0, 0.0]);
        // (0 + sqrt(0.04 + 0.04)) / 2
        assert_relative_eq!(best.distance, 0.08f64.sqrt() / 2.0, epsilon = 1e-6);
        assert_eq!(best.label.as_deref(), Some("james"));
    }

    #[test]
    fn test_no_match_beyond_threshold_is_unknown() {
        let best = matcher(0.6).find_best_match(&[0.0, 1.0, 0.0]);
        assert!(best.label.is_none());
        assert!(best.distance >= 0.6);
    }

    #[test]
    fn test_distance_equal_to_threshold_is_unknown() {
        let m = FaceMatcher::new(vec![LabeledDescriptors::new("a", vec![vec![0.0]])], 0.5)
            .unwrap();
        assert!(m.find_best_match(&[0.5]).label.is_none());
    }

    #[test]
    fn test_empty_enrollment_disables_matcher() {
        assert!(FaceMatcher::new(vec![], 0.6).is_none());
        assert!(FaceMatcher::new(vec![LabeledDescriptors::new("x", vec![])], 0.6).is_none());
    }

    #[test]
    fn test_labels_without_descriptors_are_dropped() {
        let m = FaceMatcher::new(
            vec![
                LabeledDescriptors::new("empty", vec![]),
                LabeledDescriptors::new("kept", vec![vec![1.0]]),
            ],
            0.6,
        )
        .unwrap();
        assert_eq!(m.labels().collect::<Vec<_>>(), vec!["kept"]);
    }
}
