use crate::shared::geometry::FaceBox;

/// Expression name/score pairs in the engine's enumeration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionScores {
    scores: Vec<(String, f64)>,
}

impl ExpressionScores {
    pub fn new(scores: Vec<(String, f64)>) -> Self {
        Self { scores }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Highest-scoring expression. Ties go to the one enumerated first, and
    /// only strictly positive scores count.
    pub fn dominant(&self) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (name, score) in self.iter() {
            let current = best.map_or(0.0, |(_, s)| s);
            if score > current {
                best = Some((name, score));
            }
        }
        best.map(|(name, _)| name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenderEstimate {
    pub label: String,
    pub probability: f64,
}

/// Engine output for one face, converted at the engine boundary.
///
/// Every attribute beyond the box and score is best-effort: a backend that
/// lacks a sub-model leaves it empty.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    /// Source-frame pixels.
    pub bbox: FaceBox,
    pub score: f64,
    pub landmarks: Vec<(f64, f64)>,
    pub expressions: ExpressionScores,
    pub age: Option<f64>,
    pub gender: Option<GenderEstimate>,
    pub descriptor: Option<Vec<f32>>,
}

impl FaceObservation {
    /// Observation with only geometry filled in.
    pub fn new(bbox: FaceBox, score: f64) -> Self {
        Self {
            bbox,
            score,
            landmarks: Vec::new(),
            expressions: ExpressionScores::default(),
            age: None,
            gender: None,
            descriptor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> ExpressionScores {
        ExpressionScores::new(pairs.iter().map(|(n, s)| (n.to_string(), *s)).collect())
    }

    #[test]
    fn test_dominant_picks_max() {
        let s = scores(&[("neutral", 0.1), ("happy", 0.7), ("sad", 0.2)]);
        assert_eq!(s.dominant(), Some("happy"));
    }

    #[test]
    fn test_dominant_tie_goes_to_first() {
        let s = scores(&[("angry", 0.4), ("surprised", 0.4), ("neutral", 0.2)]);
        assert_eq!(s.dominant(), Some("angry"));
    }

    #[test]
    fn test_dominant_empty_is_none() {
        assert_eq!(ExpressionScores::default().dominant(), None);
    }

    #[test]
    fn test_dominant_ignores_zero_scores() {
        let s = scores(&[("neutral", 0.0), ("happy", 0.0)]);
        assert_eq!(s.dominant(), None);
    }
}
