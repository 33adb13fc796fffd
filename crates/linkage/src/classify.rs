use crate::model::{ComparisonVector, FieldScores, MatchedPair};

/// Threshold-sum rule: a pair matches when its scores add up to at least
/// `min_agreements`. Ties at the cutoff match.
pub fn is_match(scores: &FieldScores, min_agreements: f64) -> bool {
    scores.sum() >= min_agreements
}

/// Keep the matching pairs, in the order the comparator produced them.
pub fn classify(vectors: &[ComparisonVector], min_agreements: f64) -> Vec<MatchedPair> {
    vectors
        .iter()
        .filter(|v| is_match(&v.scores, min_agreements))
        .map(|v| MatchedPair {
            pair: v.pair,
            scores: v.scores,
            total: v.scores.sum(),
        })
        .collect()
}
