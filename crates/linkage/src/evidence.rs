use std::collections::BTreeMap;

use crate::model::{ComparisonVector, LinkageSummary, MatchedPair, FEATURE_LABELS};
use crate::normalize::NormalizedDataset;

/// Compute summary statistics for one linkage run.
pub fn compute_summary(
    facility: &NormalizedDataset,
    hdss: &NormalizedDataset,
    vectors: &[ComparisonVector],
    matches: &[MatchedPair],
) -> LinkageSummary {
    let mut agreement_counts: BTreeMap<String, usize> =
        FEATURE_LABELS.iter().map(|l| (l.to_string(), 0)).collect();

    for v in vectors {
        for (label, score) in FEATURE_LABELS.iter().zip(v.scores.as_array()) {
            if score > 0.0 {
                *agreement_counts.entry(label.to_string()).or_insert(0) += 1;
            }
        }
    }

    LinkageSummary {
        facility_records: facility.records.len(),
        hdss_records: hdss.records.len(),
        candidate_pairs: vectors.len(),
        matched: matches.len(),
        facility_unknown_dob: facility.unknown_dob,
        hdss_unknown_dob: hdss.unknown_dob,
        agreement_counts,
    }
}
