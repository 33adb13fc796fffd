use crate::config::{CompareConfig, StringMethod};
use crate::error::LinkageError;
use crate::model::{CandidatePair, ComparisonVector, FieldScores, Source};
use crate::normalize::{swap_month_day, Dob, NormalizedDataset, NormalizedRecord};

/// Similarity in [0, 1] between two normalized values. An empty value on
/// either side scores 0.
pub fn string_similarity(method: StringMethod, a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    match method {
        StringMethod::JaroWinkler => strsim::jaro_winkler(a, b),
        StringMethod::Jaro => strsim::jaro(a, b),
        StringMethod::Levenshtein => strsim::normalized_levenshtein(a, b),
        StringMethod::DamerauLevenshtein => strsim::normalized_damerau_levenshtein(a, b),
        StringMethod::Exact => {
            if a == b {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Collapse a similarity to an agreement flag. The threshold itself agrees.
pub fn agreement_flag(score: f64, threshold: f64) -> f64 {
    if score >= threshold {
        1.0
    } else {
        0.0
    }
}

/// 1 on exact equality, `swap_score` when the dates agree only after swapping
/// month and day, 0 otherwise. `Unknown` on either side is always 0.
pub fn compare_dob(a: Dob, b: Dob, swap_score: f64) -> f64 {
    let (Dob::Known(a), Dob::Known(b)) = (a, b) else {
        return 0.0;
    };
    if a == b {
        return 1.0;
    }
    if swap_score > 0.0 && swap_month_day(b) == Some(a) {
        return swap_score;
    }
    0.0
}

pub struct Comparator<'a> {
    config: &'a CompareConfig,
}

impl<'a> Comparator<'a> {
    pub fn new(config: &'a CompareConfig) -> Self {
        Self { config }
    }

    pub fn compare_records(&self, a: &NormalizedRecord, b: &NormalizedRecord) -> FieldScores {
        let first = &self.config.firstname;
        let last = &self.config.lastname;
        FieldScores {
            firstname_jw: agreement_flag(
                string_similarity(first.method, &a.firstname, &b.firstname),
                first.threshold,
            ),
            lastname_jw: agreement_flag(
                string_similarity(last.method, &a.lastname, &b.lastname),
                last.threshold,
            ),
            dob: compare_dob(a.dob, b.dob, self.config.dob.swap_month_day),
        }
    }

    /// One comparison vector per candidate pair, in pair order.
    ///
    /// A pair naming a record outside either dataset is an
    /// `UnknownRecord` error.
    pub fn compute(
        &self,
        pairs: &[CandidatePair],
        facility: &NormalizedDataset,
        hdss: &NormalizedDataset,
    ) -> Result<Vec<ComparisonVector>, LinkageError> {
        pairs
            .iter()
            .map(|&pair| {
                let a = facility
                    .get(pair.facility)
                    .ok_or(LinkageError::UnknownRecord {
                        source: Source::Facility,
                        index: pair.facility.index(),
                    })?;
                let b = hdss.get(pair.hdss).ok_or(LinkageError::UnknownRecord {
                    source: Source::Hdss,
                    index: pair.hdss.index(),
                })?;
                Ok(ComparisonVector {
                    pair,
                    scores: self.compare_records(a, b),
                })
            })
            .collect()
    }
}
