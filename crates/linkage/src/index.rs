use std::collections::HashMap;

use crate::error::LinkageError;
use crate::model::{CandidatePair, Dataset, RecordId, Source};
use crate::normalize::{Dob, NormalizedDataset, NormalizedRecord};

// ---------------------------------------------------------------------------
// Blocking plan
// ---------------------------------------------------------------------------

/// How one blocking attribute is read from each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKey {
    FirstName,
    LastName,
    Dob,
    /// Any other column, compared on its trimmed raw value.
    Column { facility: usize, hdss: usize },
}

/// Blocking attributes resolved against both headers. No attributes means
/// full cross-product.
#[derive(Debug, Clone)]
pub struct BlockingPlan {
    attributes: Vec<String>,
    keys: Vec<BlockKey>,
}

impl BlockingPlan {
    pub fn full() -> Self {
        Self {
            attributes: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Every attribute must exist in both datasets.
    pub fn resolve(
        attributes: &[String],
        facility: &Dataset,
        hdss: &Dataset,
    ) -> Result<Self, LinkageError> {
        let mut keys = Vec::with_capacity(attributes.len());
        for attr in attributes {
            let missing = |source: Source| LinkageError::MissingColumn {
                source,
                column: attr.clone(),
            };
            let fi = facility
                .column_index(attr)
                .ok_or_else(|| missing(Source::Facility))?;
            let hi = hdss.column_index(attr).ok_or_else(|| missing(Source::Hdss))?;

            keys.push(match attr.as_str() {
                "firstname" => BlockKey::FirstName,
                "lastname" => BlockKey::LastName,
                "dob" => BlockKey::Dob,
                _ => BlockKey::Column {
                    facility: fi,
                    hdss: hi,
                },
            });
        }
        Ok(Self {
            attributes: attributes.to_vec(),
            keys,
        })
    }

    pub fn is_full(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Blocking key for one record, or `None` when any attribute is empty
    /// (empty values never agree).
    fn key_for(&self, side: &IndexSide<'_>, record: &NormalizedRecord) -> Option<Vec<String>> {
        let mut key = Vec::with_capacity(self.keys.len());
        for k in &self.keys {
            let part = match *k {
                BlockKey::FirstName => record.firstname.clone(),
                BlockKey::LastName => record.lastname.clone(),
                BlockKey::Dob => match record.dob {
                    Dob::Known(d) => d.to_string(),
                    Dob::Unknown => return None,
                },
                BlockKey::Column { facility, hdss } => {
                    let col = match side.dataset.source {
                        Source::Facility => facility,
                        Source::Hdss => hdss,
                    };
                    side.dataset.record(record.id)?.values[col].trim().to_string()
                }
            };
            if part.is_empty() {
                return None;
            }
            key.push(part);
        }
        Some(key)
    }
}

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

/// A dataset together with its normalized linkage fields.
#[derive(Debug, Clone, Copy)]
pub struct IndexSide<'a> {
    pub dataset: &'a Dataset,
    pub normalized: &'a NormalizedDataset,
}

/// Enumerate candidate pairs in ascending (facility, hdss) order.
///
/// The candidate count is checked against `max_pairs` before any pair is
/// allocated.
pub fn index_pairs(
    plan: &BlockingPlan,
    facility: IndexSide<'_>,
    hdss: IndexSide<'_>,
    max_pairs: u64,
) -> Result<Vec<CandidatePair>, LinkageError> {
    if plan.is_full() {
        return full_index(facility.dataset.len(), hdss.dataset.len(), max_pairs);
    }

    let buckets = hdss_buckets(plan, &hdss);
    let facility_keys = facility_buckets(plan, &facility, &buckets);
    let total = bucket_total(&facility_keys);
    check_limit(total, max_pairs)?;

    let mut pairs = Vec::with_capacity(total as usize);
    for (facility_id, bucket) in facility_keys {
        if let Some(ids) = bucket {
            pairs.extend(ids.iter().map(|&hdss_id| CandidatePair {
                facility: facility_id,
                hdss: hdss_id,
            }));
        }
    }

    log::debug!(
        "blocked index on [{}]: {} candidate pairs from {} hdss blocks",
        plan.attributes.join(", "),
        pairs.len(),
        buckets.len()
    );
    Ok(pairs)
}

/// Number of candidate pairs `index_pairs` would produce, without
/// producing them.
pub fn count_candidates(plan: &BlockingPlan, facility: IndexSide<'_>, hdss: IndexSide<'_>) -> u128 {
    if plan.is_full() {
        return facility.dataset.len() as u128 * hdss.dataset.len() as u128;
    }
    let buckets = hdss_buckets(plan, &hdss);
    bucket_total(&facility_buckets(plan, &facility, &buckets))
}

type Buckets = HashMap<Vec<String>, Vec<RecordId>>;

// hdss key -> record ids, ascending by construction
fn hdss_buckets(plan: &BlockingPlan, hdss: &IndexSide<'_>) -> Buckets {
    let mut buckets: Buckets = HashMap::new();
    for record in &hdss.normalized.records {
        if let Some(key) = plan.key_for(hdss, record) {
            buckets.entry(key).or_default().push(record.id);
        }
    }
    buckets
}

fn facility_buckets<'b>(
    plan: &BlockingPlan,
    facility: &IndexSide<'_>,
    buckets: &'b Buckets,
) -> Vec<(RecordId, Option<&'b Vec<RecordId>>)> {
    facility
        .normalized
        .records
        .iter()
        .map(|r| {
            let bucket = plan.key_for(facility, r).and_then(|k| buckets.get(&k));
            (r.id, bucket)
        })
        .collect()
}

fn bucket_total(facility_keys: &[(RecordId, Option<&Vec<RecordId>>)]) -> u128 {
    facility_keys
        .iter()
        .map(|(_, b)| b.map_or(0, |ids| ids.len() as u128))
        .sum()
}

/// Every facility record paired with every hdss record.
pub fn full_index(
    facility_len: usize,
    hdss_len: usize,
    max_pairs: u64,
) -> Result<Vec<CandidatePair>, LinkageError> {
    let total = facility_len as u128 * hdss_len as u128;
    check_limit(total, max_pairs)?;

    let mut pairs = Vec::with_capacity(total as usize);
    for a in 0..facility_len {
        for b in 0..hdss_len {
            pairs.push(CandidatePair {
                facility: RecordId(a),
                hdss: RecordId(b),
            });
        }
    }
    log::debug!("full index: {} candidate pairs", pairs.len());
    Ok(pairs)
}

pub fn check_limit(total: u128, max_pairs: u64) -> Result<(), LinkageError> {
    if total > max_pairs as u128 {
        return Err(LinkageError::ResourceLimit {
            pairs: total,
            limit: max_pairs,
        });
    }
    Ok(())
}
