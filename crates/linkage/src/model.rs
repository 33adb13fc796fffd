use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which register a dataset came from. Facility is always the left side (A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Facility,
    Hdss,
}

impl Source {
    /// Prefix given to a column name shared by both datasets.
    pub fn shared_prefix(&self) -> &'static str {
        match self {
            Self::Facility => "csv1_",
            Self::Hdss => "csv2_",
        }
    }

    /// Domain prefix that replaces [`Source::shared_prefix`] in the output.
    pub fn domain_prefix(&self) -> &'static str {
        match self {
            Self::Facility => "facility_",
            Self::Hdss => "hdss_",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Facility => write!(f, "facility"),
            Self::Hdss => write!(f, "hdss"),
        }
    }
}

/// Position of a record inside the dataset that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub usize);

impl RecordId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single raw row. `values` is aligned with [`Dataset::columns`].
#[derive(Debug, Clone)]
pub struct Record {
    pub id: RecordId,
    pub values: Vec<String>,
}

/// One input table. Owns its records; everything downstream refers to them by
/// [`RecordId`].
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: Source,
    pub columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from a header row and raw rows. Short rows are padded
    /// with empty values and long rows truncated to the header width.
    pub fn new(source: Source, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, mut values)| {
                values.resize(width, String::new());
                Record {
                    id: RecordId(i),
                    values,
                }
            })
            .collect();
        Self {
            source,
            columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.index())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }
}

// ---------------------------------------------------------------------------
// Pairs + comparison
// ---------------------------------------------------------------------------

/// Candidate pair. Order matters: `facility` always indexes A, `hdss` indexes B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CandidatePair {
    pub facility: RecordId,
    pub hdss: RecordId,
}

/// Comparison labels, in the column order of every [`FieldScores`] row.
pub const FEATURE_LABELS: [&str; 3] = ["firstname_jw", "lastname_jw", "dob"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldScores {
    pub firstname_jw: f64,
    pub lastname_jw: f64,
    pub dob: f64,
}

impl FieldScores {
    pub fn sum(&self) -> f64 {
        self.firstname_jw + self.lastname_jw + self.dob
    }

    /// Scores in [`FEATURE_LABELS`] order.
    pub fn as_array(&self) -> [f64; 3] {
        [self.firstname_jw, self.lastname_jw, self.dob]
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ComparisonVector {
    pub pair: CandidatePair,
    pub scores: FieldScores,
}

/// A pair the classifier accepted, with the scores that got it there.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchedPair {
    pub pair: CandidatePair,
    pub scores: FieldScores,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Matched-record table. Every row has exactly `columns.len()` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OutputTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(&self.columns)?;
        for row in &self.rows {
            w.write_record(row)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageSummary {
    pub facility_records: usize,
    pub hdss_records: usize,
    pub candidate_pairs: usize,
    pub matched: usize,
    pub facility_unknown_dob: usize,
    pub hdss_unknown_dob: usize,
    /// Per comparison label: how many candidate pairs scored above zero.
    pub agreement_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub blocking: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageResult {
    pub meta: LinkageMeta,
    pub summary: LinkageSummary,
    pub matches: Vec<MatchedPair>,
    pub table: OutputTable,
}
