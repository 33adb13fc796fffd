//! Column contract between the two input registers and the output table.
//!
//! Both datasets are checked once, at ingestion, before any pair is built.

use crate::error::LinkageError;
use crate::model::{Dataset, Source};

/// Columns both registers carry. In the output they appear twice, once per
/// side, under the `facility_` and `hdss_` prefixes.
pub const SHARED_COLUMNS: [&str; 7] = [
    "recnr",
    "firstname",
    "lastname",
    "dob",
    "petname",
    "sex",
    "nationalid",
];

pub const FACILITY_ONLY_COLUMNS: [&str; 1] = ["patientid"];

pub const HDSS_ONLY_COLUMNS: [&str; 3] = ["hdssid", "hdsshhid", "visitdate"];

/// The fixed output schema, in output order.
pub const OUTPUT_COLUMNS: [&str; 18] = [
    "facility_recnr",
    "hdss_recnr",
    "facility_firstname",
    "facility_lastname",
    "hdss_firstname",
    "hdss_lastname",
    "facility_petname",
    "hdss_petname",
    "facility_dob",
    "hdss_dob",
    "facility_sex",
    "hdss_sex",
    "facility_nationalid",
    "hdss_nationalid",
    "patientid",
    "hdssid",
    "hdsshhid",
    "visitdate",
];

/// Positions of the fields the comparator reads, resolved against one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkageFields {
    pub firstname: usize,
    pub lastname: usize,
    pub dob: usize,
}

/// Required column list for one register.
#[derive(Debug, Clone)]
pub struct SchemaContract {
    pub source: Source,
    pub required: Vec<&'static str>,
}

impl SchemaContract {
    pub fn for_source(source: Source) -> Self {
        let extra: &[&'static str] = match source {
            Source::Facility => &FACILITY_ONLY_COLUMNS,
            Source::Hdss => &HDSS_ONLY_COLUMNS,
        };
        let required = SHARED_COLUMNS.iter().chain(extra).copied().collect();
        Self { source, required }
    }

    /// Check every required column is present and resolve the linkage fields.
    pub fn validate(&self, dataset: &Dataset) -> Result<LinkageFields, LinkageError> {
        for column in &self.required {
            if !dataset.has_column(column) {
                return Err(LinkageError::MissingColumn {
                    source: self.source,
                    column: (*column).to_string(),
                });
            }
        }

        let idx = |name: &str| -> Result<usize, LinkageError> {
            dataset
                .column_index(name)
                .ok_or_else(|| LinkageError::MissingColumn {
                    source: self.source,
                    column: name.into(),
                })
        };

        Ok(LinkageFields {
            firstname: idx("firstname")?,
            lastname: idx("lastname")?,
            dob: idx("dob")?,
        })
    }
}
