use std::fmt;

use crate::model::Source;

#[derive(Debug)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, empty format list, etc.).
    ConfigValidation(String),
    /// Required column absent from an input dataset.
    MissingColumn { source: Source, column: String },
    /// Output projection cannot be resolved from the two header rows.
    OutputColumn { column: String },
    /// Candidate set larger than the configured ceiling.
    ResourceLimit { pairs: u128, limit: u64 },
    /// A pair refers to a record its dataset does not hold.
    UnknownRecord { source: Source, index: usize },
    /// Malformed delimited input.
    Csv { source: Source, message: String },
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { source, column } => {
                write!(f, "{source} dataset: missing required column '{column}'")
            }
            Self::OutputColumn { column } => {
                write!(
                    f,
                    "output column '{column}' cannot be built from the input headers"
                )
            }
            Self::ResourceLimit { pairs, limit } => write!(
                f,
                "candidate set of {pairs} pairs exceeds the limit of {limit}; \
                 add blocking attributes or raise limits.max_candidate_pairs"
            ),
            Self::UnknownRecord { source, index } => {
                write!(f, "{source} dataset: no record at position {index}")
            }
            Self::Csv { source, message } => {
                write!(f, "{source} dataset: cannot read CSV: {message}")
            }
        }
    }
}

impl std::error::Error for LinkageError {}
