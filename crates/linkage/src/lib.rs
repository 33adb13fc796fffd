//! `hdsslink-linkage`: record linkage engine for facility and HDSS registers.
//!
//! Pure engine crate: receives two pre-loaded datasets, returns the matched-pair
//! table. No CLI or file IO dependencies.

pub mod assemble;
pub mod classify;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod index;
pub mod model;
pub mod normalize;
pub mod schema;

pub use config::LinkageConfig;
pub use engine::{load_csv_dataset, run, validate_inputs};
pub use error::LinkageError;
pub use model::{Dataset, LinkageResult, OutputTable, RecordId, Source};
