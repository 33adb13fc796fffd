//! CLI Exit Code Registry
//!
//! Single source of truth for `hdsslink` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success (including runs with zero matches)         |
//! | 2    | CLI usage error (bad args, conflicting flags)      |
//! | 60   | Invalid linkage config (TOML or validation)        |
//! | 61   | Input schema error (missing column, bad CSV)       |
//! | 62   | Candidate set exceeds `limits.max_candidate_pairs` |
//! | 63   | Runtime or IO error                                |

use hdsslink_linkage::LinkageError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
/// clap uses the same code for its own parse failures.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Linkage (60-69)
// =============================================================================

/// Config file could not be parsed or failed validation.
pub const EXIT_LINK_INVALID_CONFIG: u8 = 60;

/// An input dataset does not meet the schema contract.
pub const EXIT_LINK_SCHEMA: u8 = 61;

/// Candidate pair count over the configured ceiling.
pub const EXIT_LINK_RESOURCE_LIMIT: u8 = 62;

/// File IO or internal failure.
pub const EXIT_LINK_RUNTIME: u8 = 63;

/// Map an engine error to its exit code.
pub fn linkage_exit_code(err: &LinkageError) -> u8 {
    match err {
        LinkageError::ConfigParse(_) | LinkageError::ConfigValidation(_) => {
            EXIT_LINK_INVALID_CONFIG
        }
        LinkageError::MissingColumn { .. }
        | LinkageError::OutputColumn { .. }
        | LinkageError::Csv { .. } => EXIT_LINK_SCHEMA,
        LinkageError::ResourceLimit { .. } => EXIT_LINK_RESOURCE_LIMIT,
        LinkageError::UnknownRecord { .. } => EXIT_LINK_RUNTIME,
    }
}
