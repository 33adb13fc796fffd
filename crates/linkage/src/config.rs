use serde::Deserialize;

use crate::error::LinkageError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Linkage run configuration. Every section has a default, so an empty TOML
/// document is a valid config that reproduces the standard pipeline:
/// full index, Jaro-Winkler at 0.85 on both names, exact dob, cutoff 2.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkageConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

fn default_name() -> String {
    "facility-hdss".into()
}

impl Default for LinkageConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            blocking: BlockingConfig::default(),
            normalize: NormalizeConfig::default(),
            compare: CompareConfig::default(),
            classify: ClassifyConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Blocking
// ---------------------------------------------------------------------------

/// Columns both datasets must agree on exactly for a pair to be compared.
/// Empty means full cross-product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockingConfig {
    #[serde(default)]
    pub attributes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Normalize
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    /// chrono format strings tried in order when parsing a date of birth.
    #[serde(default = "default_dob_formats")]
    pub dob_formats: Vec<String>,
}

fn default_dob_formats() -> Vec<String> {
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y", "%d-%b-%Y", "%d %B %Y"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            dob_formats: default_dob_formats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareConfig {
    #[serde(default)]
    pub firstname: StringCompareConfig,
    #[serde(default)]
    pub lastname: StringCompareConfig,
    #[serde(default)]
    pub dob: DateCompareConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMethod {
    JaroWinkler,
    Jaro,
    Levenshtein,
    DamerauLevenshtein,
    Exact,
}

impl std::fmt::Display for StringMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JaroWinkler => write!(f, "jaro_winkler"),
            Self::Jaro => write!(f, "jaro"),
            Self::Levenshtein => write!(f, "levenshtein"),
            Self::DamerauLevenshtein => write!(f, "damerau_levenshtein"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringCompareConfig {
    #[serde(default = "default_method")]
    pub method: StringMethod,
    /// Similarity at or above this value counts as agreement.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_method() -> StringMethod {
    StringMethod::JaroWinkler
}

fn default_threshold() -> f64 {
    0.85
}

impl Default for StringCompareConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateCompareConfig {
    /// Partial score when the dates agree only after swapping month and day.
    /// Zero keeps dob comparison strictly exact.
    #[serde(default)]
    pub swap_month_day: f64,
}

// ---------------------------------------------------------------------------
// Classify + Limits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifyConfig {
    /// A pair matches when its summed scores reach this cutoff (inclusive).
    #[serde(default = "default_min_agreements")]
    pub min_agreements: f64,
}

fn default_min_agreements() -> f64 {
    2.0
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            min_agreements: default_min_agreements(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    #[serde(default = "default_max_candidate_pairs")]
    pub max_candidate_pairs: u64,
}

fn default_max_candidate_pairs() -> u64 {
    10_000_000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_candidate_pairs: default_max_candidate_pairs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        for (field, cmp) in [
            ("firstname", &self.compare.firstname),
            ("lastname", &self.compare.lastname),
        ] {
            if !(0.0..=1.0).contains(&cmp.threshold) {
                return Err(LinkageError::ConfigValidation(format!(
                    "compare.{field}.threshold must be within [0, 1], got {}",
                    cmp.threshold
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.compare.dob.swap_month_day) {
            return Err(LinkageError::ConfigValidation(format!(
                "compare.dob.swap_month_day must be within [0, 1], got {}",
                self.compare.dob.swap_month_day
            )));
        }

        // Three comparisons, each scoring at most 1.
        let cutoff = self.classify.min_agreements;
        if !(cutoff > 0.0 && cutoff <= 3.0) {
            return Err(LinkageError::ConfigValidation(format!(
                "classify.min_agreements must be within (0, 3], got {cutoff}"
            )));
        }

        if self.normalize.dob_formats.is_empty() {
            return Err(LinkageError::ConfigValidation(
                "normalize.dob_formats must list at least one format".into(),
            ));
        }

        let mut seen = Vec::new();
        for attr in &self.blocking.attributes {
            if attr.trim().is_empty() {
                return Err(LinkageError::ConfigValidation(
                    "blocking.attributes must not contain empty names".into(),
                ));
            }
            if seen.contains(&attr) {
                return Err(LinkageError::ConfigValidation(format!(
                    "blocking attribute '{attr}' listed twice"
                )));
            }
            seen.push(attr);
        }

        if self.limits.max_candidate_pairs == 0 {
            return Err(LinkageError::ConfigValidation(
                "limits.max_candidate_pairs must be positive".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
