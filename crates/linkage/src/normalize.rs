use chrono::{Datelike, NaiveDate};
use unicode_normalization::UnicodeNormalization;

use crate::model::{Dataset, RecordId};
use crate::schema::LinkageFields;

/// Cell values treated the same as an empty cell.
const MISSING_TOKENS: [&str; 3] = ["nan", "null", "n/a"];

fn is_missing(value: &str) -> bool {
    value.is_empty() || MISSING_TOKENS.iter().any(|t| value.eq_ignore_ascii_case(t))
}

/// Canonical form of a name for similarity comparison.
///
/// Folds accents (NFD, combining marks dropped), lower-cases, drops
/// bracketed segments, turns `-` and `_` into spaces,
/// removes anything that is not alphanumeric or whitespace, then collapses
/// whitespace runs. Missing values become the empty string.
pub fn clean_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return String::new();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut depth = 0usize;
    let folded = trimmed
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c));
    for c in folded {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            '-' | '_' => out.push(' '),
            c if c.is_alphanumeric() || c.is_whitespace() => out.extend(c.to_lowercase()),
            _ => {}
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Date of birth after parsing. `Unknown` never agrees with anything,
/// including another `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dob {
    Known(NaiveDate),
    Unknown,
}

impl Dob {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Known(d) => Some(*d),
            Self::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Parse a date of birth, trying each format in order. A trailing time of day
/// (`1990-01-01 00:00:00`, `1990-01-01T08:30`) is ignored.
pub fn parse_dob(raw: &str, formats: &[String]) -> Dob {
    let s = raw.trim();
    if is_missing(s) {
        return Dob::Unknown;
    }

    if let Some(d) = try_formats(s, formats) {
        return Dob::Known(d);
    }

    if let Some((date_part, time_part)) = s.split_once(|c: char| c == ' ' || c == 'T') {
        if time_part.contains(':') {
            if let Some(d) = try_formats(date_part, formats) {
                return Dob::Known(d);
            }
        }
    }

    Dob::Unknown
}

fn try_formats(s: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

/// Swap month and day. `None` when the swapped value is not a valid date.
pub fn swap_month_day(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.day(), date.month())
}

/// The comparator's view of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub id: RecordId,
    pub firstname: String,
    pub lastname: String,
    pub dob: Dob,
}

/// Normalized linkage fields for a whole dataset, indexed like the dataset.
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub records: Vec<NormalizedRecord>,
    /// Records whose dob was present but could not be parsed.
    pub unparseable_dob: usize,
    /// Records whose dob ended up `Unknown`, missing or unparseable.
    pub unknown_dob: usize,
}

impl NormalizedDataset {
    pub fn get(&self, id: RecordId) -> Option<&NormalizedRecord> {
        self.records.get(id.index())
    }
}

pub fn normalize_dataset(
    dataset: &Dataset,
    fields: LinkageFields,
    dob_formats: &[String],
) -> NormalizedDataset {
    let mut unparseable_dob = 0;
    let mut unknown_dob = 0;

    let records = dataset
        .records()
        .iter()
        .map(|r| {
            let raw_dob = r.values[fields.dob].as_str();
            let dob = parse_dob(raw_dob, dob_formats);
            if dob.is_unknown() {
                unknown_dob += 1;
                if !is_missing(raw_dob.trim()) {
                    unparseable_dob += 1;
                    log::debug!(
                        "{} record {}: unparseable dob '{}'",
                        dataset.source,
                        r.id.index(),
                        raw_dob
                    );
                }
            }
            NormalizedRecord {
                id: r.id,
                firstname: clean_name(&r.values[fields.firstname]),
                lastname: clean_name(&r.values[fields.lastname]),
                dob,
            }
        })
        .collect();

    if unparseable_dob > 0 {
        log::warn!(
            "{} dataset: {} dob value(s) could not be parsed and will never agree",
            dataset.source,
            unparseable_dob
        );
    }

    NormalizedDataset {
        records,
        unparseable_dob,
        unknown_dob,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeConfig;
    use crate::model::Source;

    fn formats() -> Vec<String> {
        NormalizeConfig::default().dob_formats
    }

    #[test]
    fn clean_name_case_and_whitespace() {
        assert_eq!(clean_name("  John "), "john");
        assert_eq!(clean_name("JOHN"), clean_name("john"));
        assert_eq!(clean_name("Mary\t Ann"), "mary ann");
    }

    #[test]
    fn clean_name_punctuation() {
        assert_eq!(clean_name("O'Brien"), "obrien");
        assert_eq!(clean_name("Anne-Marie"), "anne marie");
        assert_eq!(clean_name("jean_paul."), "jean paul");
        assert_eq!(clean_name("Otieno (Jnr)"), "otieno");
        assert_eq!(clean_name("Achieng [dup] Akinyi"), "achieng akinyi");
    }

    #[test]
    fn clean_name_missing() {
        assert_eq!(clean_name(""), "");
        assert_eq!(clean_name("   "), "");
        assert_eq!(clean_name("NaN"), "");
        assert_eq!(clean_name("..."), "");
    }

    #[test]
    fn clean_name_folds_accents() {
        assert_eq!(clean_name("Zoë"), "zoe");
        assert_eq!(clean_name("José"), "jose");
        assert_eq!(clean_name("RENÉE"), "renee");
        assert_eq!(clean_name("Noël-Müller"), "noel muller");
    }

    #[test]
    fn parse_dob_formats() {
        let f = formats();
        let d = NaiveDate::from_ymd_opt(1990, 1, 31).unwrap();
        assert_eq!(parse_dob("1990-01-31", &f), Dob::Known(d));
        assert_eq!(parse_dob(" 1990/01/31 ", &f), Dob::Known(d));
        assert_eq!(parse_dob("19900131", &f), Dob::Known(d));
        assert_eq!(parse_dob("01/31/1990", &f), Dob::Known(d));
        assert_eq!(parse_dob("31-Jan-1990", &f), Dob::Known(d));
        assert_eq!(parse_dob("31 January 1990", &f), Dob::Known(d));
        assert_eq!(parse_dob("1990-01-31 00:00:00", &f), Dob::Known(d));
        assert_eq!(parse_dob("1990-01-31T08:30:00", &f), Dob::Known(d));
    }

    #[test]
    fn parse_dob_unknown() {
        let f = formats();
        assert_eq!(parse_dob("", &f), Dob::Unknown);
        assert_eq!(parse_dob("unknown", &f), Dob::Unknown);
        assert_eq!(parse_dob("1990-02-30", &f), Dob::Unknown);
        assert_eq!(parse_dob("1990-01-31 later", &f), Dob::Unknown);
    }

    #[test]
    fn swap_month_day_valid_and_invalid() {
        let d = NaiveDate::from_ymd_opt(1990, 4, 12).unwrap();
        assert_eq!(swap_month_day(d), NaiveDate::from_ymd_opt(1990, 12, 4));
        let d = NaiveDate::from_ymd_opt(1990, 4, 13).unwrap();
        assert_eq!(swap_month_day(d), None);
    }

    #[test]
    fn normalize_dataset_counts_unknown_dobs() {
        let ds = Dataset::new(
            Source::Facility,
            vec!["firstname".into(), "lastname".into(), "dob".into()],
            vec![
                vec![" John".into(), "SMITH".into(), "1990-01-01".into()],
                vec!["Jane".into(), "Doe".into(), "not a date".into()],
                vec!["Ann".into(), "Lee".into(), "".into()],
            ],
        );
        let fields = LinkageFields {
            firstname: 0,
            lastname: 1,
            dob: 2,
        };
        let n = normalize_dataset(&ds, fields, &formats());
        assert_eq!(n.records.len(), 3);
        assert_eq!(n.records[0].firstname, "john");
        assert_eq!(n.records[0].lastname, "smith");
        assert_eq!(n.unknown_dob, 2);
        assert_eq!(n.unparseable_dob, 1);
        assert_eq!(n.get(RecordId(1)).unwrap().dob, Dob::Unknown);
    }
}
