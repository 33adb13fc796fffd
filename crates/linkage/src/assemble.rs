use crate::error::LinkageError;
use crate::model::{Dataset, MatchedPair, OutputTable, Source};
use crate::schema::OUTPUT_COLUMNS;

/// One column of the wide (facility ++ hdss) row, after renaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideColumn {
    pub source: Source,
    pub index: usize,
    pub label: String,
}

/// Label every column of the concatenated row.
///
/// Names present in both headers get `csv1_` / `csv2_`, which are then
/// relabeled to `facility_` / `hdss_`. Names unique to one side are kept.
pub fn wide_columns(facility: &[String], hdss: &[String]) -> Vec<WideColumn> {
    let side = |source: Source, own: &[String], other: &[String]| {
        own.iter()
            .enumerate()
            .map(|(index, name)| {
                let label = if other.contains(name) {
                    relabel(&format!("{}{name}", source.shared_prefix()))
                } else {
                    name.clone()
                };
                WideColumn {
                    source,
                    index,
                    label,
                }
            })
            .collect::<Vec<_>>()
    };

    let mut columns = side(Source::Facility, facility, hdss);
    columns.extend(side(Source::Hdss, hdss, facility));
    columns
}

/// Replace a `csv1_` / `csv2_` prefix with the register's domain prefix.
pub fn relabel(label: &str) -> String {
    for source in [Source::Facility, Source::Hdss] {
        if let Some(rest) = label.strip_prefix(source.shared_prefix()) {
            return format!("{}{rest}", source.domain_prefix());
        }
    }
    label.to_string()
}

/// Where each output column is read from. Resolved once per run, from the
/// two header rows, before any pair is indexed.
#[derive(Debug, Clone)]
pub struct AssemblyPlan {
    columns: Vec<WideColumn>,
}

impl AssemblyPlan {
    pub fn resolve(facility: &Dataset, hdss: &Dataset) -> Result<Self, LinkageError> {
        let wide = wide_columns(&facility.columns, &hdss.columns);
        let columns = OUTPUT_COLUMNS
            .iter()
            .map(|name| {
                wide.iter()
                    .find(|c| c.label == *name)
                    .cloned()
                    .ok_or_else(|| LinkageError::OutputColumn {
                        column: (*name).to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    /// One output row per matched pair, built from the original rows.
    pub fn assemble(
        &self,
        matches: &[MatchedPair],
        facility: &Dataset,
        hdss: &Dataset,
    ) -> Result<OutputTable, LinkageError> {
        let mut rows = Vec::with_capacity(matches.len());
        for m in matches {
            let a = facility
                .record(m.pair.facility)
                .ok_or(LinkageError::UnknownRecord {
                    source: Source::Facility,
                    index: m.pair.facility.index(),
                })?;
            let b = hdss
                .record(m.pair.hdss)
                .ok_or(LinkageError::UnknownRecord {
                    source: Source::Hdss,
                    index: m.pair.hdss.index(),
                })?;

            let row = self
                .columns
                .iter()
                .map(|c| match c.source {
                    Source::Facility => a.values[c.index].clone(),
                    Source::Hdss => b.values[c.index].clone(),
                })
                .collect();
            rows.push(row);
        }

        Ok(OutputTable {
            columns: self.columns.iter().map(|c| c.label.clone()).collect(),
            rows,
        })
    }
}
