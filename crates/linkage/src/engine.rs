use crate::assemble::AssemblyPlan;
use crate::classify::classify;
use crate::compare::Comparator;
use crate::config::LinkageConfig;
use crate::error::LinkageError;
use crate::evidence::compute_summary;
use crate::index::{check_limit, count_candidates, index_pairs, BlockingPlan, IndexSide};
use crate::model::{Dataset, LinkageMeta, LinkageResult, Source};
use crate::normalize::normalize_dataset;
use crate::schema::{LinkageFields, SchemaContract};

/// Everything resolved from the headers before any record is touched.
struct Prepared {
    facility_fields: LinkageFields,
    hdss_fields: LinkageFields,
    assembly: AssemblyPlan,
    blocking: BlockingPlan,
}

fn prepare(
    config: &LinkageConfig,
    facility: &Dataset,
    hdss: &Dataset,
) -> Result<Prepared, LinkageError> {
    let facility_fields = SchemaContract::for_source(Source::Facility).validate(facility)?;
    let hdss_fields = SchemaContract::for_source(Source::Hdss).validate(hdss)?;
    let assembly = AssemblyPlan::resolve(facility, hdss)?;
    let blocking = if config.blocking.attributes.is_empty() {
        BlockingPlan::full()
    } else {
        BlockingPlan::resolve(&config.blocking.attributes, facility, hdss)?
    };
    Ok(Prepared {
        facility_fields,
        hdss_fields,
        assembly,
        blocking,
    })
}

/// Check both datasets against the schema contract, the output projection,
/// the configured blocking attributes and the candidate-pair ceiling
/// without comparing anything. Returns the candidate pair count.
pub fn validate_inputs(
    config: &LinkageConfig,
    facility: &Dataset,
    hdss: &Dataset,
) -> Result<u128, LinkageError> {
    let prepared = prepare(config, facility, hdss)?;
    let formats = &config.normalize.dob_formats;
    let facility_norm = normalize_dataset(facility, prepared.facility_fields, formats);
    let hdss_norm = normalize_dataset(hdss, prepared.hdss_fields, formats);

    let candidates = count_candidates(
        &prepared.blocking,
        IndexSide {
            dataset: facility,
            normalized: &facility_norm,
        },
        IndexSide {
            dataset: hdss,
            normalized: &hdss_norm,
        },
    );
    check_limit(candidates, config.limits.max_candidate_pairs)?;
    Ok(candidates)
}

/// Run the linkage pipeline: facility is dataset A, hdss is dataset B.
///
/// Schema problems and the candidate-set ceiling abort the run before any
/// comparison work. Unparseable dates are recovered as unknown.
pub fn run(
    config: &LinkageConfig,
    facility: &Dataset,
    hdss: &Dataset,
) -> Result<LinkageResult, LinkageError> {
    let Prepared {
        facility_fields,
        hdss_fields,
        assembly,
        blocking,
    } = prepare(config, facility, hdss)?;

    let formats = &config.normalize.dob_formats;
    let facility_norm = normalize_dataset(facility, facility_fields, formats);
    let hdss_norm = normalize_dataset(hdss, hdss_fields, formats);

    let pairs = index_pairs(
        &blocking,
        IndexSide {
            dataset: facility,
            normalized: &facility_norm,
        },
        IndexSide {
            dataset: hdss,
            normalized: &hdss_norm,
        },
        config.limits.max_candidate_pairs,
    )?;
    log::info!(
        "'{}': {} facility x {} hdss records -> {} candidate pairs",
        config.name,
        facility.len(),
        hdss.len(),
        pairs.len()
    );

    let vectors =
        Comparator::new(&config.compare).compute(&pairs, &facility_norm, &hdss_norm)?;
    drop(pairs);

    let matches = classify(&vectors, config.classify.min_agreements);
    log::info!("'{}': {} matched pairs", config.name, matches.len());

    let table = assembly.assemble(&matches, facility, hdss)?;
    let summary = compute_summary(&facility_norm, &hdss_norm, &vectors, &matches);

    Ok(LinkageResult {
        meta: LinkageMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            blocking: blocking.attributes().to_vec(),
        },
        summary,
        matches,
        table,
    })
}

/// Load a delimited table into a dataset. The delimiter is detected from the
/// first lines (comma, semicolon, tab or pipe).
pub fn load_csv_dataset(source: Source, csv_data: &str) -> Result<Dataset, LinkageError> {
    load_csv_dataset_with_delimiter(source, csv_data, detect_delimiter(csv_data))
}

pub fn load_csv_dataset_with_delimiter(
    source: Source,
    csv_data: &str,
    delimiter: u8,
) -> Result<Dataset, LinkageError> {
    let data = csv_data.strip_prefix('\u{feff}').unwrap_or(csv_data);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data.as_bytes());

    let csv_err = |e: csv::Error| LinkageError::Csv {
        source,
        message: e.to_string(),
    };

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }

    log::debug!("{source}: loaded {} rows, {} columns", rows.len(), columns.len());
    Ok(Dataset::new(source, columns, rows))
}

/// Pick the delimiter giving the most consistent field count (>1) over the
/// first lines. Falls back to comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t', b'|'];
    let sample: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}
