//! `hdsslink run | validate | preview`: file handling around the linkage engine.

use std::io::Write;
use std::path::{Path, PathBuf};

use hdsslink_linkage::engine::{load_csv_dataset, load_csv_dataset_with_delimiter};
use hdsslink_linkage::schema::SchemaContract;
use hdsslink_linkage::{Dataset, LinkageConfig, LinkageResult, Source};

use crate::CliError;

pub struct RunArgs {
    pub facility: PathBuf,
    pub hdss: PathBuf,
    pub config: Option<PathBuf>,
    pub block: Vec<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub report: Option<PathBuf>,
    pub delimiter: Option<char>,
    pub quiet: bool,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    if args.quiet {
        log::set_max_level(log::LevelFilter::Error);
    }

    let mut config = load_config(args.config.as_deref())?;
    if !args.block.is_empty() {
        config.blocking.attributes = args.block;
        config.validate().map_err(|e| {
            CliError::usage(e.to_string()).with_hint("each --block column may be given once")
        })?;
    }

    let delimiter = parse_delimiter(args.delimiter)?;
    let facility = load_dataset(Source::Facility, &args.facility, delimiter)?;
    let hdss = load_dataset(Source::Hdss, &args.hdss, delimiter)?;

    let result = hdsslink_linkage::run(&config, &facility, &hdss).map_err(CliError::linkage)?;

    // Nothing is written until the whole run has succeeded.
    let csv = result
        .table
        .to_csv_string()
        .map_err(|e| CliError::io(format!("CSV serialization error: {e}")))?;
    let report = if args.json || args.report.is_some() {
        Some(
            serde_json::to_string_pretty(&result)
                .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?,
        )
    } else {
        None
    };

    let mut files: Vec<(&Path, &str)> = Vec::new();
    if let Some(path) = &args.output {
        files.push((path.as_path(), csv.as_str()));
    }
    if let (Some(path), Some(json)) = (&args.report, &report) {
        files.push((path.as_path(), json.as_str()));
    }
    write_all_or_none(&files)?;
    if !args.quiet {
        for (path, _) in &files {
            eprintln!("wrote {}", path.display());
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        if let Some(json) = &report {
            writeln!(out, "{json}").map_err(|e| CliError::io(e.to_string()))?;
        }
    } else if args.output.is_none() {
        out.write_all(csv.as_bytes())
            .map_err(|e| CliError::io(e.to_string()))?;
    }
    out.flush().map_err(|e| CliError::io(e.to_string()))?;

    if !args.quiet {
        print_summary(&result);
    }
    Ok(())
}

/// Write every file to a `.tmp` sibling first and rename only once all of
/// them are on disk, so a failed run never leaves one output without the other.
fn write_all_or_none(files: &[(&Path, &str)]) -> Result<(), CliError> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (path, content) in files {
        let tmp = staging_path(path);
        if let Err(e) = std::fs::write(&tmp, content) {
            discard(&staged);
            let _ = std::fs::remove_file(&tmp);
            return Err(CliError::io(format!("cannot write {}: {e}", path.display())));
        }
        staged.push(tmp);
    }

    for (i, (tmp, (path, _))) in staged.iter().zip(files).enumerate() {
        if let Err(e) = std::fs::rename(tmp, path) {
            discard(&staged[i..]);
            for (done, _) in &files[..i] {
                let _ = std::fs::remove_file(done);
            }
            return Err(CliError::io(format!("cannot write {}: {e}", path.display())));
        }
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn discard(paths: &[PathBuf]) {
    for p in paths {
        let _ = std::fs::remove_file(p);
    }
}

fn print_summary(result: &LinkageResult) {
    let s = &result.summary;
    eprintln!(
        "linked '{}': {} facility x {} hdss records, {} candidate pairs, {} matched",
        result.meta.config_name, s.facility_records, s.hdss_records, s.candidate_pairs, s.matched,
    );
    if !result.meta.blocking.is_empty() {
        eprintln!("blocking: {}", result.meta.blocking.join(", "));
    }
    if s.facility_unknown_dob > 0 || s.hdss_unknown_dob > 0 {
        eprintln!(
            "unknown dob: {} facility, {} hdss (never counted as agreeing)",
            s.facility_unknown_dob, s.hdss_unknown_dob
        );
    }
}

pub fn cmd_validate(
    config: Option<PathBuf>,
    facility: Option<PathBuf>,
    hdss: Option<PathBuf>,
    delimiter: Option<char>,
) -> Result<(), CliError> {
    let cfg = load_config(config.as_deref())?;
    match &config {
        Some(path) => eprintln!("config ok: {} ('{}')", path.display(), cfg.name),
        None => eprintln!("config ok: defaults ('{}')", cfg.name),
    }

    if let (Some(facility), Some(hdss)) = (facility, hdss) {
        let delimiter = parse_delimiter(delimiter)?;
        let a = load_dataset(Source::Facility, &facility, delimiter)?;
        let b = load_dataset(Source::Hdss, &hdss, delimiter)?;
        let candidates =
            hdsslink_linkage::validate_inputs(&cfg, &a, &b).map_err(CliError::linkage)?;

        let pairs = if cfg.blocking.attributes.is_empty() {
            format!("{candidates} candidate pairs (full index)")
        } else {
            format!(
                "{candidates} candidate pairs blocked on {}",
                cfg.blocking.attributes.join(", ")
            )
        };
        eprintln!(
            "inputs ok: {} facility, {} hdss records; {pairs}",
            a.len(),
            b.len()
        );
    }
    Ok(())
}

pub fn cmd_preview(
    file: PathBuf,
    source: Source,
    rows: usize,
    delimiter: Option<char>,
) -> Result<(), CliError> {
    let delimiter = parse_delimiter(delimiter)?;
    let dataset = load_dataset(source, &file, delimiter)?;

    let shown: Vec<&[String]> = dataset
        .records()
        .iter()
        .take(rows)
        .map(|r| r.values.as_slice())
        .collect();
    let text = render_preview(&dataset.columns, &shown);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())
        .map_err(|e| CliError::io(e.to_string()))?;
    out.flush().map_err(|e| CliError::io(e.to_string()))?;

    eprintln!(
        "{}: {} rows, {} columns",
        file.display(),
        dataset.len(),
        dataset.columns.len()
    );
    match SchemaContract::for_source(source).validate(&dataset) {
        Ok(_) => eprintln!("schema: ok for {source}"),
        Err(e) => eprintln!("schema: {e}"),
    }
    Ok(())
}

/// Left-aligned text table, columns separated by two spaces.
fn render_preview(columns: &[String], rows: &[&[String]]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (w, v) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(v.chars().count());
        }
    }

    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(v, &w)| format!("{v:<w$}"))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = line(columns);
    out.push('\n');
    for row in rows {
        out.push_str(&line(*row));
        out.push('\n');
    }
    out
}

fn load_config(path: Option<&Path>) -> Result<LinkageConfig, CliError> {
    let Some(path) = path else {
        return Ok(LinkageConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    LinkageConfig::from_toml(&text).map_err(CliError::linkage)
}

fn load_dataset(source: Source, path: &Path, delimiter: Option<u8>) -> Result<Dataset, CliError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    let dataset = match delimiter {
        Some(d) => load_csv_dataset_with_delimiter(source, &data, d),
        None => load_csv_dataset(source, &data),
    }
    .map_err(CliError::linkage)?;
    log::debug!("{}: {} records", path.display(), dataset.len());
    Ok(dataset)
}

fn parse_delimiter(delimiter: Option<char>) -> Result<Option<u8>, CliError> {
    match delimiter {
        None => Ok(None),
        Some(c) if c.is_ascii() => Ok(Some(c as u8)),
        Some(c) => Err(CliError::usage(format!(
            "delimiter must be a single ASCII character, got '{c}'"
        ))),
    }
}
