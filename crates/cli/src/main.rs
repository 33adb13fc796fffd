// hdsslink CLI - facility to HDSS record linkage

mod exit_codes;
mod link;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

use exit_codes::{linkage_exit_code, EXIT_LINK_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};
use hdsslink_linkage::schema::SchemaContract;
use hdsslink_linkage::{LinkageError, Source};

#[derive(Parser)]
#[command(name = "hdsslink")]
#[command(about = "Link facility patient records to HDSS residents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link a facility CSV against an HDSS CSV and write the matched pairs
    #[command(after_help = "\
Examples:
  hdsslink run --facility clinic.csv --hdss hdss.csv > matches.csv
  hdsslink run --facility clinic.csv --hdss hdss.csv --block sex --output matches.csv
  hdsslink run --facility clinic.csv --hdss hdss.csv --config link.toml --json
  hdsslink run --facility clinic.csv --hdss hdss.csv --report run.json -o matches.csv")]
    Run {
        /// Facility (hospital) register, dataset A
        #[arg(long)]
        facility: PathBuf,

        /// HDSS surveillance register, dataset B
        #[arg(long)]
        hdss: PathBuf,

        /// Linkage config (TOML). Defaults apply when omitted.
        #[arg(long, env = "HDSSLINK_CONFIG")]
        config: Option<PathBuf>,

        /// Block on a column present in both files (repeatable). Replaces
        /// the config's blocking attributes.
        #[arg(long = "block", value_name = "COLUMN")]
        block: Vec<String>,

        /// Write the matched-pair CSV here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Input delimiter (auto-detected when omitted)
        #[arg(long)]
        delimiter: Option<char>,

        /// Suppress the summary and warnings on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check a config, and optionally the two input files, without linking
    #[command(after_help = "\
Examples:
  hdsslink validate --config link.toml
  hdsslink validate --config link.toml --facility clinic.csv --hdss hdss.csv")]
    Validate {
        /// Linkage config (TOML)
        #[arg(long, env = "HDSSLINK_CONFIG")]
        config: Option<PathBuf>,

        /// Facility register to check against the schema contract
        #[arg(long, requires = "hdss")]
        facility: Option<PathBuf>,

        /// HDSS register to check against the schema contract
        #[arg(long, requires = "facility")]
        hdss: Option<PathBuf>,

        /// Input delimiter (auto-detected when omitted)
        #[arg(long)]
        delimiter: Option<char>,
    },

    /// Show the header and first rows of an input file
    #[command(after_help = "\
Examples:
  hdsslink preview clinic.csv
  hdsslink preview hdss.csv --source hdss --rows 10")]
    Preview {
        /// CSV file to preview
        file: PathBuf,

        /// Which register the file is, for the schema check
        #[arg(long, value_enum, default_value = "facility")]
        source: SourceArg,

        /// Number of data rows to show
        #[arg(long, short = 'n', default_value_t = 5)]
        rows: usize,

        /// Input delimiter (auto-detected when omitted)
        #[arg(long)]
        delimiter: Option<char>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Facility,
    Hdss,
}

impl From<SourceArg> for Source {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Facility => Source::Facility,
            SourceArg::Hdss => Source::Hdss,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let result = match cli.command {
        Commands::Run {
            facility,
            hdss,
            config,
            block,
            output,
            json,
            report,
            delimiter,
            quiet,
        } => link::cmd_run(link::RunArgs {
            facility,
            hdss,
            config,
            block,
            output,
            json,
            report,
            delimiter,
            quiet,
        }),
        Commands::Validate {
            config,
            facility,
            hdss,
            delimiter,
        } => link::cmd_validate(config, facility, hdss, delimiter),
        Commands::Preview {
            file,
            source,
            rows,
            delimiter,
        } => link::cmd_preview(file, source.into(), rows, delimiter),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_LINK_RUNTIME,
            message: msg.into(),
            hint: None,
        }
    }

    /// Create error from an engine error with the registered exit code.
    pub fn linkage(err: LinkageError) -> Self {
        let code = linkage_exit_code(&err);
        let hint = match &err {
            LinkageError::ResourceLimit { .. } => {
                Some("block on a column both files share, e.g. --block sex".to_string())
            }
            LinkageError::MissingColumn { source, .. } => Some(format!(
                "{source} file needs columns: {}",
                SchemaContract::for_source(*source).required.join(", ")
            )),
            LinkageError::OutputColumn { .. } => Some(
                "patientid must appear only in the facility file; hdssid, hdsshhid and visitdate only in the hdss file"
                    .to_string(),
            ),
            _ => None,
        };
        Self {
            code,
            message: err.to_string(),
            hint,
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
