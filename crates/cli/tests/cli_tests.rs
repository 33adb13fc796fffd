// Black-box tests for the hdsslink binary.
// Run with: cargo test -p hdsslink-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const FACILITY: &str = "\
recnr,patientid,firstname,lastname,petname,dob,sex,nationalid
1,KCH-0001,John,Smith,Johnny,1990-01-01,M,23455671
2,KCH-0002,Akinyi,Odhiambo,Aki,1988-07-14,F,
3,KCH-0003,Samuel,Kiprono,Sam,2001-11-30,M,
";

const HDSS: &str = "\
recnr,hdssid,hdsshhid,firstname,lastname,petname,dob,sex,nationalid,visitdate
101,KSM-H-0101,KSM-HH-031,Jon,Smith,,1990-01-01,M,23455671,2023-02-14
102,KSM-H-0102,KSM-HH-032,Akinyi,Odhiambo,,not recorded,F,,2023-02-15
103,KSM-H-0103,KSM-HH-033,Grace,Chebet,,1995-04-04,F,,2023-02-16
";

const OUTPUT_HEADER: &str = "facility_recnr,hdss_recnr,\
facility_firstname,facility_lastname,hdss_firstname,hdss_lastname,\
facility_petname,hdss_petname,facility_dob,hdss_dob,facility_sex,hdss_sex,\
facility_nationalid,hdss_nationalid,patientid,hdssid,hdsshhid,visitdate";

fn hdsslink() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hdsslink"))
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        ws.write("facility.csv", FACILITY);
        ws.write("hdss.csv", HDSS);
        ws
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, extra: &[&str]) -> Output {
        let mut cmd = hdsslink();
        cmd.arg("run")
            .arg("--facility")
            .arg(self.path("facility.csv"))
            .arg("--hdss")
            .arg(self.path("hdss.csv"))
            .args(extra)
            .env_remove("HDSSLINK_CONFIG")
            .env("RUST_LOG", "warn");
        cmd.output().unwrap()
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_writes_csv_to_stdout() {
    let ws = Workspace::new();
    let out = ws.run(&[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));

    let csv = stdout(&out);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3, "header + 2 matches:\n{csv}");
    assert_eq!(lines[0], OUTPUT_HEADER);
    assert!(lines[1].starts_with("1,101,John,Smith,Jon,Smith,"), "{}", lines[1]);
    assert!(lines[2].starts_with("2,102,Akinyi,Odhiambo,Akinyi,Odhiambo,"), "{}", lines[2]);

    let err = stderr(&out);
    assert!(err.contains("9 candidate pairs, 2 matched"), "stderr: {err}");
    assert!(err.contains("unknown dob: 0 facility, 1 hdss"), "stderr: {err}");
}

#[test]
fn run_output_and_report_files() {
    let ws = Workspace::new();
    let csv_path = ws.path("matches.csv");
    let report_path = ws.path("report.json");
    let out = ws.run(&["-o", arg(&csv_path), "--report", arg(&report_path)]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty());

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["candidate_pairs"], 9);
    assert_eq!(report["summary"]["matched"], 2);
    assert_eq!(report["table"]["rows"].as_array().unwrap().len(), 2);
}

#[test]
fn run_json_to_stdout() {
    let ws = Workspace::new();
    let out = ws.run(&["--json", "--quiet"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["meta"]["config_name"], "facility-hdss");
    assert_eq!(report["summary"]["hdss_unknown_dob"], 1);
    assert!(stderr(&out).is_empty(), "quiet run printed: {}", stderr(&out));
}

#[test]
fn run_is_byte_identical_across_invocations() {
    let ws = Workspace::new();
    let first = stdout(&ws.run(&[]));
    let second = stdout(&ws.run(&[]));
    assert_eq!(first, second);
}

#[test]
fn run_with_block_flag() {
    let ws = Workspace::new();
    let out = ws.run(&["--block", "sex"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    // M: 2 x 1, F: 1 x 2
    assert!(err.contains("4 candidate pairs, 2 matched"), "stderr: {err}");
    assert!(err.contains("blocking: sex"), "stderr: {err}");
}

#[test]
fn run_with_config_file() {
    let ws = Workspace::new();
    let config = ws.write(
        "link.toml",
        "name = \"strict\"\n\n[classify]\nmin_agreements = 3.0\n",
    );
    let out = ws.run(&["--config", arg(&config)]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    // Akinyi's hdss dob is unknown, so only John/Jon reaches 3.
    assert_eq!(stdout(&out).lines().count(), 2);
    assert!(stderr(&out).contains("linked 'strict'"));
}

#[test]
fn run_with_no_matches_is_success() {
    let ws = Workspace::new();
    ws.write(
        "hdss.csv",
        "recnr,hdssid,hdsshhid,firstname,lastname,petname,dob,sex,nationalid,visitdate\n",
    );
    let out = ws.run(&[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).lines().count(), 1, "header only");
}

// ---------------------------------------------------------------------------
// Error exit codes
// ---------------------------------------------------------------------------

#[test]
fn invalid_config_exits_60() {
    let ws = Workspace::new();
    let config = ws.write("bad.toml", "[compare.firstname]\nthreshold = 1.5\n");
    let out = ws.run(&["--config", arg(&config)]);
    assert_eq!(out.status.code(), Some(60));
    assert!(stderr(&out).contains("error: config validation error"));
    assert!(stdout(&out).is_empty());
}

#[test]
fn unparseable_config_exits_60() {
    let ws = Workspace::new();
    let config = ws.write("bad.toml", "[classify\n");
    let out = ws.run(&["--config", arg(&config)]);
    assert_eq!(out.status.code(), Some(60));
    assert!(stderr(&out).contains("error: config parse error"));
}

#[test]
fn missing_column_exits_61() {
    let ws = Workspace::new();
    ws.write(
        "facility.csv",
        "recnr,patientid,firstname,lastname,petname,sex,nationalid\n1,P1,John,Smith,,M,\n",
    );
    let out = ws.run(&[]);
    assert_eq!(out.status.code(), Some(61));
    let err = stderr(&out);
    assert!(err.contains("facility dataset: missing required column 'dob'"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
    assert!(stdout(&out).is_empty());
}

#[test]
fn unknown_block_column_exits_61() {
    let ws = Workspace::new();
    let out = ws.run(&["--block", "village"]);
    assert_eq!(out.status.code(), Some(61));
}

#[test]
fn resource_limit_exits_62_without_output() {
    let ws = Workspace::new();
    let config = ws.write("tight.toml", "[limits]\nmax_candidate_pairs = 8\n");
    let csv_path = ws.path("matches.csv");
    let out = ws.run(&["--config", arg(&config), "-o", arg(&csv_path)]);
    assert_eq!(out.status.code(), Some(62));
    let err = stderr(&out);
    assert!(err.contains("9 pairs exceeds the limit of 8"), "stderr: {err}");
    assert!(err.contains("--block"), "stderr: {err}");
    assert!(!csv_path.exists(), "no partial output on failure");
}

#[test]
fn failed_report_write_leaves_no_csv() {
    let ws = Workspace::new();
    let csv_path = ws.path("matches.csv");
    let report_path = ws.path("no-such-dir").join("report.json");
    let out = ws.run(&["-o", arg(&csv_path), "--report", arg(&report_path)]);
    assert_eq!(out.status.code(), Some(63));
    assert!(stderr(&out).contains("cannot write"), "stderr: {}", stderr(&out));
    assert!(!csv_path.exists(), "csv written without its report");
    assert!(!ws.path("matches.csv.tmp").exists());
}

#[test]
fn missing_input_file_exits_63() {
    let ws = Workspace::new();
    let out = hdsslink()
        .args(["run", "--facility"])
        .arg(ws.path("absent.csv"))
        .arg("--hdss")
        .arg(ws.path("hdss.csv"))
        .env_remove("HDSSLINK_CONFIG")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(63));
    assert!(stderr(&out).contains("cannot read"));
}

#[test]
fn duplicate_block_flag_is_usage_error() {
    let ws = Workspace::new();
    let out = ws.run(&["--block", "sex", "--block", "sex"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn missing_required_flag_is_usage_error() {
    let out = hdsslink().args(["run", "--facility", "a.csv"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}

// ---------------------------------------------------------------------------
// validate / preview
// ---------------------------------------------------------------------------

#[test]
fn validate_config_and_inputs() {
    let ws = Workspace::new();
    let config = ws.write("link.toml", "[blocking]\nattributes = [\"sex\"]\n");
    let out = hdsslink()
        .args(["validate", "--config", arg(&config), "--facility"])
        .arg(ws.path("facility.csv"))
        .arg("--hdss")
        .arg(ws.path("hdss.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("config ok"), "stderr: {err}");
    assert!(err.contains("inputs ok: 3 facility, 3 hdss records; 4 candidate pairs blocked on sex"), "stderr: {err}");
}

#[test]
fn validate_enforces_pair_limit() {
    let ws = Workspace::new();
    let config = ws.write("tight.toml", "[limits]\nmax_candidate_pairs = 8\n");
    let out = hdsslink()
        .args(["validate", "--config", arg(&config), "--facility"])
        .arg(ws.path("facility.csv"))
        .arg("--hdss")
        .arg(ws.path("hdss.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(62));
    let err = stderr(&out);
    assert!(err.contains("9 pairs exceeds the limit of 8"), "stderr: {err}");
    assert!(!err.contains("inputs ok"), "stderr: {err}");
}

#[test]
fn validate_rejects_bad_config() {
    let ws = Workspace::new();
    let config = ws.write("link.toml", "[normalize]\ndob_formats = []\n");
    let out = hdsslink()
        .args(["validate", "--config", arg(&config)])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(60));
}

#[test]
fn preview_prints_header_and_rows() {
    let ws = Workspace::new();
    let out = hdsslink()
        .args(["preview", "--source", "hdss", "-n", "1"])
        .arg(ws.path("hdss.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("recnr  hdssid"));
    assert!(lines[1].starts_with("101    KSM-H-0101"));

    let err = stderr(&out);
    assert!(err.contains("3 rows, 10 columns"), "stderr: {err}");
    assert!(err.contains("schema: ok for hdss"), "stderr: {err}");
}

#[test]
fn preview_reports_schema_gap() {
    let ws = Workspace::new();
    let out = hdsslink()
        .args(["preview", "--source", "facility"])
        .arg(ws.path("hdss.csv"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(0));
    assert!(stderr(&out).contains("missing required column 'patientid'"));
}
