use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    snapshot: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        let snapshot = base.join("library.json");
        seed_snapshot_fixture(&snapshot);

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
            snapshot,
        }
    }

    fn snapshot_arg(&self) -> String {
        self.snapshot.to_string_lossy().into_owned()
    }

    fn missing_snapshot_arg(&self) -> String {
        self.xdg_data
            .join("does-not-exist.json")
            .to_string_lossy()
            .into_owned()
    }
}

fn seed_snapshot_fixture(target: &Path) {
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../shelfwise-core/tests/fixtures/library-snapshot.json");
    fs::copy(source, target).expect("failed to copy snapshot fixture");
}

fn run_bin(env: &CliTestEnv, bin_name: &str, args: &[&str]) -> Output {
    let bin_path = match bin_name {
        "shelfwise-report" => PathBuf::from(assert_cmd::cargo::cargo_bin!("shelfwise-report")),
        "shelfwise-fines" => PathBuf::from(assert_cmd::cargo::cargo_bin!("shelfwise-fines")),
        "shelfwise-broadcast" => {
            PathBuf::from(assert_cmd::cargo::cargo_bin!("shelfwise-broadcast"))
        }
        _ => panic!("unsupported binary in test harness: {bin_name}"),
    };

    let mut command = Command::new(bin_path);

    command
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute {bin_name}: {e}"))
}

fn assert_success(bin_name: &str, args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "{bin_name} {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

// ============================================
// shelfwise-report
// ============================================

#[test]
fn report_prints_dashboard_as_text() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let args = ["--snapshot", snapshot.as_str(), "--today", "08/05/2024"];

    let output = run_bin(&env, "shelfwise-report", &args);
    assert_success("shelfwise-report", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Library analytics for 08/05/2024"));
    assert!(stdout.contains("Members:          2"), "stdout:\n{stdout}");
    assert!(stdout.contains("₹73"), "stdout:\n{stdout}");
    assert!(stdout.contains("Weekly fines (+83% vs baseline)"));
    assert!(stdout.contains("Fiction"));
    assert!(stdout.contains("(1 record skipped)"));

    // the dated log file lands in the isolated state directory
    let log_files: Vec<String> = fs::read_dir(env.xdg_state.join("shelfwise"))
        .expect("state dir should exist")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(
        log_files
            .iter()
            .any(|name| name.starts_with("shelfwise.") && name.ends_with(".log")),
        "log files: {log_files:?}"
    );
}

#[test]
fn report_json_output_is_machine_readable() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let args = [
        "--snapshot",
        snapshot.as_str(),
        "--today",
        "08/05/2024",
        "--format",
        "json",
    ];

    let output = run_bin(&env, "shelfwise-report", &args);
    assert_success("shelfwise-report", &args, &output);

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["member_count"], 2);
    assert_eq!(json["weekly_fine_total"], 73);
    assert_eq!(json["issues_per_day"]["state"], "populated");

    let labels: Vec<&str> = json["issues_per_day"]["report"]["points"]
        .as_array()
        .expect("points array")
        .iter()
        .filter_map(|p| p["label"].as_str())
        .collect();
    assert_eq!(labels, vec!["01/05", "02/05", "03/05"]);
}

#[test]
fn report_markdown_output() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let args = [
        "--snapshot",
        snapshot.as_str(),
        "--today",
        "08/05/2024",
        "--format",
        "md",
    ];

    let output = run_bin(&env, "shelfwise-report", &args);
    assert_success("shelfwise-report", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Library analytics for 08/05/2024"));
    assert!(stdout.contains("## Most issued categories (%)"));
    assert!(stdout.contains("| Fiction | 75 |"), "stdout:\n{stdout}");
}

#[test]
fn report_strict_mode_fails_on_skipped_records() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let args = [
        "--snapshot",
        snapshot.as_str(),
        "--today",
        "08/05/2024",
        "--strict",
    ];

    let output = run_bin(&env, "shelfwise-report", &args);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("skipped c4"), "stderr:\n{stderr}");
    assert!(stderr.contains("strict mode"));
}

#[test]
fn report_without_data_shows_no_data() {
    let env = CliTestEnv::new();
    let snapshot = env.missing_snapshot_arg();
    let args = ["--snapshot", snapshot.as_str(), "--today", "08/05/2024"];

    let output = run_bin(&env, "shelfwise-report", &args);
    assert_success("shelfwise-report", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No data available"));
    assert!(stdout.contains("Members:          0"));
}

#[test]
fn report_rejects_malformed_today() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let args = ["--snapshot", snapshot.as_str(), "--today", "8/5/2024"];

    let output = run_bin(&env, "shelfwise-report", &args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("dd/MM/yyyy"));
}

// ============================================
// shelfwise-fines
// ============================================

#[test]
fn fines_updates_are_saved_to_the_snapshot() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let args = ["--snapshot", snapshot.as_str(), "--late", "12"];

    let output = run_bin(&env, "shelfwise-fines", &args);
    assert_success("shelfwise-fines", &args, &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Fine configuration saved."));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&env.snapshot).unwrap()).unwrap();
    let policy = &saved["collections"]["Fine"][0]["fields"];
    assert_eq!(policy["lateReturnFixedAmount"], 12.0);
    assert_eq!(policy["lostBooksPercentage"], 150.0);
}

#[test]
fn fines_repairs_a_partial_policy() {
    let env = CliTestEnv::new();
    fs::write(
        &env.snapshot,
        r#"{"collections": {"Fine": [{"id": "fine_configuration", "fields": {"lateReturnFixedAmount": 5.0}}]}}"#,
    )
    .unwrap();
    let snapshot = env.snapshot_arg();
    let args = ["--snapshot", snapshot.as_str(), "--damaged", "20"];

    let output = run_bin(&env, "shelfwise-fines", &args);
    assert_success("shelfwise-fines", &args, &output);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&env.snapshot).unwrap()).unwrap();
    let policy = &saved["collections"]["Fine"][0]["fields"];
    assert_eq!(policy["damagedBooksPercentage"], 20.0);
    assert_eq!(policy["lostBooksPercentage"], 0.0);
    assert_eq!(policy["lateReturnFixedAmount"], 5.0);
}

#[test]
fn fines_rejects_out_of_range_values() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let before = fs::read_to_string(&env.snapshot).unwrap();
    let args = ["--snapshot", snapshot.as_str(), "--damaged", "150"];

    let output = run_bin(&env, "shelfwise-fines", &args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("between 0 and 100"));
    assert_eq!(fs::read_to_string(&env.snapshot).unwrap(), before);
}

#[test]
fn fines_assessment() {
    let env = CliTestEnv::new();
    let snapshot = env.snapshot_arg();
    let args = [
        "--snapshot",
        snapshot.as_str(),
        "--assess-price",
        "400",
        "--days-late",
        "3",
    ];

    let output = run_bin(&env, "shelfwise-fines", &args);
    assert_success("shelfwise-fines", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Assessment for a book priced 400 (3 day(s) late):"));
    assert!(stdout.contains("Damaged books  200"), "stdout:\n{stdout}");
    assert!(stdout.contains("Lost books     600"), "stdout:\n{stdout}");
    assert!(stdout.contains("Late return    30"), "stdout:\n{stdout}");
}

// ============================================
// shelfwise-broadcast
// ============================================

#[test]
fn broadcast_dry_run_prints_payload() {
    let env = CliTestEnv::new();
    let args = [
        "--title",
        "Closed Friday",
        "--body",
        "The library is closed for inventory.",
        "--at",
        "01/01/2099 10:00",
        "--dry-run",
    ];

    let output = run_bin(&env, "shelfwise-broadcast", &args);
    assert_success("shelfwise-broadcast", &args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dry run"));
    assert!(stdout.contains("\"type\": \"date\""));
    assert!(stdout.contains("\"scheduledFor\": \"2099-01-01T10:00:00\""));
}

#[test]
fn broadcast_rejects_past_schedule_and_empty_title() {
    let env = CliTestEnv::new();

    let past = ["--title", "Old", "--body", "news", "--at", "01/01/2001 10:00", "--dry-run"];
    let output = run_bin(&env, "shelfwise-broadcast", &past);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("in the past"));

    let untitled = ["--title", " ", "--body", "news", "--at", "01/01/2099 10:00", "--dry-run"];
    let output = run_bin(&env, "shelfwise-broadcast", &untitled);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("title is empty"));
}
