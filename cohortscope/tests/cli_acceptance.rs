//! Acceptance tests for the cohortscope binary.
//!
//! Each test runs the real binary in an isolated XDG environment with
//! fixture warehouse exports written into a temp directory.

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
    fixtures: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");
        let fixtures = base.join("fixtures");

        for dir in [&home, &xdg_data, &xdg_config, &xdg_state, &fixtures] {
            fs::create_dir_all(dir).expect("failed to create test dir");
        }

        seed_fixtures(&fixtures);

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
            fixtures,
        }
    }

    fn fixture(&self, name: &str) -> PathBuf {
        self.fixtures.join(name)
    }

    /// Write a config that alerts on d0 ROAS (the fixtures have no d7 data).
    fn write_config(&self) -> PathBuf {
        let path = self.fixtures.join("config.toml");
        fs::write(
            &path,
            r#"
[thresholds]
primary_horizon = "d0"

[schema]
group_by = ["mediasource"]
spend = "cost"
installs = "installs"

[schema.revenue]
d0 = "d0_total_net_revenue"

[report]
horizons = ["d0"]
"#,
        )
        .expect("failed to write config fixture");
        path
    }
}

/// Two-day fixture pair: applovin spikes CPI on eligible spend, unity scales
/// cleanly, mintegral is new today.
fn seed_fixtures(dir: &Path) {
    fs::write(
        dir.join("today.csv"),
        "mediasource,cost,installs,d0_total_net_revenue\n\
         applovin,1000,100,50\n\
         unity,600,400,90\n\
         mintegral,150,30,5\n",
    )
    .expect("failed to write today fixture");

    fs::write(
        dir.join("yesterday.csv"),
        "mediasource,cost,installs,d0_total_net_revenue\n\
         applovin,800,100,100\n\
         unity,590,250,60\n",
    )
    .expect("failed to write yesterday fixture");
}

fn run(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("cohortscope"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .expect("failed to execute cohortscope")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn daily_report_flags_cpi_spike() {
    let env = CliTestEnv::new();
    let config = env.write_config();

    let output = run(
        &env,
        &[
            "--config",
            config.to_str().unwrap(),
            "daily",
            "--current",
            env.fixture("today.csv").to_str().unwrap(),
            "--previous",
            env.fixture("yesterday.csv").to_str().unwrap(),
            "--date",
            "2026-02-08",
        ],
    );
    let text = stdout(&output);

    assert!(text.contains("day-over-day report for 2026-02-08"));
    // applovin: CPI 10.00 vs 8.00 on $1,000 spend
    assert!(text.contains("[CRITICAL] applovin (cpi_spike)"));
    assert!(text.contains("Reduce spend or investigate targeting"));
    // unity scaled installs +60% with CPI down
    assert!(text.contains("Strong performers"));
    assert!(text.contains("unity"));
    // mintegral is new: no history, monitored only
    assert!(text.contains("mintegral"));
    assert!(!text.contains("[CRITICAL] mintegral"));
}

#[test]
fn daily_report_json_output() {
    let env = CliTestEnv::new();
    let config = env.write_config();

    let output = run(
        &env,
        &[
            "--config",
            config.to_str().unwrap(),
            "daily",
            "--current",
            env.fixture("today.csv").to_str().unwrap(),
            "--previous",
            env.fixture("yesterday.csv").to_str().unwrap(),
            "--date",
            "2026-02-08",
            "--format",
            "json",
        ],
    );
    let value: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout is valid JSON");

    assert_eq!(value["scope"], "day_over_day");
    assert_eq!(value["overview"]["total_spend"], 1750.0);
    assert_eq!(value["overview"]["total_installs"], 530);
    assert_eq!(value["alerts"][0]["rule"], "cpi_spike");
    assert_eq!(value["alerts"][0]["severity"], "critical");
}

#[test]
fn export_writes_timestamped_files() {
    let env = CliTestEnv::new();
    let config = env.write_config();
    let out_dir = env.fixtures.join("out");

    let output = run(
        &env,
        &[
            "--config",
            config.to_str().unwrap(),
            "export",
            "--input",
            env.fixture("today.csv").to_str().unwrap(),
            "--out-dir",
            out_dir.to_str().unwrap(),
        ],
    );
    let text = stdout(&output);
    assert!(text.contains("Aggregated 3 rows into 3 groups."));

    let entries: Vec<_> = fs::read_dir(&out_dir)
        .expect("export dir exists")
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert!(entries.iter().any(|n| n.starts_with("cohort_summary_") && n.ends_with(".csv")));
    assert!(entries.iter().any(|n| n.starts_with("cohort_summary_") && n.ends_with(".json")));
}

#[test]
fn rules_lists_cascade_and_thresholds() {
    let env = CliTestEnv::new();

    let output = run(&env, &["rules"]);
    let text = stdout(&output);

    assert!(text.contains("cpi_spike"));
    assert!(text.contains("volume_drop"));
    assert!(text.contains("high_cpi_on_high_spend"));
    assert!(text.contains("low_roas"));
    assert!(text.contains("roas_decline"));
    assert!(text.contains("min_spend_for_alert      = 1000"));
    assert!(text.contains("unset (low_roas rule skipped)"));
    // KPI targets are listed so the floor derivation is discoverable
    assert!(text.contains("offerwall: roas_d90 = 1, min_chapter3_cvr = 0.08"));
    assert!(text.contains("non_offerwall: roas_d365 = 1, roas_d180 = 0.9"));
}

#[test]
fn rules_with_product_context_derives_roas_floor() {
    let env = CliTestEnv::new();

    let output = run(&env, &["rules", "--product", "offerwall"]);
    let text = stdout(&output);

    // Offerwall targets 100% net ROAS by d90; the floor and horizon follow.
    assert!(text.contains("min_roas_threshold       = 1"));
    assert!(text.contains("primary_horizon          = d90"));
    assert!(!text.contains("low_roas rule skipped"));
}

#[test]
fn daily_report_with_product_context_shifts_horizon() {
    let env = CliTestEnv::new();
    let config = env.write_config();

    let output = run(
        &env,
        &[
            "--config",
            config.to_str().unwrap(),
            "daily",
            "--current",
            env.fixture("today.csv").to_str().unwrap(),
            "--previous",
            env.fixture("yesterday.csv").to_str().unwrap(),
            "--date",
            "2026-02-08",
            "--product",
            "non_offerwall",
        ],
    );
    let text = stdout(&output);

    // Non-offerwall targets key off d365; the fixtures carry no d365 revenue,
    // so the blended ROAS at the product horizon is reported as missing.
    assert!(text.contains("Blended d365 ROAS: n/a"));
    // The delta-based CPI rule is unaffected by the product context.
    assert!(text.contains("[CRITICAL] applovin (cpi_spike)"));
}

#[test]
fn malformed_export_fails_with_context() {
    let env = CliTestEnv::new();
    let config = env.write_config();

    fs::write(
        env.fixture("bad.csv"),
        "mediasource,cost,installs,d0_total_net_revenue\napplovin,not-a-number,100,50\n",
    )
    .expect("failed to write bad fixture");

    let output = run(
        &env,
        &[
            "--config",
            config.to_str().unwrap(),
            "daily",
            "--current",
            env.fixture("bad.csv").to_str().unwrap(),
            "--previous",
            env.fixture("yesterday.csv").to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to aggregate current period"));
}
