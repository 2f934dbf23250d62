//! `link --from-dir` and `diff` against saved mlxlink output.

use nodehealth_testing::TestWorld;
use nodehealth_testing::assertions::{assert_status, csv_statuses};
use std::path::Path;

const STAMP: &str = "20240108120000";

fn raw_dir(world: &TestWorld, dir: &str, mlx5_3_sample: &str) -> anyhow::Result<String> {
    world.copy_sample("mlxlink_healthy.json", &format!("{}/gpu-1_mlx5_0.json", dir))?;
    world.copy_sample(mlx5_3_sample, &format!("{}/gpu-1_mlx5_3.json", dir))?;
    Ok(world.temp_dir().join(dir).display().to_string())
}

fn report(world: &TestWorld, stamp: &str) -> std::path::PathBuf {
    world
        .output_dir()
        .join(format!("mlxlink_info_gpu-1_{}.csv", stamp))
}

#[test]
fn test_replay_writes_classified_report() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let dir = raw_dir(&world, "raw", "mlxlink_high_ber.json")?;

    let result = world.run(&["link", "--from-dir", &dir, "--date-stamp", STAMP])?;
    assert!(result.success(), "stderr: {}", result.stderr());
    assert!(result.stdout().contains("1 host(s), 2 link(s): 1 passed, 0 warning(s), 1 failed"));

    let statuses = csv_statuses(&report(&world, STAMP))?;
    assert_status(&statuses, "gpu-1:mlx5_0", "Passed")?;
    assert_status(&statuses, "gpu-1:mlx5_3", "Failed - RawPhyBER > 1e-7")?;
    Ok(())
}

#[test]
fn test_fail_on_issues_sets_exit_code() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let dir = raw_dir(&world, "raw", "mlxlink_high_ber.json")?;

    let advisory = world.run(&["link", "--from-dir", &dir, "--date-stamp", STAMP])?;
    assert_eq!(advisory.code(), Some(0));

    let strict = world.run(&[
        "--fail-on-issues",
        "link",
        "--from-dir",
        &dir,
        "--date-stamp",
        STAMP,
    ])?;
    assert_eq!(strict.code(), Some(2));
    Ok(())
}

#[test]
fn test_errors_only_json_lists_failures() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let dir = raw_dir(&world, "raw", "mlxlink_high_ber.json")?;

    let result = world.run(&[
        "--format",
        "json",
        "link",
        "--from-dir",
        &dir,
        "--errors-only",
        "--address",
        "10.0.0.7",
        "--date-stamp",
        STAMP,
    ])?;
    assert!(result.success(), "stderr: {}", result.stderr());

    let json = result.json()?;
    let records = json["records"].as_array().expect("records array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["interface"], "mlx5_3");
    assert_eq!(records[0]["ip_addr"], "10.0.0.7");
    assert_eq!(json["summary"]["links"], 2);
    assert!(
        world
            .output_dir()
            .join(format!("mlxlink_info_10.0.0.7_{}.json", STAMP))
            .exists()
    );
    Ok(())
}

#[test]
fn test_diff_reports_recovered_link() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let before = raw_dir(&world, "before", "mlxlink_high_ber.json")?;
    let after = raw_dir(&world, "after", "mlxlink_healthy.json")?;

    let earlier = world.run(&["link", "--from-dir", &before, "--date-stamp", "20240101000000"])?;
    assert!(earlier.success());
    let later = world.run(&["link", "--from-dir", &after, "--date-stamp", "20240102000000"])?;
    assert!(later.success());

    let previous = report(&world, "20240101000000");
    let current = report(&world, "20240102000000");
    let result = world.run(&[
        "--format",
        "json",
        "diff",
        path_str(&previous),
        path_str(&current),
        "--date-stamp",
        "20240102000000",
    ])?;
    assert!(result.success(), "stderr: {}", result.stderr());

    let json = result.json()?;
    assert_eq!(json["diff"]["newly_failed"].as_array().map(Vec::len), Some(0));
    let recovered = json["diff"]["recovered"].as_array().expect("recovered array");
    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered[0]["interface"], "mlx5_3");

    let recovered_file = world.output_dir().join("recovered_20240102000000.csv");
    assert!(csv_statuses(&recovered_file)?.contains_key("gpu-1:mlx5_3"));
    Ok(())
}

#[test]
fn test_link_previous_flag_writes_diff_files() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let before = raw_dir(&world, "before", "mlxlink_healthy.json")?;
    let after = raw_dir(&world, "after", "mlxlink_high_ber.json")?;

    let earlier = world.run(&["link", "--from-dir", &before, "--date-stamp", "20240101000000"])?;
    assert!(earlier.success());
    let previous = report(&world, "20240101000000");
    let result = world.run(&[
        "link",
        "--from-dir",
        &after,
        "--previous",
        path_str(&previous),
        "--date-stamp",
        "20240102000000",
    ])?;
    assert!(result.success(), "stderr: {}", result.stderr());
    assert!(result.stdout().contains("1 new failure(s), 0 recovered"));

    let new_failures = csv_statuses(&world.output_dir().join("new_failures_20240102000000.csv"))?;
    assert_status(&new_failures, "gpu-1:mlx5_3", "Failed - RawPhyBER > 1e-7")?;
    Ok(())
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}
