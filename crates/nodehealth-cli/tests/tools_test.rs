//! Commands that need no hardware: address decoding, renumbering, config.

use nodehealth_testing::TestWorld;
use predicates::prelude::*;
use serde_json::json;

#[test]
fn test_decode_ipv6_fields() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["--format", "json", "decode-ipv6", "1234:5678:9abc:def0::1/64"])?;
    assert!(result.success(), "stderr: {}", result.stderr());

    let json = result.json()?;
    assert_eq!(
        json[0]["fields"],
        json!({
            "cluster_id": 0x1234567,
            "tor_id": 0x89a,
            "isolation_id": 0xbcd,
            "interface_id": 0xef0,
        })
    );
    Ok(())
}

#[test]
fn test_decode_ipv6_rejects_ipv4() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["--fail-on-issues", "decode-ipv6", "10.0.0.1"])?;
    assert_eq!(result.code(), Some(2));
    assert!(result.stdout().contains("Failed - "));
    Ok(())
}

#[test]
fn test_renumber_h100t_into_h100() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["--format", "json", "renumber", "--shape", "h100t", "mlx5_4"])?;
    assert!(result.success(), "stderr: {}", result.stderr());
    assert_eq!(result.json()?, json!([{ "interface": "mlx5_4", "h100": "mlx5_3" }]));
    Ok(())
}

#[test]
fn test_config_init_then_show() -> anyhow::Result<()> {
    let world = TestWorld::new();

    let init = world.run(&["config", "init"])?;
    assert!(init.success(), "stderr: {}", init.stderr());
    assert!(world.config_path().exists());

    let again = world.run(&["config", "init"])?;
    assert_eq!(again.code(), Some(1));
    assert!(again.stderr().contains("already exists"));

    assert!(world.run(&["config", "init", "--force"])?.success());

    let show = world.run(&["config", "show"])?;
    assert!(show.success());
    assert!(show.stdout().contains("[fleet]"));
    assert!(show.stdout().contains("remote_dir = \"/tmp/nodehealth\""));
    Ok(())
}

#[test]
fn test_config_values_feed_commands() -> anyhow::Result<()> {
    let world = TestWorld::new().with_config("[report]\nexit_on_failure = true\n");
    let result = world.run(&["decode-ipv6", "not-an-address"])?;
    assert_eq!(result.code(), Some(2));
    Ok(())
}

#[test]
fn test_config_path_prints_resolved_file() -> anyhow::Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["config", "path"])?;
    assert_eq!(result.stdout().trim(), world.config_path().display().to_string());
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_help_lists_subcommands() {
    let mut cmd = assert_cmd::Command::cargo_bin("nodehealth").unwrap();
    cmd.arg("--help").assert().success().stdout(
        predicate::str::contains("link")
            .and(predicate::str::contains("snapshot"))
            .and(predicate::str::contains("gpu"))
            .and(predicate::str::contains("fleet"))
            .and(predicate::str::contains("rail-latency"))
            .and(predicate::str::contains("decode-ipv6")),
    );
}

#[test]
#[allow(deprecated)]
fn test_gpu_help_lists_burn_options() {
    let mut cmd = assert_cmd::Command::cargo_bin("nodehealth").unwrap();
    cmd.args(["gpu", "--help"]).assert().success().stdout(
        predicate::str::contains("--burn")
            .and(predicate::str::contains("--burn-dir"))
            .and(predicate::str::contains("--burn-seconds")),
    );
}

#[test]
#[allow(deprecated)]
fn test_fleet_requires_hosts() {
    let world = TestWorld::new();
    let mut cmd = assert_cmd::Command::cargo_bin("nodehealth").unwrap();
    world
        .configure_command(&mut cmd)
        .arg("fleet")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no hosts given"));
}
