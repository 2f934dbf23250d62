use crate::exec::{CommandRunner, CommandSpec};
use nodehealth_types::{HostIdentity, UNKNOWN};
use tracing::warn;

pub fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| UNKNOWN.to_string())
}

#[cfg(unix)]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// Chassis serial number from DMI, or `"Unknown"`.
pub async fn host_serial(runner: &dyn CommandRunner) -> String {
    let spec = CommandSpec::new("dmidecode")
        .args(["-s", "system-serial-number"])
        .sudo();
    let output = runner.run(&spec).await;

    let serial = output.stdout.trim();
    if !output.success() || serial.is_empty() {
        warn!(
            reason = %output.failure_reason().unwrap_or_else(|| "empty output".to_string()),
            "could not read system serial number"
        );
        return UNKNOWN.to_string();
    }
    serial.to_string()
}

pub async fn collect_identity(runner: &dyn CommandRunner) -> HostIdentity {
    HostIdentity {
        hostname: local_hostname(),
        serial: host_serial(runner).await,
    }
}
