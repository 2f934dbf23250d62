use chrono::NaiveDateTime;
use nodehealth_core::CommandSpec;

pub fn command() -> CommandSpec {
    CommandSpec::new("uptime").arg("-s")
}

/// Boot time from `uptime -s` (`2024-01-08 09:00:00`).
pub fn parse_boot_time(output: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(output.trim(), "%Y-%m-%d %H:%M:%S").ok()
}
