//! Records, configs and directory helpers

use netbackup::{Config, RawRecord};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

pub const PASSWORD: &str = "Int3gr@tion-pw";

pub fn record(ip: &str) -> RawRecord {
    [("ip", ip), ("username", "admin"), ("password", PASSWORD)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn config_in(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.backup_dir = temp.path().join("backups");
    config.storage.log_dir = temp.path().join("logs");
    config.session.connect_timeout = Duration::from_secs(5);
    config.session.command_timeout = Duration::from_secs(5);
    config
}

/// Names of `.cfg` files in `dir` (none if it does not exist)
pub fn cfg_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".cfg"))
        .collect();
    names.sort();
    names
}
