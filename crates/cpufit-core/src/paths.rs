use dirs::config_dir;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "CPUFIT_CONFIG";

pub fn cpufit_home() -> PathBuf {
    // Linux resolves to ~/.config/cpufit
    config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("cpufit")
}

/// `$CPUFIT_CONFIG` when set, else `<config_dir>/cpufit/config.json`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| cpufit_home().join("config.json"))
}
