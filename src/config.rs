use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Status source path. Overridable per-run with --mdstat.
    pub mdstat_path: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { mdstat_path: PathBuf::from(crate::collectors::mdstat::MDSTAT_PATH) }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        try_load().unwrap_or_default()
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mdsensord").join("mdsensord.toml"))
    }
}

fn try_load() -> Result<Config> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    let text = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&text)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_proc_mdstat() {
        let cfg = Config::default();
        assert_eq!(cfg.general.mdstat_path, PathBuf::from("/proc/mdstat"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: Config = toml::from_str("").expect("empty toml");
        assert_eq!(cfg.general.mdstat_path, PathBuf::from("/proc/mdstat"));

        let cfg: Config = toml::from_str("[general]\nmdstat_path = \"/tmp/mdstat\"\n")
            .expect("general section");
        assert_eq!(cfg.general.mdstat_path, PathBuf::from("/tmp/mdstat"));
    }
}
