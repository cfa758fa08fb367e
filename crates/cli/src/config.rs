//! CLI configuration utilities

use anyhow::{Context, Result};
use finranks_core::ClientConfig;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.json";

/// Load the client configuration
///
/// An explicit path must exist; otherwise `<data_dir>/config.json` is used
/// when present, and the environment alone when it is not.
pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<ClientConfig> {
    if let Some(path) = explicit {
        return ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = data_dir.join(CONFIG_FILE);
    let path = default_path.exists().then_some(default_path.as_path());
    ClientConfig::load(path).context("Failed to load configuration")
}

/// Save client configuration to JSON file
pub fn save_config<P: AsRef<Path>>(config: &ClientConfig, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_config(&ClientConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = TempDir::new().unwrap();
        generate_default_config(dir.path().join(CONFIG_FILE)).unwrap();

        let config = load(None, dir.path()).unwrap();
        assert_eq!(config.api.base_url, ClientConfig::default().api.base_url);
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        assert!(load(Some(&dir.path().join("missing.json")), dir.path()).is_err());
    }
}
