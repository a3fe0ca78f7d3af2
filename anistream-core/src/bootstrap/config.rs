//! Configuration loading

use anyhow::Result;
use tracing::info;

use crate::Config;

const CONFIG_PATH_ENV: &str = "ANISTREAM_CONFIG_PATH";

/// Load configuration from a config file or environment variables.
///
/// Config file search order:
/// 1. `explicit` (the `--config` flag)
/// 2. `ANISTREAM_CONFIG_PATH` environment variable
/// 3. ./config.yaml (current working directory)
/// 4. /config/config.yaml (container mount path)
/// 5. Environment variables only
///
/// A file that exists but fails to parse is an error, not a silent
/// fallback to defaults.
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    let config_path = explicit
        .map(ToString::to_string)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .filter(|p| std::path::Path::new(p).exists())
        .or_else(|| {
            ["config.yaml", "/config/config.yaml"]
                .into_iter()
                .find(|p| std::path::Path::new(p).exists())
                .map(ToString::to_string)
        });

    if let Some(explicit) = explicit {
        if config_path.as_deref() != Some(explicit) {
            return Err(anyhow::anyhow!("Config file not found: {explicit}"));
        }
    }

    let config = match &config_path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load {path}: {e}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env()?
        }
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!(
        http_address = %config.http_address(),
        public_base_url = %config.public_base_url(),
        candidates = config.resolution.candidates.len(),
        "Configuration loaded and validated"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_path_must_exist() {
        let err = load_config(Some("/nonexistent/anistream.yaml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_explicit_file_is_validated() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "resolution:\n  candidate_timeout_seconds: 0").unwrap();
        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(err.to_string().contains("candidate_timeout_seconds"));
    }

    #[test]
    fn test_explicit_file_loads() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "server:\n  http_port: 4010").unwrap();
        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.http_port, 4010);
    }
}
