//! Configuration file management for pact.
//!
//! Provides a TOML-based config file at `~/.config/pact/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use pact_core::ModelConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: ModelSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSection {
    pub api_url: String,
    pub api_key: String,
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry: Option<u32>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the pact config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/pact` or `~/.config/pact`,
/// never the platform-specific `dirs::config_dir()`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("pact");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("pact")
}

/// Return the path to the pact config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since it holds the API key.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PactConfig {
    pub model: ModelConfig,
}

impl PactConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - API URL: `cli_api_url` > `PACT_API_URL` env > `model.api_url` > `ModelConfig::DEFAULT_API_URL`
    /// - API key: `PACT_API_KEY` env > `model.api_key` > error
    /// - Model id, timeout, retries: env > file > default
    ///
    /// The resolved key is checked with [`ModelConfig::ensure_credentials`],
    /// so a placeholder left by `pact init` is rejected here.
    pub fn resolve(cli_api_url: Option<&str>) -> Result<Self> {
        let file = load_config().ok().map(|c| c.model);

        let api_url = if let Some(url) = cli_api_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("PACT_API_URL") {
            url
        } else if let Some(ref model) = file {
            model.api_url.clone()
        } else {
            ModelConfig::DEFAULT_API_URL.to_string()
        };

        let api_key = if let Ok(key) = std::env::var("PACT_API_KEY") {
            key
        } else if let Some(ref model) = file {
            model.api_key.clone()
        } else {
            bail!("API key not found; set PACT_API_KEY or run `pact init` to create a config file");
        };

        let model_id = std::env::var("PACT_MODEL_ID")
            .ok()
            .or_else(|| file.as_ref().map(|m| m.model_id.clone()))
            .unwrap_or_else(|| ModelConfig::DEFAULT_MODEL_ID.to_string());

        let timeout_secs = match std::env::var("PACT_TIMEOUT_SECS") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .context("PACT_TIMEOUT_SECS env var is not a whole number of seconds")?,
            ),
            Err(_) => file.as_ref().and_then(|m| m.timeout_secs),
        };
        let max_retry = match std::env::var("PACT_MAX_RETRY") {
            Ok(raw) => Some(
                raw.parse::<u32>()
                    .context("PACT_MAX_RETRY env var is not a non-negative integer")?,
            ),
            Err(_) => file.as_ref().and_then(|m| m.max_retry),
        };

        let mut model = ModelConfig::new(api_url, api_key, model_id);
        if let Some(secs) = timeout_secs {
            model = model.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retry) = max_retry {
            model = model.with_max_retry(retry);
        }
        model
            .ensure_credentials()
            .context("model service is not usable")?;

        Ok(Self { model })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    const PACT_VARS: [&str; 5] = [
        "PACT_API_URL",
        "PACT_API_KEY",
        "PACT_MODEL_ID",
        "PACT_TIMEOUT_SECS",
        "PACT_MAX_RETRY",
    ];

    /// Point config lookup at an empty temp dir and clear every PACT_ var.
    fn isolated_env() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        for var in PACT_VARS {
            unsafe { std::env::remove_var(var) };
        }
        tmp
    }

    fn restore_env() {
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
        for var in PACT_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    fn sample_file(key: &str) -> ConfigFile {
        ConfigFile {
            model: ModelSection {
                api_url: "https://file.example/v1/chat/completions".to_string(),
                api_key: key.to_string(),
                model_id: "file-model".to_string(),
                timeout_secs: Some(30),
                max_retry: None,
            },
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let _tmp = isolated_env();

        save_config(&sample_file("sk-file")).unwrap();
        let loaded = load_config().unwrap();

        restore_env();
        assert_eq!(loaded.model.api_key, "sk-file");
        assert_eq!(loaded.model.model_id, "file-model");
        assert_eq!(loaded.model.timeout_secs, Some(30));
        assert_eq!(loaded.model.max_retry, None);
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let _tmp = isolated_env();

        save_config(&sample_file("sk-file")).unwrap();
        let meta = std::fs::metadata(config_path()).unwrap();

        restore_env();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        unsafe { std::env::set_var("PACT_API_URL", "https://env.example/v1") };
        unsafe { std::env::set_var("PACT_API_KEY", "sk-env") };

        let config = PactConfig::resolve(Some("https://cli.example/v1"));

        restore_env();
        assert_eq!(config.unwrap().model.api_url, "https://cli.example/v1");
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        save_config(&sample_file("sk-file")).unwrap();
        unsafe { std::env::set_var("PACT_API_KEY", "sk-env") };
        unsafe { std::env::set_var("PACT_MAX_RETRY", "5") };

        let config = PactConfig::resolve(None);

        restore_env();
        let model = config.unwrap().model;
        assert_eq!(model.api_key, "sk-env");
        assert_eq!(model.api_url, "https://file.example/v1/chat/completions");
        assert_eq!(model.model_id, "file-model");
        assert_eq!(model.timeout, Duration::from_secs(30));
        assert_eq!(model.max_retry, 5);
    }

    #[test]
    fn resolve_defaults_when_only_key_is_set() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        unsafe { std::env::set_var("PACT_API_KEY", "sk-env") };

        let config = PactConfig::resolve(None);

        restore_env();
        let model = config.unwrap().model;
        assert_eq!(model.api_url, ModelConfig::DEFAULT_API_URL);
        assert_eq!(model.model_id, ModelConfig::DEFAULT_MODEL_ID);
        assert_eq!(model.max_retry, ModelConfig::DEFAULT_MAX_RETRY);
    }

    #[test]
    fn resolve_errors_when_no_key() {
        let _lock = lock_env();
        let _tmp = isolated_env();

        let result = PactConfig::resolve(None);

        restore_env();
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("API key not found"), "unexpected error: {msg}");
    }

    #[test]
    fn resolve_rejects_placeholder_key() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        save_config(&sample_file("YOUR_API_KEY")).unwrap();

        let result = PactConfig::resolve(None);

        restore_env();
        assert!(result.is_err(), "placeholder key must not resolve");
    }

    #[test]
    fn resolve_rejects_unparsable_timeout() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        unsafe { std::env::set_var("PACT_API_KEY", "sk-env") };
        unsafe { std::env::set_var("PACT_TIMEOUT_SECS", "soon") };

        let result = PactConfig::resolve(None);

        restore_env();
        assert!(result.is_err());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("pact/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
