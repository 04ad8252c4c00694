use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::ai::DEFAULT_OLLAMA_URL;
use crate::relay::DEFAULT_MODEL;
use crate::session::DEFAULT_CUSTOM_RULES;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Optional settings read from `<config_dir>/localchat/config.json`.
/// Every field may be left out.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub ollama_url: Option<String>,
    pub bind_addr: Option<String>,
    pub default_model: Option<String>,
    pub default_rules: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the user's config file, falling back to defaults if there is none.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn default_model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn default_rules(&self) -> &str {
        self.default_rules.as_deref().unwrap_or(DEFAULT_CUSTOM_RULES)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("localchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.ollama_url(), "http://127.0.0.1:11434");
        assert_eq!(config.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(config.default_model(), "llama3.2");
        assert!(config.default_rules().contains("Boss"));
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ollama_url": "http://gpu-box:11434", "default_model": "mistral"}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.ollama_url(), "http://gpu-box:11434");
        assert_eq!(config.default_model(), "mistral");
        assert_eq!(config.bind_addr(), DEFAULT_BIND_ADDR);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("parsing config file"));
    }
}
