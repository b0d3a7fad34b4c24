use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use super::{DmError, Result};

/// Instagram credentials, read from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read `INSTAGRAM_USERNAME` / `INSTAGRAM_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("INSTAGRAM_USERNAME")
            .map_err(|_| DmError::Config("INSTAGRAM_USERNAME is not set".into()))?;
        let password = std::env::var("INSTAGRAM_PASSWORD")
            .map_err(|_| DmError::Config("INSTAGRAM_PASSWORD is not set".into()))?;
        if username.trim().is_empty() || password.is_empty() {
            return Err(DmError::Config("Instagram credentials are empty".into()));
        }
        Ok(Self { username, password })
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            // Headed by default: the human may need to type a verification code
            headless: false,
            viewport_width: 1280,
            viewport_height: 800,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/123.0.0.0 Safari/537.36"
                .into(),
        }
    }
}

/// Per-step timeouts for the session driver, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Optional popups: cookie consent, save-login-info, notifications
    pub popup_ms: u64,
    /// Login form appearance (mandatory)
    pub login_form_ms: u64,
    /// Window in which a verification-code screen may appear
    pub verification_detect_ms: u64,
    /// How long the human gets to type the emailed code
    pub verification_wait_ms: u64,
    /// Inbox / conversation navigation
    pub navigation_ms: u64,
    /// Fixed settle wait after clicks that trigger re-renders
    pub settle_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            popup_ms: 5_000,
            login_form_ms: 30_000,
            verification_detect_ms: 8_000,
            verification_wait_ms: 60_000,
            navigation_ms: 15_000,
            settle_ms: 3_000,
        }
    }
}

/// Agent endpoint settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub max_turns: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            max_turns: 10,
        }
    }
}

impl AgentConfig {
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

/// Full tool configuration. Credentials never live in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Where screenshots and reports land
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Conversations to try to open, in preference order
    #[serde(default = "default_targets")]
    pub target_usernames: Vec<String>,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl Default for DmConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            timeouts: TimeoutConfig::default(),
            output_dir: default_output_dir(),
            target_usernames: default_targets(),
            agent: AgentConfig::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_targets() -> Vec<String> {
    ["divit", "cheesepizzalover911", "rosescanbebluetoo", "S.A.M"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("downinthedm")
            .join("config.toml");
        Self { path }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the config, falling back to defaults on any problem.
    pub fn load(&self) -> DmConfig {
        if self.path.exists() {
            if let Ok(content) = fs::read_to_string(&self.path) {
                if let Ok(config) = toml::from_str(&content) {
                    return config;
                }
                tracing::warn!(path = %self.path.display(), "unparseable config, using defaults");
            }
        }
        DmConfig::default()
    }

    pub fn save(&self, config: &DmConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)
            .map_err(|e| DmError::Config(format!("Failed to serialize config to TOML: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_run() {
        let config = DmConfig::default();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport_width, 1280);
        assert_eq!(config.browser.viewport_height, 800);
        assert_eq!(config.timeouts.verification_detect_ms, 8_000);
        assert_eq!(config.timeouts.verification_wait_ms, 60_000);
        assert_eq!(config.target_usernames.len(), 4);
        assert_eq!(config.target_usernames[0], "divit");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.toml"));

        let mut config = DmConfig::default();
        config.browser.headless = true;
        config.target_usernames = vec!["alice".into()];
        manager.save(&config).unwrap();

        let loaded = manager.load();
        assert!(loaded.browser.headless);
        assert_eq!(loaded.target_usernames, vec!["alice".to_string()]);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let manager = ConfigManager::with_path(PathBuf::from("/nonexistent/config.toml"));
        let config = manager.load();
        assert_eq!(config.timeouts.popup_ms, 5_000);
    }

    #[test]
    fn credentials_require_both_vars() {
        std::env::remove_var("INSTAGRAM_USERNAME");
        std::env::remove_var("INSTAGRAM_PASSWORD");
        assert!(Credentials::from_env().is_err());
    }
}
