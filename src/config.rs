use crate::error::{BotError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection settings for the Stable Diffusion WebUI instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdAuthConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub use_https: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_defaults_path() -> PathBuf {
    PathBuf::from("defaults.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub admins: Vec<u64>,
    /// The bot's own user id; only its messages may be deleted through the bot.
    #[serde(default)]
    pub bot_user_id: u64,
    pub sd_auth: SdAuthConfig,
    #[serde(default = "default_defaults_path")]
    pub defaults_path: PathBuf,
}

impl Default for SdAuthConfig {
    fn default() -> Self {
        SdAuthConfig {
            host: "127.0.0.1".to_string(),
            port: 7860,
            use_https: false,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SdAuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_https(mut self, enabled: bool) -> Self {
        self.use_https = enabled;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Base URL of the WebUI API, e.g. `http://127.0.0.1:7860/sdapi/v1`.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{}://{}:{}/sdapi/v1", scheme, self.host, self.port)
    }

    /// Credentials are only used when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some((user.as_str(), pass.as_str()))
            }
            _ => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = env::var("SD_HOST") {
            self.host = host;
        }
        if let Some(port) = env::var("SD_PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Ok(val) = env::var("SD_USE_HTTPS") {
            self.use_https = val == "true" || val == "1";
        }
        if let Ok(user) = env::var("SD_USERNAME") {
            self.username = Some(user);
        }
        if let Ok(pass) = env::var("SD_PASSWORD") {
            self.password = Some(pass);
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token: None,
            prefix: None,
            admins: Vec::new(),
            bot_user_id: 0,
            sd_auth: SdAuthConfig::default(),
            defaults_path: default_defaults_path(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `config.json`-style settings from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BotError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| BotError::Config(format!("invalid config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Environment variables win over values read from file.
    pub fn apply_env(&mut self) {
        if let Ok(token) = env::var("SDBOT_TOKEN") {
            self.token = Some(token);
        }
        if let Ok(prefix) = env::var("SDBOT_PREFIX") {
            self.prefix = Some(prefix);
        }
        if let Some(id) = env::var("SDBOT_USER_ID").ok().and_then(|v| v.parse().ok()) {
            self.bot_user_id = id;
        }
        if let Ok(path) = env::var("SDBOT_DEFAULTS_PATH") {
            self.defaults_path = PathBuf::from(path);
        }
        self.sd_auth.apply_env();
    }

    pub fn with_sd_auth(mut self, sd_auth: SdAuthConfig) -> Self {
        self.sd_auth = sd_auth;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_admins(mut self, admins: Vec<u64>) -> Self {
        self.admins = admins;
        self
    }

    pub fn with_bot_user_id(mut self, id: u64) -> Self {
        self.bot_user_id = id;
        self
    }

    pub fn with_defaults_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.defaults_path = path.into();
        self
    }

    pub fn command_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or("/")
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admins.contains(&user_id)
    }
}
