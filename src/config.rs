use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Check whether a setting key (e.g. "server.port") is overridden by an env var.
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Get the env var name that overrides the given setting key.
    pub fn env_var_for(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    /// Get all overrides as a map of setting key -> env var name.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {key} (set {env_var})")]
    Missing {
        key: &'static str,
        env_var: &'static str,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Gemini web session settings. The cookie values come from a signed-in
/// browser session.
#[derive(Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    /// `__Secure-1PSID`.
    #[serde(default)]
    pub psid: String,
    /// `__Secure-1PSIDTS`.
    #[serde(default)]
    pub psidts: String,
    /// `__Secure-1PSIDCC`.
    #[serde(default)]
    pub psidcc: String,
    /// Minutes between access token refreshes. Zero disables refreshing.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Deep research can take minutes.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("psid", &redact(&self.psid))
            .field("psidts", &redact(&self.psidts))
            .field("psidcc", &redact(&self.psidcc))
            .field("refresh_interval_minutes", &self.refresh_interval_minutes)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            psid: String::new(),
            psidts: String::new(),
            psidcc: String::new(),
            refresh_interval_minutes: default_refresh_interval(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl GeminiConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_port() -> u16 {
    4981
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
const fn default_refresh_interval() -> u64 {
    5
}
fn default_base_url() -> String {
    crate::providers::gemini::constants::DEFAULT_BASE_URL.to_string()
}
const fn default_request_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading, env overrides, and validation
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. A missing file falls back to defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`] but reads overrides through `lookup`.
    pub fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_overrides(lookup);
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.psid.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "gemini.psid",
                env_var: "GEMINI_1PSID",
            });
        }
        if self.gemini.psidts.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "gemini.psidts",
                env_var: "GEMINI_1PSIDTS",
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                key: "server.port",
                message: "must be a non-zero port number".to_string(),
            });
        }
        if self.gemini.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "gemini.request_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if let Err(e) = url::Url::parse(&self.gemini.base_url) {
            return Err(ConfigError::Invalid {
                key: "gemini.base_url",
                message: e.to_string(),
            });
        }
        Ok(())
    }

    /// Apply overrides from `lookup` (normally the process environment).
    ///
    /// When an env var is set, its value replaces the file/default value and
    /// the setting key is recorded in `env_overrides`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let mut ov = EnvOverrides::default();

        // -- Helpers (macros for concise per-field overrides) --

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Some(val) = lookup($env) {
                    match val.trim().parse() {
                        Ok(parsed) => {
                            $field = parsed;
                            ov.record($key, $env);
                        }
                        Err(_) => {
                            tracing::warn!(env_var = $env, value = %val, "Ignoring unparsable override");
                        }
                    }
                }
            };
        }

        // -- Server --
        env_str!("server.host", "BRIDGES_SERVER_HOST", self.server.host);
        env_parse!("server.port", "PORT", self.server.port);
        env_parse!("server.port", "BRIDGES_SERVER_PORT", self.server.port);
        if let Some(val) = lookup("BRIDGES_CORS_ORIGINS") {
            self.server.cors_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            ov.record("server.cors_origins", "BRIDGES_CORS_ORIGINS");
        }

        // -- Gemini --
        env_str!("gemini.psid", "GEMINI_1PSID", self.gemini.psid);
        env_str!("gemini.psidts", "GEMINI_1PSIDTS", self.gemini.psidts);
        env_str!("gemini.psidcc", "GEMINI_1PSIDCC", self.gemini.psidcc);
        env_parse!(
            "gemini.refresh_interval_minutes",
            "GEMINI_REFRESH_INTERVAL",
            self.gemini.refresh_interval_minutes
        );

        // -- Logging --
        env_str!("logging.level", "LOG_LEVEL", self.logging.level);
        if lookup("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production")) {
            self.logging.json = true;
            ov.record("logging.json", "APP_ENV");
        }
        env_bool!("logging.json", "BRIDGES_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }
}
