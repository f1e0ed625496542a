//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `mb-gateway.toml`
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the environment value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Error;

/// Default config file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "mb-gateway.toml";

/// Main configuration for mb-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Messenger Platform settings
    #[serde(default)]
    pub facebook: FacebookConfig,

    /// Dialogflow settings
    #[serde(default)]
    pub dialogflow: DialogflowConfig,

    /// Weather lookup settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Webhook server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Reply pacing
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Per-recipient session registry
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    /// Page access token used for the Send API
    pub page_token: String,

    /// Token echoed back by the webhook verification handshake
    pub verify_token: String,

    /// Graph API base URL
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            page_token: String::new(),
            verify_token: String::new(),
            graph_url: default_graph_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogflowConfig {
    /// Google Cloud project hosting the agent
    pub project_id: String,

    /// Query language, e.g. `en-US`
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// OAuth2 bearer token for the Dialogflow REST API
    pub access_token: Option<String>,

    /// Dialogflow REST base URL
    #[serde(default = "default_dialogflow_url")]
    pub base_url: String,
}

impl Default for DialogflowConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            language_code: default_language_code(),
            access_token: None,
            base_url: default_dialogflow_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap application id
    pub api_key: Option<String>,

    /// OpenWeatherMap base URL
    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the webhook server
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Gap between consecutive reply messages in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl ReplyConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a recipient's session is dropped
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
        }
    }
}

fn default_graph_url() -> String {
    "https://graph.facebook.com/v3.2".to_string()
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_dialogflow_url() -> String {
    "https://dialogflow.googleapis.com/v2".to_string()
}

fn default_weather_url() -> String {
    "http://api.openweathermap.org/data/2.5".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "data/mb-gateway.db".to_string()
}

fn default_interval_ms() -> u64 {
    1100
}

fn default_session_ttl() -> u64 {
    3600
}

impl Config {
    /// Replace `${VAR_NAME}` with the value of the environment variable.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load settings from a TOML file, then apply environment overrides.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(toml))
    }

    /// Load from `./mb-gateway.toml`, or from the environment alone when the
    /// file does not exist.
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let facebook = toml.facebook.unwrap_or_default();
        let dialogflow = toml.dialogflow.unwrap_or_default();
        let weather = toml.weather.unwrap_or_default();
        let server = toml.server.unwrap_or_default();
        let storage = toml.storage.unwrap_or_default();
        let reply = toml.reply.unwrap_or_default();
        let session = toml.session.unwrap_or_default();

        Config {
            facebook: FacebookConfig {
                page_token: facebook.page_token.unwrap_or_default(),
                verify_token: facebook.verify_token.unwrap_or_default(),
                graph_url: facebook.graph_url.unwrap_or_else(default_graph_url),
            },
            dialogflow: DialogflowConfig {
                project_id: dialogflow.project_id.unwrap_or_default(),
                language_code: dialogflow
                    .language_code
                    .unwrap_or_else(default_language_code),
                access_token: dialogflow.access_token.filter(|t| !t.is_empty()),
                base_url: dialogflow.base_url.unwrap_or_else(default_dialogflow_url),
            },
            weather: WeatherConfig {
                api_key: weather.api_key.filter(|k| !k.is_empty()),
                base_url: weather.base_url.unwrap_or_else(default_weather_url),
            },
            server: ServerConfig {
                port: server.port.unwrap_or_else(default_port),
            },
            storage: StorageConfig {
                db_path: storage.db_path.unwrap_or_else(default_db_path),
            },
            reply: ReplyConfig {
                interval_ms: reply.interval_ms.unwrap_or_else(default_interval_ms),
            },
            session: SessionConfig {
                ttl_secs: session.ttl_secs.unwrap_or_else(default_session_ttl),
            },
        }
    }

    /// Environment variables win over file values
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("FB_PAGE_TOKEN") {
            self.facebook.page_token = token;
        }
        if let Ok(token) = std::env::var("FB_VERIFY_TOKEN") {
            self.facebook.verify_token = token;
        }
        if let Ok(url) = std::env::var("FB_GRAPH_URL") {
            if !url.is_empty() {
                self.facebook.graph_url = url;
            }
        }

        if let Ok(project) = std::env::var("GOOGLE_PROJECT_ID") {
            self.dialogflow.project_id = project;
        }
        if let Ok(code) = std::env::var("DF_LANGUAGE_CODE") {
            if !code.is_empty() {
                self.dialogflow.language_code = code;
            }
        }
        if let Ok(token) = std::env::var("DF_ACCESS_TOKEN") {
            if !token.is_empty() {
                self.dialogflow.access_token = Some(token);
            }
        }
        if let Ok(url) = std::env::var("DF_BASE_URL") {
            if !url.is_empty() {
                self.dialogflow.base_url = url;
            }
        }

        if let Ok(key) = std::env::var("WEATHER_API_KEY") {
            if !key.is_empty() {
                self.weather.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("WEATHER_BASE_URL") {
            if !url.is_empty() {
                self.weather.base_url = url;
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(path) = std::env::var("DB_PATH") {
            self.storage.db_path = path;
        }
        if let Ok(ms) = std::env::var("REPLY_INTERVAL_MS") {
            if let Ok(ms) = ms.parse() {
                self.reply.interval_ms = ms;
            }
        }
        if let Ok(secs) = std::env::var("SESSION_TTL_SECS") {
            if let Ok(secs) = secs.parse() {
                self.session.ttl_secs = secs;
            }
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Fail on the first missing required setting
    pub fn validate(&self) -> crate::Result<()> {
        let required = [
            ("FB_PAGE_TOKEN", &self.facebook.page_token),
            ("FB_VERIFY_TOKEN", &self.facebook.verify_token),
            ("GOOGLE_PROJECT_ID", &self.dialogflow.project_id),
            ("DF_LANGUAGE_CODE", &self.dialogflow.language_code),
        ];

        for (name, value) in required {
            if value.is_empty() {
                return Err(Error::Config(format!("missing {}", name)));
            }
        }

        Ok(())
    }
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    facebook: Option<TomlFacebookConfig>,
    dialogflow: Option<TomlDialogflowConfig>,
    weather: Option<TomlWeatherConfig>,
    server: Option<TomlServerConfig>,
    storage: Option<TomlStorageConfig>,
    reply: Option<TomlReplyConfig>,
    session: Option<TomlSessionConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlFacebookConfig {
    page_token: Option<String>,
    verify_token: Option<String>,
    graph_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDialogflowConfig {
    project_id: Option<String>,
    language_code: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlWeatherConfig {
    api_key: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlStorageConfig {
    db_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlReplyConfig {
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlSessionConfig {
    ttl_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Tests that read override variables must not interleave with tests that set them
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: [&str; 5] = [
        "FB_PAGE_TOKEN",
        "PORT",
        "DB_PATH",
        "REPLY_INTERVAL_MS",
        "SESSION_TTL_SECS",
    ];

    fn clear_override_vars() {
        for var in OVERRIDE_VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.reply.interval(), Duration::from_millis(1100));
        assert_eq!(config.storage.db_path, "data/mb-gateway.db");
        assert_eq!(config.session.ttl_secs, 3600);
        assert_eq!(config.dialogflow.language_code, "en-US");
        assert!(config.weather.api_key.is_none());
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("MB_GATEWAY_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${MB_GATEWAY_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${MB_GATEWAY_NONEXISTENT}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("MB_GATEWAY_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("cost: $5"), "cost: $5");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[facebook]
page_token = "page"
verify_token = "verify"

[dialogflow]
project_id = "my-agent"
language_code = "de"
access_token = ""

[weather]
api_key = "owm"

[server]
port = 8080

[reply]
interval_ms = 500
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.facebook.page_token, "page");
        assert_eq!(config.facebook.verify_token, "verify");
        assert_eq!(config.facebook.graph_url, "https://graph.facebook.com/v3.2");
        assert_eq!(config.dialogflow.project_id, "my-agent");
        assert_eq!(config.dialogflow.language_code, "de");
        assert!(config.dialogflow.access_token.is_none());
        assert_eq!(config.weather.api_key.as_deref(), Some("owm"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.reply.interval_ms, 500);
        assert_eq!(config.session.ttl_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_override_vars();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\ndb_path = \"/tmp/bridge.db\"").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.storage.db_path, "/tmp/bridge.db");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_override_vars();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[facebook]\npage_token = \"file-page\"\n[server]\nport = 8080\n[reply]\ninterval_ms = 500"
        )
        .unwrap();

        unsafe {
            std::env::set_var("FB_PAGE_TOKEN", "env-page");
            std::env::set_var("PORT", "9090");
            std::env::set_var("REPLY_INTERVAL_MS", "250");
            std::env::set_var("SESSION_TTL_SECS", "60");
        }

        let config = Config::from_toml_file(file.path()).unwrap();
        clear_override_vars();

        assert_eq!(config.facebook.page_token, "env-page");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.reply.interval(), Duration::from_millis(250));
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.storage.db_path, "data/mb-gateway.db");
    }

    #[test]
    fn test_unparseable_env_numbers_ignored() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_override_vars();

        unsafe {
            std::env::set_var("PORT", "abc");
            std::env::set_var("REPLY_INTERVAL_MS", "-5");
            std::env::set_var("SESSION_TTL_SECS", "1h");
        }

        let config = Config::from_env().unwrap();
        clear_override_vars();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.reply.interval_ms, 1100);
        assert_eq!(config.session.ttl_secs, 3600);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml_str("[server\nport = 1");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_reports_missing_token() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: missing FB_PAGE_TOKEN");
    }
}
