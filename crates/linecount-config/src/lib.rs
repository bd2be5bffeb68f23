//! Configuration for the linecount service and operator client.
//!
//! Layered loading (defaults → TOML file → `LINECOUNT_` environment),
//! validation, and translation to the transport and core types the
//! service is built from.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use linecount_core::{CatalogSeed, DeviceSeed};
use linecount_transport::{MqttConfig, Namespace};

/// Prefix for environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "LINECOUNT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub line: LineConfig,
    pub mqtt: MqttSection,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address for the control API.
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".into(),
        }
    }
}

/// Which line's topic namespace this instance serves.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LineConfig {
    pub site: String,
    pub line: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            site: "default".into(),
            line: "1".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MqttSection {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    /// Plaintext in the file; prefer `LINECOUNT_MQTT__PASSWORD`.
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            client_id: "linecount".into(),
            username: None,
            password: None,
            keep_alive_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("linecount.db"),
        }
    }
}

/// Reference data inserted at startup when missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub clients: Vec<String>,
    pub products: Vec<String>,
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "linecount", "linecount").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("linecount");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack: defaults, then the TOML file, then environment.
///
/// A missing file is not an error; figment skips it.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate config from `path` (or the platform default).
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        for (field, value) in [("line.site", &self.line.site), ("line.line", &self.line.line)] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
            if value.contains(['/', '+', '#']) {
                return Err(ConfigError::invalid(
                    field,
                    format!("'{value}' contains a topic separator or wildcard"),
                ));
            }
        }

        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::invalid("mqtt.host", "must not be empty"));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::invalid("mqtt.port", "must be between 1 and 65535"));
        }
        if self.mqtt.client_id.trim().is_empty() {
            return Err(ConfigError::invalid("mqtt.client_id", "must not be empty"));
        }
        if self.mqtt.keep_alive_secs == 0 {
            return Err(ConfigError::invalid("mqtt.keep_alive_secs", "must be at least 1"));
        }

        if let Some(device) = self.catalog.devices.iter().find(|d| d.code.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "catalog.devices",
                format!("device with description {:?} has an empty code", device.description),
            ));
        }
        Ok(())
    }

    /// Parsed `http.bind`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http.bind.parse().map_err(|_| {
            ConfigError::invalid("http.bind", format!("'{}' is not a socket address", self.http.bind))
        })
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.line.site.trim(), self.line.line.trim())
    }

    pub fn mqtt_config(&self) -> MqttConfig {
        MqttConfig {
            host: self.mqtt.host.clone(),
            port: self.mqtt.port,
            client_id: self.mqtt.client_id.clone(),
            username: self.mqtt.username.clone(),
            password: self.mqtt.password.clone().map(SecretString::from),
            keep_alive: Duration::from_secs(self.mqtt.keep_alive_secs),
        }
    }

    pub fn catalog_seed(&self) -> CatalogSeed {
        CatalogSeed {
            clients: self.catalog.clients.clone(),
            products: self.catalog.products.clone(),
            devices: self
                .catalog
                .devices
                .iter()
                .map(|d| DeviceSeed {
                    code: d.code.trim().to_owned(),
                    description: d.description.clone(),
                })
                .collect(),
        }
    }

    /// TOML rendering with secrets masked, for `config show`.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.mqtt.password.is_some() {
            shown.mqtt.password = Some("********".into());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    fn from_toml(contents: &str) -> Result<Config, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(file.path()))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 5000);
        assert_eq!(config.namespace().prefix(), "factory/default/line/1");
        assert_eq!(config.mqtt_config().port, 1883);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(dir.path().join("absent.toml")))
            .extract()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn file_overrides_defaults_per_key() {
        let config = from_toml(
            r#"
            [line]
            site = "plant-a"

            [mqtt]
            host = "broker.local"
            username = "line"
            password = "hunter2"

            [[catalog.devices]]
            code = " DEV1 "
            description = "press"
            "#,
        )
        .unwrap();

        assert_eq!(config.line.site, "plant-a");
        assert_eq!(config.line.line, "1");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.namespace().prefix(), "factory/plant-a/line/1");

        let mqtt = config.mqtt_config();
        assert_eq!(mqtt.host, "broker.local");
        assert!(mqtt.password.is_some());

        let seed = config.catalog_seed();
        assert_eq!(seed.devices[0].code, "DEV1");
    }

    #[test]
    fn zero_port_is_rejected() {
        let err = from_toml("[mqtt]\nport = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "mqtt.port"));
    }

    #[test]
    fn topic_characters_in_line_are_rejected() {
        let err = from_toml("[line]\nline = \"1/2\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "line.line"));

        let err = from_toml("[line]\nsite = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "line.site"));
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let err = from_toml("[http]\nbind = \"localhost\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "http.bind"));
    }

    #[test]
    fn wrong_type_is_a_loading_error() {
        let err = from_toml("[mqtt]\nport = \"many\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
    }

    #[test]
    fn redacted_toml_hides_password() {
        let mut config = Config::default();
        config.mqtt.password = Some("hunter2".into());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("********"));
    }

    #[test]
    fn config_path_ends_with_file_name() {
        assert!(config_path().ends_with("config.toml"));
    }
}
