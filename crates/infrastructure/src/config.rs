use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use domain::plug::PlugConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One entry of the `plugs` array
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlugEntry {
    pub model: String,
    pub gpio_pin: u32,
    /// Milliseconds
    pub lock_duration: u64,
    pub device_id: String,
    pub secret: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AgentConfig {
    pub log_level: String,
    pub driver: String,
    pub gateway_url: String,
    pub gateway_namespace: String,
    /// Milliseconds
    pub reconn_delay: u64,
    pub reconn_attempts: u32,
    pub plugs: Vec<PlugEntry>,
}

impl AgentConfig {
    /// Load the JSON configuration at `path`, then apply environment
    /// overrides (e.g. `PLUG__LOG_LEVEL=DEBUG`).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::from_source(File::new(path, FileFormat::Json).required(true))
    }

    /// Parse a JSON document, applying the same validation as [`AgentConfig::load`]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_source(File::from_str(json, FileFormat::Json))
    }

    fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let s = Config::builder()
            .add_source(source)
            .add_source(Environment::with_prefix("PLUG").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "\"gateway_url\" must not be empty".to_string(),
            ));
        }

        let mut pins = HashSet::new();
        let mut device_ids = HashSet::new();
        for plug in &self.plugs {
            if !pins.insert(plug.gpio_pin) {
                return Err(ConfigError::Message(format!(
                    "array \"plugs\" uses gpio_pin {} more than once",
                    plug.gpio_pin
                )));
            }
            if !device_ids.insert(plug.device_id.as_str()) {
                return Err(ConfigError::Message(format!(
                    "array \"plugs\" uses device_id \"{}\" more than once",
                    plug.device_id
                )));
            }
        }

        Ok(())
    }

    /// Expand every plug entry with the shared gateway parameters
    pub fn plug_configs(&self) -> Vec<PlugConfig> {
        self.plugs
            .iter()
            .map(|plug| PlugConfig {
                model: plug.model.clone(),
                gpio_pin: plug.gpio_pin,
                lock_duration_ms: plug.lock_duration,
                device_id: plug.device_id.clone(),
                secret: plug.secret.clone(),
                gateway_url: self.gateway_url.clone(),
                gateway_namespace: self.gateway_namespace.clone(),
                reconn_delay_ms: self.reconn_delay,
                reconn_attempts: self.reconn_attempts,
            })
            .collect()
    }
}

/// Map a log level name onto a tracing level directive
pub fn log_level_directive(name: &str) -> Option<&'static str> {
    match name.to_ascii_uppercase().as_str() {
        "VERBOSE" | "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "LOG" | "INFO" => Some("info"),
        "WARN" | "WARNING" => Some("warn"),
        "ERROR" | "FATAL" => Some("error"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "log_level": "VERBOSE",
        "driver": "TEST",
        "gateway_url": "mqtt://192.168.1.10:1883",
        "gateway_namespace": "homecontroller",
        "reconn_delay": 5000,
        "reconn_attempts": 10,
        "plugs": [
            { "model": "PLUG_V1", "gpio_pin": 17, "lock_duration": 1000,
              "device_id": "plug-1", "secret": "one" },
            { "model": "PLUG_V1", "gpio_pin": 27, "lock_duration": 250,
              "device_id": "plug-2", "secret": "two" }
        ]
    }"#;

    #[test]
    fn test_parse_valid_config() {
        let config = AgentConfig::from_json(VALID).unwrap();

        assert_eq!(config.driver, "TEST");
        assert_eq!(config.reconn_delay, 5000);
        assert_eq!(config.plugs.len(), 2);
        assert_eq!(config.plugs[1].gpio_pin, 27);
        assert_eq!(log_level_directive(&config.log_level), Some("trace"));
    }

    #[test]
    fn test_plug_configs_carry_gateway_parameters() {
        let config = AgentConfig::from_json(VALID).unwrap();
        let plugs = config.plug_configs();

        assert_eq!(plugs.len(), 2);
        let first = &plugs[0];
        assert_eq!(first.model, "PLUG_V1");
        assert_eq!(first.gpio_pin, 17);
        assert_eq!(first.lock_duration_ms, 1000);
        assert_eq!(first.device_id, "plug-1");
        assert_eq!(first.secret, "one");
        assert_eq!(first.gateway_url, "mqtt://192.168.1.10:1883");
        assert_eq!(first.gateway_namespace, "homecontroller");
        assert_eq!(first.reconn_delay_ms, 5000);
        assert_eq!(first.reconn_attempts, 10);
    }

    #[test]
    fn test_missing_field_is_error() {
        let json = VALID.replace("\"driver\": \"TEST\",", "");
        assert!(AgentConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_missing_plug_field_is_error() {
        let json = VALID.replace("\"secret\": \"two\"", "\"unused\": \"two\"");
        assert!(AgentConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_plugs_must_be_an_array() {
        let json = r#"{
            "log_level": "LOG", "driver": "TEST", "gateway_url": "localhost",
            "gateway_namespace": "hc", "reconn_delay": 1, "reconn_attempts": 1,
            "plugs": "none"
        }"#;
        assert!(AgentConfig::from_json(json).is_err());
    }

    #[test]
    fn test_non_numeric_lock_duration_is_error() {
        let json = VALID.replace("\"lock_duration\": 250", "\"lock_duration\": \"long\"");
        assert!(AgentConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_duplicate_pin_is_error() {
        let json = VALID.replace("\"gpio_pin\": 27", "\"gpio_pin\": 17");
        let err = AgentConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("gpio_pin 17"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AgentConfig::load("does/not/exist.json").is_err());
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(log_level_directive("VERBOSE"), Some("trace"));
        assert_eq!(log_level_directive("debug"), Some("debug"));
        assert_eq!(log_level_directive("LOG"), Some("info"));
        assert_eq!(log_level_directive("WARN"), Some("warn"));
        assert_eq!(log_level_directive("FATAL"), Some("error"));
        assert_eq!(log_level_directive("LOUD"), None);
    }
}
