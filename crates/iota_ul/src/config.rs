use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // MQTT configuration
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,

    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,

    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,

    #[serde(default)]
    pub mqtt_username: Option<String>,

    #[serde(default)]
    pub mqtt_password: Option<String>,

    #[serde(default = "default_mqtt_keepalive_secs")]
    pub mqtt_keepalive_secs: u64,

    /// Subscription QoS (0, 1 or 2)
    #[serde(default)]
    pub mqtt_qos: u8,

    /// Delay between reconnection attempts in seconds
    #[serde(default = "default_mqtt_retry_delay_secs")]
    pub mqtt_retry_delay_secs: u64,

    /// Consecutive failed connections before giving up, 0 for no limit
    #[serde(default)]
    pub mqtt_max_retry_attempts: u32,

    // Context broker configuration
    /// NGSI v2 context broker base URL
    #[serde(default = "default_context_broker_url")]
    pub context_broker_url: String,

    /// HTTP timeout for entity updates in seconds
    #[serde(default = "default_context_broker_timeout_secs")]
    pub context_broker_timeout_secs: u64,

    // Measure processing
    /// Add a TimeInstant to every update unless the device overrides it
    #[serde(default)]
    pub timestamp: bool,

    /// Send Number/Integer/Float/Boolean attributes as JSON values
    #[serde(default)]
    pub autocast: bool,

    #[serde(default = "default_attribute_type")]
    pub default_attribute_type: String,

    // Provisioning
    /// JSON file with the provisioned service groups and devices
    #[serde(default = "default_provisioning_file")]
    pub provisioning_file: String,

    /// Api key for provisioned devices without one
    #[serde(default = "default_api_key")]
    pub default_api_key: Option<String>,

    #[serde(default = "default_entity_type")]
    pub default_entity_type: String,

    #[serde(default = "default_service")]
    pub default_service: String,

    #[serde(default = "default_subservice")]
    pub default_subservice: String,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    /// Time allowed for closers on shutdown, in seconds
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("IOTA"))
            .build()?
            .try_deserialize()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// MQTT defaults
fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_client_id() -> String {
    "iota-ul".to_string()
}

fn default_mqtt_keepalive_secs() -> u64 {
    30
}

fn default_mqtt_retry_delay_secs() -> u64 {
    5
}

// Context broker defaults
fn default_context_broker_url() -> String {
    "http://localhost:1026".to_string()
}

fn default_context_broker_timeout_secs() -> u64 {
    10
}

fn default_attribute_type() -> String {
    common::domain::DEFAULT_ATTRIBUTE_TYPE.to_string()
}

// Provisioning defaults
fn default_provisioning_file() -> String {
    "provisioning/devices.json".to_string()
}

fn default_api_key() -> Option<String> {
    Some("1234".to_string())
}

fn default_entity_type() -> String {
    "Thing".to_string()
}

fn default_service() -> String {
    "default".to_string()
}

fn default_subservice() -> String {
    "/".to_string()
}

// OpenTelemetry defaults
fn default_otel_enabled() -> bool {
    false
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "iota-ul".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}
