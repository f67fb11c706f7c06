use crate::domain::{AttributeMapping, ServiceGroup, StaticAttribute};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Device record as written in a provisioning file.
///
/// Everything except the device id is optional; gaps are filled from the
/// device's service group and the agent defaults when the registry loads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedDevice {
    pub device_id: String,
    #[serde(default, rename = "apikey")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub subservice: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeMapping>,
    #[serde(default)]
    pub static_attributes: Vec<StaticAttribute>,
    #[serde(default)]
    pub timestamp: Option<bool>,
}

/// Snapshot of device and group provisioning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningFile {
    #[serde(default)]
    pub services: Vec<ServiceGroup>,
    #[serde(default)]
    pub devices: Vec<ProvisionedDevice>,
}

impl ProvisioningFile {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid provisioning document")
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read provisioning file {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse provisioning file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let json = r#"{
            "services": [
                {
                    "apikey": "80K09H324HV8732",
                    "service": "TestService",
                    "subservice": "/testingPath",
                    "entity_type": "SensorMachine"
                }
            ],
            "devices": [
                {
                    "device_id": "MQTT_2",
                    "service": "smartGondor",
                    "subservice": "/gardens",
                    "entity_name": "Second MQTT Device",
                    "entity_type": "AnMQTTDevice",
                    "attributes": [
                        {"object_id": "temperature", "name": "temperature", "type": "celsius"}
                    ]
                }
            ]
        }"#;

        let file = ProvisioningFile::from_json_str(json).unwrap();
        assert_eq!(file.services.len(), 1);
        assert_eq!(file.devices.len(), 1);
        assert_eq!(file.devices[0].api_key, None);
        assert_eq!(
            file.devices[0].entity_name.as_deref(),
            Some("Second MQTT Device")
        );
    }

    #[test]
    fn test_parse_empty_document() {
        let file = ProvisioningFile::from_json_str("{}").unwrap();
        assert!(file.services.is_empty());
        assert!(file.devices.is_empty());
    }

    #[test]
    fn test_parse_rejects_device_without_id() {
        let result = ProvisioningFile::from_json_str(r#"{"devices": [{"service": "s"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = ProvisioningFile::from_path("/nonexistent/provisioning.json");
        assert!(result.is_err());
    }
}
