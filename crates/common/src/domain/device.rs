use crate::domain::result::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Attribute name that carries the measurement timestamp in NGSI
pub const TIME_INSTANT_ATTRIBUTE: &str = "TimeInstant";

/// Maps a wire key (`object_id`) to a typed NGSI attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
}

impl AttributeMapping {
    pub fn new(object_id: &str, name: &str, attr_type: &str) -> Self {
        Self {
            object_id: Some(object_id.to_string()),
            name: name.to_string(),
            attr_type: attr_type.to_string(),
        }
    }

    /// Key under which the device reports this attribute
    pub fn wire_key(&self) -> &str {
        self.object_id.as_deref().unwrap_or(&self.name)
    }
}

/// Attribute sent with every update of a device, regardless of the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: String,
    pub value: serde_json::Value,
}

/// Group (service) provisioning for an api key.
///
/// Devices that were never provisioned individually but publish under this
/// api key are resolved through the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroup {
    #[serde(rename = "apikey")]
    pub api_key: String,
    pub service: String,
    pub subservice: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeMapping>,
    #[serde(default)]
    pub static_attributes: Vec<StaticAttribute>,
    #[serde(default)]
    pub timestamp: Option<bool>,
}

/// Resolved device binding used to build entity updates
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceContext {
    pub device_id: String,
    pub api_key: String,
    pub service: String,
    pub subservice: String,
    pub entity_name: String,
    pub entity_type: String,
    pub attributes: Vec<AttributeMapping>,
    pub static_attributes: Vec<StaticAttribute>,
    /// Per-device override of the global timestamp setting
    pub timestamp: Option<bool>,
}

impl DeviceContext {
    /// Build the context of an unprovisioned device from its group.
    ///
    /// The entity is named `{entity_type}:{device_id}`.
    pub fn from_group(group: &ServiceGroup, device_id: &str, default_entity_type: &str) -> Self {
        let entity_type = group
            .entity_type
            .clone()
            .unwrap_or_else(|| default_entity_type.to_string());

        Self {
            device_id: device_id.to_string(),
            api_key: group.api_key.clone(),
            service: group.service.clone(),
            subservice: group.subservice.clone(),
            entity_name: format!("{}:{}", entity_type, device_id),
            entity_type,
            attributes: group.attributes.clone(),
            static_attributes: group.static_attributes.clone(),
            timestamp: group.timestamp,
        }
    }

    /// Fill what the device provisioning left open with the group's values.
    /// Device values always win.
    pub fn with_group_defaults(mut self, group: &ServiceGroup) -> Self {
        for mapping in &group.attributes {
            let known = self
                .attributes
                .iter()
                .any(|m| m.wire_key() == mapping.wire_key() || m.name == mapping.name);
            if !known {
                self.attributes.push(mapping.clone());
            }
        }

        for attribute in &group.static_attributes {
            if !self.static_attributes.iter().any(|a| a.name == attribute.name) {
                self.static_attributes.push(attribute.clone());
            }
        }

        if self.timestamp.is_none() {
            self.timestamp = group.timestamp;
        }

        self
    }

    /// Look up the mapping for a wire key, first by `object_id`, then by name
    pub fn mapping_for(&self, key: &str) -> Option<&AttributeMapping> {
        self.attributes
            .iter()
            .find(|m| m.object_id.as_deref() == Some(key))
            .or_else(|| self.attributes.iter().find(|m| m.name == key))
    }

    pub fn timestamp_enabled(&self, global: bool) -> bool {
        self.timestamp.unwrap_or(global)
    }
}

/// Input for looking up an individually provisioned device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindDeviceInput {
    pub api_key: String,
    pub device_id: String,
}

/// Input for looking up a service group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindGroupInput {
    pub api_key: String,
}

/// Read-only view of the provisioning registry.
///
/// Provisioning itself (devices and groups) is owned elsewhere; the
/// measurement pipeline only queries.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Find a device provisioned under the given api key
    async fn find_device_by_api_key_and_id(
        &self,
        input: FindDeviceInput,
    ) -> DomainResult<Option<DeviceContext>>;

    /// Find the service group provisioned for an api key
    async fn find_group_by_api_key(&self, input: FindGroupInput)
        -> DomainResult<Option<ServiceGroup>>;
}
