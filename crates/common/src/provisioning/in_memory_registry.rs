use crate::domain::{
    DeviceContext, DeviceRegistry, DomainError, DomainResult, FindDeviceInput, FindGroupInput,
    ServiceGroup,
};
use crate::provisioning::{ProvisionedDevice, ProvisioningFile};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Values applied to provisioning records that leave them open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDefaults {
    /// Api key for devices that have none and belong to no group
    pub default_api_key: Option<String>,
    pub default_service: String,
    pub default_subservice: String,
    pub default_entity_type: String,
}

impl Default for RegistryDefaults {
    fn default() -> Self {
        Self {
            default_api_key: None,
            default_service: "default".to_string(),
            default_subservice: "/".to_string(),
            default_entity_type: "Thing".to_string(),
        }
    }
}

/// Registry snapshot held in memory, keyed by `(api_key, device_id)` for
/// devices and by api key for groups. Immutable once loaded.
#[derive(Debug, Default)]
pub struct InMemoryDeviceRegistry {
    devices: HashMap<(String, String), DeviceContext>,
    groups: HashMap<String, ServiceGroup>,
}

impl InMemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a provisioning snapshot, resolving every device's api key,
    /// tenant and entity.
    ///
    /// A device without an explicit api key takes the key of the group
    /// provisioned for its service/subservice, then the default key.
    pub fn from_provisioning(
        file: ProvisioningFile,
        defaults: &RegistryDefaults,
    ) -> DomainResult<Self> {
        let mut groups = HashMap::new();
        for group in &file.services {
            if groups
                .insert(group.api_key.clone(), group.clone())
                .is_some()
            {
                return Err(DomainError::InvalidConfig(format!(
                    "duplicate service group for api key {}",
                    group.api_key
                )));
            }
        }

        let mut devices = HashMap::new();
        for device in file.devices {
            let ctx = resolve_device(device, &file.services, &groups, defaults)?;
            let key = (ctx.api_key.clone(), ctx.device_id.clone());
            if devices.contains_key(&key) {
                return Err(DomainError::InvalidConfig(format!(
                    "duplicate device {} for api key {}",
                    key.1, key.0
                )));
            }
            devices.insert(key, ctx);
        }

        debug!(
            devices = devices.len(),
            groups = groups.len(),
            "loaded provisioning snapshot"
        );

        Ok(Self { devices, groups })
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

fn resolve_device(
    device: ProvisionedDevice,
    services: &[ServiceGroup],
    groups: &HashMap<String, ServiceGroup>,
    defaults: &RegistryDefaults,
) -> DomainResult<DeviceContext> {
    let explicit_group = device.api_key.as_ref().and_then(|key| groups.get(key));

    let service = device
        .service
        .or_else(|| explicit_group.map(|g| g.service.clone()))
        .unwrap_or_else(|| defaults.default_service.clone());
    let subservice = device
        .subservice
        .or_else(|| explicit_group.map(|g| g.subservice.clone()))
        .unwrap_or_else(|| defaults.default_subservice.clone());

    let api_key = match device.api_key {
        Some(key) => key,
        None => services
            .iter()
            .find(|g| g.service == service && g.subservice == subservice)
            .map(|g| g.api_key.clone())
            .or_else(|| defaults.default_api_key.clone())
            .ok_or_else(|| {
                DomainError::InvalidConfig(format!(
                    "device {} has no api key and no group or default key applies",
                    device.device_id
                ))
            })?,
    };

    let entity_type = device
        .entity_type
        .or_else(|| groups.get(&api_key).and_then(|g| g.entity_type.clone()))
        .unwrap_or_else(|| defaults.default_entity_type.clone());
    let entity_name = device
        .entity_name
        .unwrap_or_else(|| format!("{}:{}", entity_type, device.device_id));

    Ok(DeviceContext {
        device_id: device.device_id,
        api_key,
        service,
        subservice,
        entity_name,
        entity_type,
        attributes: device.attributes,
        static_attributes: device.static_attributes,
        timestamp: device.timestamp,
    })
}

#[async_trait]
impl DeviceRegistry for InMemoryDeviceRegistry {
    async fn find_device_by_api_key_and_id(
        &self,
        input: FindDeviceInput,
    ) -> DomainResult<Option<DeviceContext>> {
        Ok(self
            .devices
            .get(&(input.api_key, input.device_id))
            .cloned())
    }

    async fn find_group_by_api_key(
        &self,
        input: FindGroupInput,
    ) -> DomainResult<Option<ServiceGroup>> {
        Ok(self.groups.get(&input.api_key).cloned())
    }
}
