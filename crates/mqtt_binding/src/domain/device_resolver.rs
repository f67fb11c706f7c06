use crate::mqtt::ParsedTopic;
use common::domain::{
    DeviceContext, DeviceRegistry, DomainError, DomainResult, FindDeviceInput, FindGroupInput,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves the device binding of a measure topic.
///
/// Individually provisioned devices take precedence; otherwise the device is
/// resolved through the service group of its api key.
pub struct DeviceResolver {
    registry: Arc<dyn DeviceRegistry>,
    default_entity_type: String,
}

impl DeviceResolver {
    pub fn new(registry: Arc<dyn DeviceRegistry>, default_entity_type: impl Into<String>) -> Self {
        Self {
            registry,
            default_entity_type: default_entity_type.into(),
        }
    }

    #[instrument(
        skip_all,
        fields(api_key = %topic.api_key, device_id = %topic.device_id)
    )]
    pub async fn resolve(&self, topic: &ParsedTopic) -> DomainResult<DeviceContext> {
        let device = self
            .registry
            .find_device_by_api_key_and_id(FindDeviceInput {
                api_key: topic.api_key.clone(),
                device_id: topic.device_id.clone(),
            })
            .await?;

        let group = self
            .registry
            .find_group_by_api_key(FindGroupInput {
                api_key: topic.api_key.clone(),
            })
            .await?;

        match (device, group) {
            (Some(device), Some(group)) => {
                debug!(entity_name = %device.entity_name, "resolved provisioned device with group defaults");
                Ok(device.with_group_defaults(&group))
            }
            (Some(device), None) => {
                debug!(entity_name = %device.entity_name, "resolved provisioned device");
                Ok(device)
            }
            (None, Some(group)) => {
                let device =
                    DeviceContext::from_group(&group, &topic.device_id, &self.default_entity_type);
                debug!(entity_name = %device.entity_name, "resolved device through service group");
                Ok(device)
            }
            (None, None) => Err(DomainError::DeviceNotFound {
                api_key: topic.api_key.clone(),
                device_id: topic.device_id.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{AttributeMapping, ServiceGroup};
    use common::MockDeviceRegistry;

    fn topic(api_key: &str, device_id: &str) -> ParsedTopic {
        ParsedTopic {
            api_key: api_key.to_string(),
            device_id: device_id.to_string(),
            attribute: None,
        }
    }

    fn provisioned_device() -> DeviceContext {
        DeviceContext {
            device_id: "MQTT_2".to_string(),
            api_key: "1234".to_string(),
            service: "smartGondor".to_string(),
            subservice: "/gardens".to_string(),
            entity_name: "Second MQTT Device".to_string(),
            entity_type: "AnMQTTDevice".to_string(),
            attributes: vec![],
            static_attributes: vec![],
            timestamp: None,
        }
    }

    fn group() -> ServiceGroup {
        ServiceGroup {
            api_key: "80K09H324HV8732".to_string(),
            service: "TestService".to_string(),
            subservice: "/testingPath".to_string(),
            entity_type: Some("SensorMachine".to_string()),
            attributes: vec![AttributeMapping::new("t", "temperature", "celsius")],
            static_attributes: vec![],
            timestamp: Some(true),
        }
    }

    #[tokio::test]
    async fn test_resolve_provisioned_device() {
        let mut registry = MockDeviceRegistry::new();
        registry
            .expect_find_device_by_api_key_and_id()
            .withf(|input: &FindDeviceInput| input.api_key == "1234" && input.device_id == "MQTT_2")
            .times(1)
            .returning(|_| Ok(Some(provisioned_device())));
        registry
            .expect_find_group_by_api_key()
            .times(1)
            .returning(|_| Ok(None));

        let resolver = DeviceResolver::new(Arc::new(registry), "Thing");
        let device = resolver.resolve(&topic("1234", "MQTT_2")).await.unwrap();

        assert_eq!(device, provisioned_device());
    }

    #[tokio::test]
    async fn test_resolve_provisioned_device_merges_group_defaults() {
        let mut registry = MockDeviceRegistry::new();
        registry
            .expect_find_device_by_api_key_and_id()
            .returning(|_| Ok(Some(provisioned_device())));
        registry
            .expect_find_group_by_api_key()
            .returning(|_| Ok(Some(group())));

        let resolver = DeviceResolver::new(Arc::new(registry), "Thing");
        let device = resolver.resolve(&topic("1234", "MQTT_2")).await.unwrap();

        assert_eq!(device.entity_name, "Second MQTT Device");
        assert_eq!(device.attributes.len(), 1);
        assert_eq!(device.timestamp, Some(true));
    }

    #[tokio::test]
    async fn test_resolve_unprovisioned_device_through_group() {
        let mut registry = MockDeviceRegistry::new();
        registry
            .expect_find_device_by_api_key_and_id()
            .returning(|_| Ok(None));
        registry
            .expect_find_group_by_api_key()
            .withf(|input: &FindGroupInput| input.api_key == "80K09H324HV8732")
            .returning(|_| Ok(Some(group())));

        let resolver = DeviceResolver::new(Arc::new(registry), "Thing");
        let device = resolver
            .resolve(&topic("80K09H324HV8732", "MQTT_UNPROVISIONED"))
            .await
            .unwrap();

        assert_eq!(device.entity_name, "SensorMachine:MQTT_UNPROVISIONED");
        assert_eq!(device.service, "TestService");
        assert_eq!(device.subservice, "/testingPath");
    }

    #[tokio::test]
    async fn test_resolve_unknown_device() {
        let mut registry = MockDeviceRegistry::new();
        registry
            .expect_find_device_by_api_key_and_id()
            .returning(|_| Ok(None));
        registry
            .expect_find_group_by_api_key()
            .returning(|_| Ok(None));

        let resolver = DeviceResolver::new(Arc::new(registry), "Thing");
        let result = resolver.resolve(&topic("nokey", "ghost")).await;

        assert!(matches!(
            result,
            Err(DomainError::DeviceNotFound { api_key, device_id })
                if api_key == "nokey" && device_id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_resolve_propagates_registry_error() {
        let mut registry = MockDeviceRegistry::new();
        registry
            .expect_find_device_by_api_key_and_id()
            .returning(|_| Err(DomainError::RepositoryError(anyhow::anyhow!("registry down"))));
        registry.expect_find_group_by_api_key().times(0);

        let resolver = DeviceResolver::new(Arc::new(registry), "Thing");
        let result = resolver.resolve(&topic("1234", "MQTT_2")).await;

        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }
}
