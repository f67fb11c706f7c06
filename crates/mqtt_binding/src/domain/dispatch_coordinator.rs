use chrono::Utc;
use common::domain::{
    ContextBrokerClient, DeviceContext, DomainError, DomainResult, MappedAttributeSet,
    UpdateRequest,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Turns mapped measure groups into entity updates and sends them
pub struct DispatchCoordinator {
    client: Arc<dyn ContextBrokerClient>,
    timestamp: bool,
}

impl DispatchCoordinator {
    pub fn new(client: Arc<dyn ContextBrokerClient>, timestamp: bool) -> Self {
        Self { client, timestamp }
    }

    /// Build the update of one measure group. When timestamping is on and
    /// the group carried no timestamp of its own, the current time is used.
    pub fn build_request(&self, device: &DeviceContext, mapped: MappedAttributeSet) -> UpdateRequest {
        let timestamp = mapped.timestamp.or_else(|| {
            device
                .timestamp_enabled(self.timestamp)
                .then(Utc::now)
        });

        UpdateRequest {
            entity_id: device.entity_name.clone(),
            entity_type: device.entity_type.clone(),
            service: device.service.clone(),
            subservice: device.subservice.clone(),
            attributes: mapped.attributes,
            timestamp,
        }
    }

    /// Send one update. Failures are logged and not retried.
    #[instrument(
        skip_all,
        fields(
            entity_id = %request.entity_id,
            attribute_count = request.attributes.len(),
        )
    )]
    pub async fn dispatch(&self, request: &UpdateRequest) -> DomainResult<()> {
        match self.client.update_entity(request).await {
            Ok(()) => {
                debug!("entity update dispatched");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to dispatch entity update");
                match e {
                    DomainError::DispatchError(_) => Err(e),
                    other => Err(DomainError::DispatchError(other.to_string())),
                }
            }
        }
    }

    /// Send every update concurrently. Results are returned in request
    /// order; one failure does not affect the others.
    pub async fn dispatch_all(&self, requests: &[UpdateRequest]) -> Vec<DomainResult<()>> {
        join_all(requests.iter().map(|request| self.dispatch(request))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::MappedAttribute;
    use common::MockContextBrokerClient;

    fn device(timestamp: Option<bool>) -> DeviceContext {
        DeviceContext {
            device_id: "MQTT_2".to_string(),
            api_key: "1234".to_string(),
            service: "smartGondor".to_string(),
            subservice: "/gardens".to_string(),
            entity_name: "Second MQTT Device".to_string(),
            entity_type: "AnMQTTDevice".to_string(),
            attributes: vec![],
            static_attributes: vec![],
            timestamp,
        }
    }

    fn mapped(name: &str, value: &str) -> MappedAttributeSet {
        MappedAttributeSet {
            attributes: vec![MappedAttribute::text(name, "Text", value)],
            timestamp: None,
        }
    }

    #[test]
    fn test_build_request_carries_device_binding() {
        let coordinator = DispatchCoordinator::new(Arc::new(MockContextBrokerClient::new()), false);
        let request = coordinator.build_request(&device(None), mapped("temperature", "23"));

        assert_eq!(request.entity_id, "Second MQTT Device");
        assert_eq!(request.entity_type, "AnMQTTDevice");
        assert_eq!(request.service, "smartGondor");
        assert_eq!(request.subservice, "/gardens");
        assert_eq!(request.attributes.len(), 1);
        assert!(request.timestamp.is_none());
    }

    #[test]
    fn test_build_request_injects_current_time() {
        let coordinator = DispatchCoordinator::new(Arc::new(MockContextBrokerClient::new()), false);
        let before = Utc::now();
        let request = coordinator.build_request(&device(Some(true)), mapped("temperature", "23"));

        let ts = request.timestamp.unwrap();
        assert!(ts >= before && ts <= Utc::now());
    }

    #[test]
    fn test_build_request_keeps_measured_timestamp() {
        let coordinator = DispatchCoordinator::new(Arc::new(MockContextBrokerClient::new()), true);
        let measured = Utc::now() - chrono::Duration::hours(1);
        let mut set = mapped("temperature", "23");
        set.timestamp = Some(measured);

        let request = coordinator.build_request(&device(None), set);
        assert_eq!(request.timestamp, Some(measured));
    }

    #[tokio::test]
    async fn test_dispatch_calls_client_once() {
        let mut client = MockContextBrokerClient::new();
        client
            .expect_update_entity()
            .withf(|request: &UpdateRequest| request.entity_id == "Second MQTT Device")
            .times(1)
            .returning(|_| Ok(()));

        let coordinator = DispatchCoordinator::new(Arc::new(client), false);
        let request = coordinator.build_request(&device(None), mapped("temperature", "23"));

        assert!(coordinator.dispatch(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_wraps_other_errors() {
        let mut client = MockContextBrokerClient::new();
        client
            .expect_update_entity()
            .times(1)
            .returning(|_| Err(DomainError::InvalidConfig("bad url".to_string())));

        let coordinator = DispatchCoordinator::new(Arc::new(client), false);
        let request = coordinator.build_request(&device(None), mapped("temperature", "23"));

        assert!(matches!(
            coordinator.dispatch(&request).await,
            Err(DomainError::DispatchError(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_all_isolates_failures() {
        let mut client = MockContextBrokerClient::new();
        client
            .expect_update_entity()
            .times(3)
            .returning(|request: &UpdateRequest| {
                if request.attributes[0].name == "humidity" {
                    Err(DomainError::DispatchError("Context broker responded 500".to_string()))
                } else {
                    Ok(())
                }
            });

        let coordinator = DispatchCoordinator::new(Arc::new(client), false);
        let requests: Vec<_> = [("temperature", "23"), ("humidity", "98"), ("pressure", "1013")]
            .iter()
            .map(|(name, value)| coordinator.build_request(&device(None), mapped(name, value)))
            .collect();

        let results = coordinator.dispatch_all(&requests).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
