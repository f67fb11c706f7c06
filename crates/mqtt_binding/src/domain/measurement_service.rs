use crate::domain::{DeviceResolver, DispatchCoordinator, MeasurementConfig, MeasurementMapper};
use crate::mqtt::{parse_topic, ParsedTopic};
use common::domain::{
    ContextBrokerClient, DeviceRegistry, DomainError, DomainResult, UpdateRequest,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use ultralight::{MeasurementGroup, PayloadError, UltralightDecoder};

/// Outcome of one measure message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageReport {
    /// Measure groups found in the payload, well-formed or not
    pub groups: usize,
    pub dispatched: usize,
    /// Groups that failed to decode, map or dispatch
    pub failed: usize,
}

/// Measure pipeline: topic, device, decode, map, dispatch
pub struct MeasurementService {
    resolver: DeviceResolver,
    decoder: UltralightDecoder,
    mapper: MeasurementMapper,
    coordinator: DispatchCoordinator,
}

impl MeasurementService {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        broker: Arc<dyn ContextBrokerClient>,
        config: MeasurementConfig,
    ) -> Self {
        Self {
            resolver: DeviceResolver::new(registry, config.default_entity_type.clone()),
            decoder: UltralightDecoder::new(),
            mapper: MeasurementMapper::new(&config),
            coordinator: DispatchCoordinator::new(broker, config.timestamp),
        }
    }

    /// Process a raw measure publication.
    ///
    /// Errors are returned only when the message as a whole cannot be
    /// handled (bad topic, unknown device, or an unusable single-attribute
    /// value); failures of single groups are counted in the report.
    pub async fn process_message(&self, topic: &str, payload: &[u8]) -> DomainResult<MessageReport> {
        let parsed = parse_topic(topic)?;
        self.process(&parsed, payload).await
    }

    #[instrument(
        name = "process_measure",
        skip_all,
        fields(
            api_key = %topic.api_key,
            device_id = %topic.device_id,
            attribute = topic.attribute.as_deref(),
        )
    )]
    pub async fn process(&self, topic: &ParsedTopic, payload: &[u8]) -> DomainResult<MessageReport> {
        let device = self.resolver.resolve(topic).await?;
        let groups = self.decode(topic, payload)?;

        let mut report = MessageReport {
            groups: groups.len(),
            ..MessageReport::default()
        };

        let mut requests: Vec<UpdateRequest> = Vec::with_capacity(groups.len());
        for (index, group) in groups.into_iter().enumerate() {
            let mapped = group
                .map_err(DomainError::from)
                .and_then(|group| self.mapper.map(&group, &device));

            match mapped {
                Ok(mapped) => requests.push(self.coordinator.build_request(&device, mapped)),
                Err(e) => {
                    warn!(group = index, error = %e, "skipping measure group");
                    report.failed += 1;
                }
            }
        }

        for result in self.coordinator.dispatch_all(&requests).await {
            match result {
                Ok(()) => report.dispatched += 1,
                Err(_) => report.failed += 1,
            }
        }

        debug!(
            groups = report.groups,
            dispatched = report.dispatched,
            failed = report.failed,
            "measure message processed"
        );

        Ok(report)
    }

    /// The single-attribute topic form carries one raw value, never split
    fn decode(
        &self,
        topic: &ParsedTopic,
        payload: &[u8],
    ) -> DomainResult<Vec<ultralight::Result<MeasurementGroup>>> {
        let Some(attribute) = &topic.attribute else {
            return Ok(self.decoder.decode_bytes(payload));
        };

        let value = std::str::from_utf8(payload).map_err(|_| PayloadError::InvalidEncoding)?;
        if value.is_empty() {
            return Err(PayloadError::EmptyPayload.into());
        }
        Ok(vec![Ok(MeasurementGroup::single(attribute.as_str(), value))])
    }
}
