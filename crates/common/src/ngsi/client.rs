use crate::domain::{ContextBrokerClient, DomainError, DomainResult, UpdateRequest};
use crate::ngsi::build_update_body;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const FIWARE_SERVICE_HEADER: &str = "Fiware-Service";
pub const FIWARE_SERVICE_PATH_HEADER: &str = "Fiware-ServicePath";

#[derive(Debug, Clone)]
pub struct NgsiClientConfig {
    /// Context broker base URL, e.g. `http://orion:1026`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Send typed numeric and boolean attributes as JSON numbers/booleans
    pub autocast: bool,
}

/// NGSI v2 context broker client
pub struct NgsiV2Client {
    client: Client,
    base_url: Url,
    autocast: bool,
}

impl NgsiV2Client {
    pub fn new(config: NgsiClientConfig) -> DomainResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DomainError::InvalidConfig(format!(
                "Invalid context broker URL '{}': {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DomainError::InvalidConfig(format!(
                "Context broker URL cannot be used as a base: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            autocast: config.autocast,
        })
    }

    /// `{base}/v2/entities/{entity_id}/attrs` with the entity id percent-encoded
    pub fn entity_attrs_url(&self, entity_id: &str) -> DomainResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DomainError::InvalidConfig(format!(
                    "Context broker URL cannot be used as a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["v2", "entities", entity_id, "attrs"]);
        Ok(url)
    }
}

#[async_trait]
impl ContextBrokerClient for NgsiV2Client {
    #[instrument(
        name = "ngsi_update_entity",
        skip_all,
        fields(
            entity_id = %request.entity_id,
            service = %request.service,
            subservice = %request.subservice,
        )
    )]
    async fn update_entity(&self, request: &UpdateRequest) -> DomainResult<()> {
        let url = self.entity_attrs_url(&request.entity_id)?;
        let body = build_update_body(request, self.autocast);

        debug!(
            url = %url,
            attribute_count = body.len(),
            "sending entity update"
        );

        let response = self
            .client
            .post(url)
            .header(FIWARE_SERVICE_HEADER, &request.service)
            .header(FIWARE_SERVICE_PATH_HEADER, &request.subservice)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::DispatchError(format!("Context broker request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %text,
                "context broker rejected entity update"
            );
            return Err(DomainError::DispatchError(format!(
                "Context broker responded {}: {}",
                status.as_u16(),
                text
            )));
        }

        debug!(status = status.as_u16(), "entity update accepted");
        Ok(())
    }
}
