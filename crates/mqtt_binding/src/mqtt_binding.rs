use crate::domain::{MeasurementConfig, MeasurementService};
use crate::mqtt::{ListenerState, MqttListener, MqttListenerConfig};
use common::domain::{ContextBrokerClient, DeviceRegistry};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct MqttBindingConfig {
    pub listener: MqttListenerConfig,
    pub measurement: MeasurementConfig,
}

/// Southbound MQTT transport wired to the measure pipeline
pub struct MqttBinding {
    listener: MqttListener,
}

impl MqttBinding {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        broker: Arc<dyn ContextBrokerClient>,
        config: MqttBindingConfig,
    ) -> Self {
        debug!("initializing MQTT binding module");

        let service = Arc::new(MeasurementService::new(
            registry,
            broker,
            config.measurement,
        ));
        let listener = MqttListener::new(config.listener, service);

        Self { listener }
    }

    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.listener.state()
    }

    #[allow(clippy::type_complexity)]
    pub fn into_runner_process(
        self,
    ) -> Box<
        dyn FnOnce(
                CancellationToken,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
            > + Send,
    > {
        Box::new({
            let listener = self.listener;
            move |ctx| Box::pin(async move { Ok(listener.run(ctx).await?) })
        })
    }
}
