use crate::domain::{MeasurementService, MessageReport};
use crate::mqtt::{parse_topic, ListenerState};
use common::domain::{DomainError, DomainResult};
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubAck, SubscribeFilter,
    SubscribeReasonCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument, Span};

/// Measure topics, with and without the leading slash.
///
/// `/+/+/attrs` and `+/+/attrs/+` overlap on topics such as `/key/attrs/attrs`.
/// MQTT 3.1.1 (section 3.3.5) lets the broker deliver such a publication once
/// per client, which Mosquitto does, or once per matching subscription.
/// [`parse_topic`] reads both deliveries as the same multi-attribute topic.
pub const SUBSCRIBE_TOPICS: [&str; 4] = ["/+/+/attrs", "/+/+/attrs/+", "+/+/attrs", "+/+/attrs/+"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttListenerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    /// Subscription QoS, 0 to 2
    pub qos: u8,

    /// Delay before reconnecting after a connection error (default: 5 seconds)
    pub retry_delay_secs: u64,

    /// Maximum number of consecutive failed connections, 0 for no limit
    pub max_retry_attempts: u32,
}

impl Default for MqttListenerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "iota-ul".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            qos: 0,
            retry_delay_secs: 5,
            max_retry_attempts: 0,
        }
    }
}

impl MqttListenerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn qos(&self) -> DomainResult<QoS> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(DomainError::InvalidConfig(format!(
                "MQTT QoS must be 0, 1 or 2, got {}",
                other
            ))),
        }
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        options.set_clean_session(true);
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}

/// Subscribes to the measure topics and runs every publication through the
/// measure pipeline on its own task
pub struct MqttListener {
    config: MqttListenerConfig,
    service: Arc<MeasurementService>,
    state: watch::Sender<ListenerState>,
    tracker: TaskTracker,
}

impl MqttListener {
    pub fn new(config: MqttListenerConfig, service: Arc<MeasurementService>) -> Self {
        let (state, _) = watch::channel(ListenerState::Disconnected);
        Self {
            config,
            service,
            state,
            tracker: TaskTracker::new(),
        }
    }

    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` is cancelled or the retry budget is spent.
    ///
    /// Messages already being processed are drained before returning.
    #[instrument(
        name = "mqtt_listener",
        skip_all,
        fields(host = %self.config.host, port = self.config.port)
    )]
    pub async fn run(&self, shutdown: CancellationToken) -> DomainResult<()> {
        let qos = self.config.qos()?;

        info!(
            client_id = %self.config.client_id,
            topics = ?SUBSCRIBE_TOPICS,
            "starting MQTT listener"
        );

        let mut retry_count = 0;
        let mut outcome = Ok(());

        loop {
            if shutdown.is_cancelled() {
                debug!("MQTT listener cancelled before connection");
                break;
            }

            match self.run_connection(qos, &shutdown, &mut retry_count).await {
                Ok(()) => {
                    debug!("MQTT listener stopped cleanly");
                    break;
                }
                Err(e) => {
                    self.set_state(ListenerState::Disconnected);
                    error!(error = %e, "MQTT connection error");

                    retry_count += 1;
                    let max_attempts = self.config.max_retry_attempts;
                    if max_attempts > 0 && retry_count >= max_attempts {
                        error!(
                            max_retries = max_attempts,
                            "max retry attempts reached, stopping MQTT listener"
                        );
                        outcome = Err(e);
                        break;
                    }

                    warn!(
                        attempt = retry_count,
                        max_attempts = max_attempts,
                        "retrying MQTT connection"
                    );

                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.retry_delay()) => {}
                    }
                }
            }
        }

        self.set_state(ListenerState::Disconnected);

        self.tracker.close();
        info!(in_flight = self.tracker.len(), "draining in-flight messages");
        self.tracker.wait().await;

        info!("MQTT listener stopped");
        outcome
    }

    /// Run a single MQTT session. A successful subscription resets the
    /// retry count.
    async fn run_connection(
        &self,
        qos: QoS,
        shutdown: &CancellationToken,
        retry_count: &mut u32,
    ) -> DomainResult<()> {
        self.set_state(ListenerState::Connecting);

        let (client, mut eventloop) = AsyncClient::new(self.config.mqtt_options(), 100);

        let filters = SUBSCRIBE_TOPICS
            .iter()
            .map(|topic| SubscribeFilter::new(topic.to_string(), qos));
        client
            .subscribe_many(filters)
            .await
            .map_err(|e| DomainError::ConnectionError(format!("failed to subscribe: {}", e)))?;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("shutdown signal received");
                    disconnect(&client, &mut eventloop).await;
                    return Ok(());
                }
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            let service = Arc::clone(&self.service);
                            let payload = publish.payload.to_vec();
                            self.tracker.spawn(async move {
                                handle_mqtt_message(&service, &publish.topic, &payload).await;
                            });
                        }
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!("connected to MQTT broker");
                        }
                        Ok(Event::Incoming(Packet::SubAck(ack))) => {
                            check_suback(&ack)?;
                            *retry_count = 0;
                            self.set_state(ListenerState::Subscribed);
                            info!(topics = ?SUBSCRIBE_TOPICS, "subscribed to measure topics");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            return Err(DomainError::ConnectionError(format!(
                                "MQTT event loop error: {}",
                                e
                            )));
                        }
                    }
                }
            }
        }
    }

    fn set_state(&self, state: ListenerState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = %current, to = %state, "listener state changed");
            *current = state;
            true
        });
    }
}

/// Time allowed to flush DISCONNECT before the socket is dropped
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Queue a DISCONNECT and drive the event loop until it has been written
async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop) {
    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "failed to queue MQTT disconnect");
        return;
    }

    let flush = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("MQTT disconnect sent");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "MQTT connection closed during disconnect");
                    return;
                }
            }
        }
    };

    if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
        warn!("timed out sending MQTT disconnect");
    }
}

fn check_suback(ack: &SubAck) -> DomainResult<()> {
    if ack
        .return_codes
        .iter()
        .any(|code| matches!(code, SubscribeReasonCode::Failure))
    {
        return Err(DomainError::ConnectionError(format!(
            "broker rejected subscription: {:?}",
            ack.return_codes
        )));
    }
    Ok(())
}

/// Handle one MQTT publication.
///
/// Each message gets its own root span; every error ends here and is
/// logged.
pub(crate) async fn handle_mqtt_message(service: &MeasurementService, topic: &str, payload: &[u8]) {
    let span = info_span!(
        parent: Span::none(),
        "mqtt_message",
        topic = %topic,
        payload_size = payload.len(),
        device_id = tracing::field::Empty,
    );

    async {
        let parsed = match parse_topic(topic) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to parse MQTT topic, skipping message");
                return;
            }
        };

        Span::current().record("device_id", parsed.device_id.as_str());

        match service.process(&parsed, payload).await {
            Ok(report) => log_report(&report),
            Err(e @ DomainError::DeviceNotFound { .. }) => {
                warn!(error = %e, "unknown device, dropping message");
            }
            Err(e) => {
                error!(error = %e, "failed to process measure message");
            }
        }
    }
    .instrument(span)
    .await
}

fn log_report(report: &MessageReport) {
    if report.failed > 0 {
        warn!(
            groups = report.groups,
            dispatched = report.dispatched,
            failed = report.failed,
            "measure message partially processed"
        );
    } else {
        debug!(
            groups = report.groups,
            dispatched = report.dispatched,
            "measure message processed"
        );
    }
}
