mod config;

use common::ngsi::{NgsiClientConfig, NgsiV2Client};
use common::provisioning::{InMemoryDeviceRegistry, ProvisioningFile, RegistryDefaults};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use crate::config::ServiceConfig;
use iota_runner::Runner;
use mqtt_binding::domain::MeasurementConfig;
use mqtt_binding::mqtt::MqttListenerConfig;
use mqtt_binding::mqtt_binding::{MqttBinding, MqttBindingConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        mqtt_host = %config.mqtt_host,
        mqtt_port = config.mqtt_port,
        context_broker_url = %config.context_broker_url,
        "Starting iota-ul agent"
    );

    let mqtt_binding = match build_mqtt_binding(&config) {
        Ok(binding) => binding,
        Err(e) => {
            error!("Failed to initialize MQTT binding: {:#}", e);
            shutdown_telemetry(telemetry_providers);
            std::process::exit(1);
        }
    };

    let runner = Runner::new()
        .with_named_process("mqtt_binding", mqtt_binding.into_runner_process())
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            shutdown_telemetry(telemetry_providers);
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(config.shutdown_timeout_secs));

    let exit_code = match runner.run().await {
        Ok(()) => 0,
        Err(_) => 1,
    };
    std::process::exit(exit_code);
}

fn build_mqtt_binding(config: &ServiceConfig) -> anyhow::Result<MqttBinding> {
    info!(path = %config.provisioning_file, "Loading provisioning file");
    let provisioning = ProvisioningFile::from_path(&config.provisioning_file)?;
    let registry = InMemoryDeviceRegistry::from_provisioning(
        provisioning,
        &RegistryDefaults {
            default_api_key: config.default_api_key.clone(),
            default_service: config.default_service.clone(),
            default_subservice: config.default_subservice.clone(),
            default_entity_type: config.default_entity_type.clone(),
        },
    )?;
    info!(
        devices = registry.device_count(),
        groups = registry.group_count(),
        "Device registry loaded"
    );

    let context_broker = NgsiV2Client::new(NgsiClientConfig {
        base_url: config.context_broker_url.clone(),
        timeout: Duration::from_secs(config.context_broker_timeout_secs),
        autocast: config.autocast,
    })?;

    Ok(MqttBinding::new(
        Arc::new(registry),
        Arc::new(context_broker),
        MqttBindingConfig {
            listener: MqttListenerConfig {
                host: config.mqtt_host.clone(),
                port: config.mqtt_port,
                client_id: config.mqtt_client_id.clone(),
                username: config.mqtt_username.clone(),
                password: config.mqtt_password.clone(),
                keep_alive_secs: config.mqtt_keepalive_secs,
                qos: config.mqtt_qos,
                retry_delay_secs: config.mqtt_retry_delay_secs,
                max_retry_attempts: config.mqtt_max_retry_attempts,
            },
            measurement: MeasurementConfig {
                timestamp: config.timestamp,
                default_attribute_type: config.default_attribute_type.clone(),
                default_entity_type: config.default_entity_type.clone(),
            },
        },
    ))
}
