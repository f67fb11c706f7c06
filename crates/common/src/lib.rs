pub mod domain;
pub mod ngsi;
pub mod provisioning;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockContextBrokerClient;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeviceRegistry;
