pub mod domain;
pub mod mqtt;
pub mod mqtt_binding;
