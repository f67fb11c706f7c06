mod device_resolver;
mod dispatch_coordinator;
mod measurement_config;
mod measurement_mapper;
mod measurement_service;

pub use device_resolver::*;
pub use dispatch_coordinator::*;
pub use measurement_config::*;
pub use measurement_mapper::*;
pub use measurement_service::*;
