use common::domain::DEFAULT_ATTRIBUTE_TYPE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Timestamp every update unless the device says otherwise (default: false)
    pub timestamp: bool,

    /// Type given to measures without a provisioned mapping (default: "Text")
    pub default_attribute_type: String,

    /// Entity type for group-provisioned devices whose group sets none (default: "Thing")
    pub default_entity_type: String,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            timestamp: false,
            default_attribute_type: DEFAULT_ATTRIBUTE_TYPE.to_string(),
            default_entity_type: "Thing".to_string(),
        }
    }
}
