use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Type given to measures whose key has no provisioned mapping
pub const DEFAULT_ATTRIBUTE_TYPE: &str = "Text";

/// A measured value bound to its NGSI attribute name and type
#[derive(Debug, Clone, PartialEq)]
pub struct MappedAttribute {
    pub name: String,
    pub attr_type: String,
    pub value: serde_json::Value,
}

impl MappedAttribute {
    pub fn text(name: &str, attr_type: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            attr_type: attr_type.to_string(),
            value: serde_json::Value::String(value.to_string()),
        }
    }
}

/// Attributes derived from one measure group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedAttributeSet {
    pub attributes: Vec<MappedAttribute>,
    /// Taken from the timestamp alias key, when the group carried one
    pub timestamp: Option<DateTime<Utc>>,
}

impl MappedAttributeSet {
    pub fn get(&self, name: &str) -> Option<&MappedAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// One entity update, built per measure group
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub entity_id: String,
    pub entity_type: String,
    pub service: String,
    pub subservice: String,
    pub attributes: Vec<MappedAttribute>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Client for the context-management API
///
/// Implementations should:
/// - Send exactly one update call per request
/// - Carry the tenant (service/subservice) of the request
/// - Return DispatchError on transport failures and non-2xx responses
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContextBrokerClient: Send + Sync {
    /// Append or update the request's attributes on its entity
    async fn update_entity(&self, request: &UpdateRequest) -> DomainResult<()>;
}
