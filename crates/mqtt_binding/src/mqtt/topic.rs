use common::domain::{DomainError, DomainResult};

/// Topic segment that marks a measure publication
pub const ATTRS_SEGMENT: &str = "attrs";

/// Parsed measure topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub api_key: String,
    pub device_id: String,
    /// Set for the single-attribute form `/{api_key}/{device_id}/attrs/{attribute}`
    pub attribute: Option<String>,
}

/// Parse a measure topic in the format `/{api_key}/{device_id}/attrs` or
/// `/{api_key}/{device_id}/attrs/{attribute}`.
///
/// The leading slash is optional.
///
/// # Examples
/// ```
/// use mqtt_binding::mqtt::parse_topic;
///
/// let parsed = parse_topic("/1234/MQTT_2/attrs/temperature").unwrap();
/// assert_eq!(parsed.api_key, "1234");
/// assert_eq!(parsed.device_id, "MQTT_2");
/// assert_eq!(parsed.attribute.as_deref(), Some("temperature"));
/// ```
pub fn parse_topic(topic: &str) -> DomainResult<ParsedTopic> {
    let path = topic.strip_prefix('/').unwrap_or(topic);
    let parts: Vec<&str> = path.split('/').collect();

    if !(3..=4).contains(&parts.len()) || parts[2] != ATTRS_SEGMENT {
        return Err(DomainError::InvalidTopic(format!(
            "'{}': expected '/{{api_key}}/{{device_id}}/attrs[/{{attribute}}]'",
            topic
        )));
    }

    let api_key = parts[0];
    let device_id = parts[1];

    if api_key.is_empty() {
        return Err(DomainError::InvalidTopic(format!(
            "'{}': api key cannot be empty",
            topic
        )));
    }

    if device_id.is_empty() {
        return Err(DomainError::InvalidTopic(format!(
            "'{}': device id cannot be empty",
            topic
        )));
    }

    let attribute = match parts.get(3) {
        Some(attribute) if attribute.is_empty() => {
            return Err(DomainError::InvalidTopic(format!(
                "'{}': attribute name cannot be empty",
                topic
            )));
        }
        Some(attribute) => Some(attribute.to_string()),
        None => None,
    };

    Ok(ParsedTopic {
        api_key: api_key.to_string(),
        device_id: device_id.to_string(),
        attribute,
    })
}
