use crate::domain::MeasurementConfig;
use chrono::{DateTime, NaiveDateTime, Utc};
use common::domain::{
    DeviceContext, DomainError, DomainResult, MappedAttribute, MappedAttributeSet,
    TIME_INSTANT_ATTRIBUTE,
};
use ultralight::MeasurementGroup;

/// Binds the raw key/value pairs of a measure group to the device's NGSI
/// attributes. Values are carried through unchanged.
#[derive(Debug, Clone)]
pub struct MeasurementMapper {
    timestamp: bool,
    default_attribute_type: String,
}

impl MeasurementMapper {
    pub fn new(config: &MeasurementConfig) -> Self {
        Self {
            timestamp: config.timestamp,
            default_attribute_type: config.default_attribute_type.clone(),
        }
    }

    pub fn map(
        &self,
        group: &MeasurementGroup,
        device: &DeviceContext,
    ) -> DomainResult<MappedAttributeSet> {
        let timestamp_enabled = device.timestamp_enabled(self.timestamp);
        let mut mapped = MappedAttributeSet::default();

        for (key, value) in group.iter() {
            let (name, attr_type) = match device.mapping_for(key) {
                Some(mapping) => (mapping.name.as_str(), mapping.attr_type.as_str()),
                None => (key, self.default_attribute_type.as_str()),
            };

            if timestamp_enabled && name == TIME_INSTANT_ATTRIBUTE {
                if mapped.timestamp.is_some() {
                    return Err(duplicate_attribute(name));
                }
                mapped.timestamp = Some(parse_timestamp(key, value)?);
                continue;
            }

            // One NGSI attribute per name; a second value would overwrite the first
            if mapped.get(name).is_some() {
                return Err(duplicate_attribute(name));
            }

            mapped
                .attributes
                .push(MappedAttribute::text(name, attr_type, value));
        }

        for attribute in &device.static_attributes {
            if mapped.get(&attribute.name).is_none() {
                mapped.attributes.push(MappedAttribute {
                    name: attribute.name.clone(),
                    attr_type: attribute.attr_type.clone(),
                    value: attribute.value.clone(),
                });
            }
        }

        Ok(mapped)
    }
}

fn duplicate_attribute(name: &str) -> DomainError {
    DomainError::MappingError(format!("duplicate attribute '{}' in measure group", name))
}

/// ISO-8601 timestamps without an offset are taken as UTC
fn parse_timestamp(key: &str, value: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|ts| ts.and_utc())
        })
        .map_err(|e| {
            DomainError::MappingError(format!(
                "invalid timestamp '{}' in measure '{}': {}",
                value, key, e
            ))
        })
}
