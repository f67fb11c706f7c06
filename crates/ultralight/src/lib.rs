pub mod decoder;
mod error;
mod measurement_group;

pub use decoder::{UltralightDecoder, GROUP_SEPARATOR, PAIR_SEPARATOR};
pub use error::{PayloadError, Result};
pub use measurement_group::MeasurementGroup;

/// Trait for decoding textual measurement payloads into measure groups
pub trait PayloadDecoder {
    /// Decode a payload, failing as a whole if any group is malformed
    fn decode(&self, payload: &str) -> Result<Vec<MeasurementGroup>>;

    /// Decode a payload group by group, so one malformed group does not
    /// hide its well-formed siblings
    fn decode_groups(&self, payload: &str) -> Vec<Result<MeasurementGroup>>;
}
