use crate::{MeasurementGroup, PayloadDecoder, PayloadError, Result};

/// Separates independent measure groups within one payload
pub const GROUP_SEPARATOR: char = '#';

/// Separates alternating keys and values within a measure group
pub const PAIR_SEPARATOR: char = '|';

/// Decoder for Ultra-Light 2.0 measure payloads, e.g.
/// `temperature|23|humidity|98#temperature|16`.
///
/// Keys and values are opaque tokens and are returned exactly as received.
#[derive(Debug, Default, Clone, Copy)]
pub struct UltralightDecoder;

impl UltralightDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a raw transport payload, rejecting anything that is not UTF-8
    pub fn decode_bytes(&self, payload: &[u8]) -> Vec<Result<MeasurementGroup>> {
        match std::str::from_utf8(payload) {
            Ok(text) => self.decode_groups(text),
            Err(_) => vec![Err(PayloadError::InvalidEncoding)],
        }
    }

    fn decode_group(index: usize, group: &str) -> Result<MeasurementGroup> {
        if group.is_empty() {
            return Err(PayloadError::EmptyGroup { index });
        }

        let tokens: Vec<&str> = group.split(PAIR_SEPARATOR).collect();
        if tokens.len() % 2 != 0 {
            return Err(PayloadError::OddTokenCount {
                group: group.to_string(),
                tokens: tokens.len(),
            });
        }

        let mut pairs = Vec::with_capacity(tokens.len() / 2);
        for pair in tokens.chunks_exact(2) {
            if pair[0].is_empty() {
                return Err(PayloadError::EmptyKey {
                    group: group.to_string(),
                });
            }
            pairs.push((pair[0].to_string(), pair[1].to_string()));
        }

        Ok(MeasurementGroup::new(pairs))
    }
}

impl PayloadDecoder for UltralightDecoder {
    fn decode(&self, payload: &str) -> Result<Vec<MeasurementGroup>> {
        self.decode_groups(payload).into_iter().collect()
    }

    fn decode_groups(&self, payload: &str) -> Vec<Result<MeasurementGroup>> {
        if payload.is_empty() {
            return vec![Err(PayloadError::EmptyPayload)];
        }

        payload
            .split(GROUP_SEPARATOR)
            .enumerate()
            .map(|(index, group)| Self::decode_group(index, group))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(group: &MeasurementGroup) -> Vec<(&str, &str)> {
        group.iter().collect()
    }

    #[test]
    fn test_decode_single_pair() {
        let decoder = UltralightDecoder::new();
        let groups = decoder.decode("temperature|23").unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(pairs(&groups[0]), vec![("temperature", "23")]);
    }

    #[test]
    fn test_decode_multiple_pairs_in_one_group() {
        let decoder = UltralightDecoder::new();
        let groups = decoder.decode("temperature|23|humidity|98").unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(
            pairs(&groups[0]),
            vec![("temperature", "23"), ("humidity", "98")]
        );
    }

    #[test]
    fn test_decode_multiple_groups() {
        let decoder = UltralightDecoder::new();
        let groups = decoder
            .decode("temperature|23|humidity|98#temperature|16|humidity|34")
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].get("temperature"), Some("16"));
        assert_eq!(groups[1].get("humidity"), Some("34"));
    }

    #[test]
    fn test_values_are_not_trimmed() {
        let decoder = UltralightDecoder::new();
        let groups = decoder.decode("name| Living room ").unwrap();
        assert_eq!(groups[0].get("name"), Some(" Living room "));
    }

    #[test]
    fn test_timestamp_value_survives_decoding() {
        let decoder = UltralightDecoder::new();
        let groups = decoder
            .decode("tmp|24.4|tt|2016-09-26T12:19:26.476659Z")
            .unwrap();
        assert_eq!(groups[0].get("tt"), Some("2016-09-26T12:19:26.476659Z"));
    }

    #[test]
    fn test_empty_value_is_allowed() {
        let decoder = UltralightDecoder::new();
        let groups = decoder.decode("status|").unwrap();
        assert_eq!(groups[0].get("status"), Some(""));
    }

    #[test]
    fn test_odd_token_count_fails() {
        let decoder = UltralightDecoder::new();
        let result = decoder.decode("notAULPayload ");
        assert!(matches!(
            result,
            Err(PayloadError::OddTokenCount { tokens: 1, .. })
        ));
    }

    #[test]
    fn test_empty_payload_fails() {
        let decoder = UltralightDecoder::new();
        assert_eq!(decoder.decode(""), Err(PayloadError::EmptyPayload));
    }

    #[test]
    fn test_empty_key_fails() {
        let decoder = UltralightDecoder::new();
        assert!(matches!(
            decoder.decode("|23"),
            Err(PayloadError::EmptyKey { .. })
        ));
    }

    #[test]
    fn test_bad_group_does_not_affect_siblings() {
        let decoder = UltralightDecoder::new();
        let results = decoder.decode_groups("temperature|23#humidity#pressure|1013");

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(PayloadError::OddTokenCount { tokens: 1, .. })
        ));
        assert_eq!(
            results[2].as_ref().unwrap().get("pressure"),
            Some("1013")
        );
    }

    #[test]
    fn test_empty_group_between_separators() {
        let decoder = UltralightDecoder::new();
        let results = decoder.decode_groups("a|1##b|2");

        assert_eq!(results.len(), 3);
        assert_eq!(results[1], Err(PayloadError::EmptyGroup { index: 1 }));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_trailing_group_separator_yields_empty_group() {
        let decoder = UltralightDecoder::new();
        let results = decoder.decode_groups("a|1#");
        assert_eq!(results.len(), 2);
        assert_eq!(results[1], Err(PayloadError::EmptyGroup { index: 1 }));
    }

    #[test]
    fn test_decode_bytes_rejects_invalid_utf8() {
        let decoder = UltralightDecoder::new();
        let results = decoder.decode_bytes(&[0x74, 0x7c, 0xff, 0xfe]);
        assert_eq!(results, vec![Err(PayloadError::InvalidEncoding)]);
    }

    #[test]
    fn test_decode_bytes_accepts_utf8() {
        let decoder = UltralightDecoder::new();
        let results = decoder.decode_bytes("t|23".as_bytes());
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }
}
