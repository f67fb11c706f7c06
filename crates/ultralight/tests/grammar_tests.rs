//! Grammar tests for the Ultra-Light 2.0 measure encoding.
//!
//! Payloads mirror what field devices publish on `/{apikey}/{device}/attrs`.

use ultralight::{MeasurementGroup, PayloadDecoder, PayloadError, UltralightDecoder};

fn build_payload(groups: &[Vec<(&str, &str)>]) -> String {
    groups
        .iter()
        .map(|group| {
            group
                .iter()
                .flat_map(|(k, v)| [*k, *v])
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect::<Vec<_>>()
        .join("#")
}

#[test]
fn test_group_count_matches_payload() {
    let decoder = UltralightDecoder::new();
    let samples = vec![
        vec![vec![("t", "1")]],
        vec![vec![("t", "1")], vec![("h", "2")]],
        vec![
            vec![("t", "1"), ("h", "2")],
            vec![("t", "3")],
            vec![("p", "1013"), ("w", "NE")],
        ],
    ];

    for groups in samples {
        let payload = build_payload(&groups);
        let decoded = decoder.decode(&payload).unwrap();
        assert_eq!(decoded.len(), groups.len(), "payload: {}", payload);

        for (decoded_group, expected) in decoded.iter().zip(groups.iter()) {
            let expected = MeasurementGroup::new(
                expected
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
            assert_eq!(decoded_group, &expected);
        }
    }
}

#[test]
fn test_values_with_special_characters_round_trip() {
    let decoder = UltralightDecoder::new();
    let payload = "location|40.4165,-3.70256|state|ON/OFF|note|a=b;c";
    let groups = decoder.decode(payload).unwrap();

    assert_eq!(groups[0].get("location"), Some("40.4165,-3.70256"));
    assert_eq!(groups[0].get("state"), Some("ON/OFF"));
    assert_eq!(groups[0].get("note"), Some("a=b;c"));
}

#[test]
fn test_strict_decode_fails_when_any_group_is_malformed() {
    let decoder = UltralightDecoder::new();
    let result = decoder.decode("t|23#h|98|x");
    assert!(matches!(
        result,
        Err(PayloadError::OddTokenCount { tokens: 3, .. })
    ));
}

#[test]
fn test_lenient_decode_reports_each_group() {
    let decoder = UltralightDecoder::new();
    let results = decoder.decode_groups("t|23#h|98|x#p|1");

    let ok: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_ok())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(ok, vec![0, 2]);
}

#[test]
fn test_duplicate_keys_are_kept_in_order() {
    let decoder = UltralightDecoder::new();
    let groups = decoder.decode("t|1|t|2").unwrap();
    let values: Vec<&str> = groups[0].iter().map(|(_, v)| v).collect();
    assert_eq!(values, vec!["1", "2"]);
    assert_eq!(groups[0].get("t"), Some("1"));
}
