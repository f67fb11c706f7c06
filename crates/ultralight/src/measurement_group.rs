/// One `#`-delimited segment of an Ultra-Light payload: the ordered key/value
/// pairs that end up in a single entity update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementGroup {
    pairs: Vec<(String, String)>,
}

impl MeasurementGroup {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Group carrying a single value, as produced by the single-attribute topic form
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            pairs: vec![(key.into(), value.into())],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
