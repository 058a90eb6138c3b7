use indexmap::IndexMap;
use std::fmt;
use zeroize::Zeroizing;

/// Resolved values keyed by the reference string they were requested with.
///
/// Produced once per batch and read-only afterwards. `Debug` lists the
/// references but never the values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolutionResult {
    values: IndexMap<String, Zeroizing<String>>,
}

impl ResolutionResult {
    pub(crate) fn from_values(values: IndexMap<String, Zeroizing<String>>) -> Self {
        Self { values }
    }

    /// Value resolved for `reference`, if it was part of the batch
    pub fn get(&self, reference: &str) -> Option<&str> {
        self.values.get(reference).map(|value| value.as_str())
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.values.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// References in the order they were first requested
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(reference, value)| (reference.as_str(), value.as_str()))
    }
}

impl FromIterator<(String, String)> for ResolutionResult {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::from_values(
            iter.into_iter()
                .map(|(reference, value)| (reference, Zeroizing::new(value)))
                .collect(),
        )
    }
}

impl fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionResult")
            .field("references", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}
