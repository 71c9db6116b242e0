use std::collections::BTreeSet;

use crate::domain::utils::id::{CapabilityId, ValueProviderId};
use crate::domain::value::pattern::Pattern;

/// Upper bound of attempts for patterns producing random values.
const MAX_RANDOM_ATTEMPTS: usize = 1000;

/// Transformation applied to requested values before delegating to the target provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFilter {
    /// Lower-case the value and replace every character which is not alphanumeric by `-`.
    ConvertToUrl,
}

impl ValueFilter {
    pub fn apply(&self, value: &str) -> String {
        match self {
            ValueFilter::ConvertToUrl => {
                value.chars().map(|character| if character.is_ascii_alphanumeric() { character.to_ascii_lowercase() } else { '-' }).collect()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValueProviderKind {
    /// Values are generated from (and validated against) the given patterns.
    Pattern { patterns: Vec<Pattern>, allow_any_requested_value: bool },
    /// Requested values are filtered and allocated in the value space of `target`.
    Filtered { filter: ValueFilter, target: ValueProviderId },
}

/// Why a value could not be allocated from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    InvalidValue(String),
    ValueAlreadyAllocated(String),
    NoAvailableValue,
}

#[derive(Debug, Clone)]
pub struct ValueProvider {
    /// **Unique identifier** of the value provider.
    pub id: ValueProviderId,

    /// The capability which owns the provider.
    pub capability: CapabilityId,

    pub kind: ValueProviderKind,
}

impl ValueProvider {
    pub fn new_pattern(id: impl Into<ValueProviderId>, capability: CapabilityId, patterns: Vec<Pattern>) -> ValueProvider {
        ValueProvider { id: id.into(), capability, kind: ValueProviderKind::Pattern { patterns, allow_any_requested_value: false } }
    }

    pub fn new_filtered(id: impl Into<ValueProviderId>, capability: CapabilityId, filter: ValueFilter, target: ValueProviderId) -> ValueProvider {
        ValueProvider { id: id.into(), capability, kind: ValueProviderKind::Filtered { filter, target } }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self.kind, ValueProviderKind::Filtered { .. })
    }

    /// Applies the provider's filter to a requested value (identity for pattern providers).
    pub fn filter_value(&self, value: &str) -> String {
        match &self.kind {
            ValueProviderKind::Filtered { filter, .. } => filter.apply(value),
            ValueProviderKind::Pattern { .. } => value.to_string(),
        }
    }

    /// Generates the first value of the patterns which is not in `used_values`.
    ///
    /// Only meaningful for pattern providers, filtered providers delegate through the cache.
    pub fn generate_value(&self, used_values: &BTreeSet<String>) -> Result<String, ValueError> {
        let patterns = match &self.kind {
            ValueProviderKind::Pattern { patterns, .. } => patterns,
            ValueProviderKind::Filtered { .. } => return Err(ValueError::NoAvailableValue),
        };

        for pattern in patterns {
            let mut pattern = pattern.clone();
            pattern.reset();
            let mut attempts = 0;
            while let Some(value) = pattern.generate() {
                if !used_values.contains(&value) {
                    return Ok(value);
                }
                attempts += 1;
                if pattern.is_unbounded() && attempts >= MAX_RANDOM_ATTEMPTS {
                    log::warn!("Value provider '{}' gave up generating a random value from '{}'.", self.id, pattern.get_source());
                    break;
                }
            }
        }
        Err(ValueError::NoAvailableValue)
    }

    /// Checks that `requested_value` can be allocated and returns it.
    pub fn generate_requested_value(&self, used_values: &BTreeSet<String>, requested_value: &str) -> Result<String, ValueError> {
        match &self.kind {
            ValueProviderKind::Pattern { patterns, allow_any_requested_value } => {
                if !allow_any_requested_value && !patterns.iter().any(|pattern| pattern.is_value_valid(requested_value)) {
                    return Err(ValueError::InvalidValue(requested_value.to_string()));
                }
            }
            ValueProviderKind::Filtered { .. } => return Err(ValueError::InvalidValue(requested_value.to_string())),
        }
        if used_values.contains(requested_value) {
            return Err(ValueError::ValueAlreadyAllocated(requested_value.to_string()));
        }
        Ok(requested_value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(patterns: &[&str]) -> ValueProvider {
        let patterns = patterns.iter().map(|pattern| Pattern::parse(pattern).unwrap()).collect();
        ValueProvider::new_pattern("provider", CapabilityId::new("capability"), patterns)
    }

    #[test]
    fn test_generate_skips_used_values() {
        let provider = provider(&["{number:1:3}"]);
        let used: BTreeSet<String> = ["1".to_string(), "2".to_string()].into_iter().collect();
        assert_eq!(provider.generate_value(&used), Ok("3".to_string()));

        let used: BTreeSet<String> = ["1", "2", "3"].iter().map(|value| value.to_string()).collect();
        assert_eq!(provider.generate_value(&used), Err(ValueError::NoAvailableValue));
    }

    #[test]
    fn test_requested_value() {
        let provider = provider(&["{number:1:3}"]);
        let used: BTreeSet<String> = ["1".to_string()].into_iter().collect();
        assert_eq!(provider.generate_requested_value(&used, "2"), Ok("2".to_string()));
        assert_eq!(provider.generate_requested_value(&used, "1"), Err(ValueError::ValueAlreadyAllocated("1".to_string())));
        assert_eq!(provider.generate_requested_value(&used, "9"), Err(ValueError::InvalidValue("9".to_string())));
    }

    #[test]
    fn test_url_filter() {
        assert_eq!(ValueFilter::ConvertToUrl.apply("My Room #1"), "my-room--1");
    }
}
