//! Custom correlation properties carried in the `Correlation-Context` header.
//!
//! The wire form is a comma-separated list of `key=value` pairs.

use thiserror::Error;

/// Reasons a property cannot be stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationPropertyError {
    /// Keys must be non-empty.
    #[error("correlation property key must not be empty")]
    EmptyKey,
    /// `,` and `=` delimit the wire form and cannot appear in keys or values.
    #[error("correlation property {key} contains a reserved character")]
    ReservedCharacter {
        /// Offending key.
        key: String,
    },
}

/// Ordered set of correlation properties.
///
/// # Examples
/// ```
/// use backend::domain::correlation::CorrelationProperties;
///
/// let mut props = CorrelationProperties::from_header("tenant=a, region=eu");
/// props.set("tenant", "b").expect("valid property");
/// assert_eq!(props.get("tenant"), Some("b"));
/// assert_eq!(props.to_header().as_deref(), Some("tenant=b, region=eu"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationProperties {
    entries: Vec<(String, String)>,
}

impl CorrelationProperties {
    /// Parse a `Correlation-Context` header value.
    ///
    /// Entries without `=` or with an empty key are skipped.
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        let mut properties = Self::default();
        for entry in header.split(',') {
            let Some((key, value)) = entry.trim().split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            properties.upsert(key.to_owned(), value.trim().to_owned());
        }
        properties
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Store `value` under `key`, replacing any existing value.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), CorrelationPropertyError> {
        let key = key.into();
        let value = value.into();
        if key.trim().is_empty() {
            return Err(CorrelationPropertyError::EmptyKey);
        }
        let reserved = |text: &str| text.contains([',', '=']);
        if reserved(&key) || reserved(&value) {
            return Err(CorrelationPropertyError::ReservedCharacter { key });
        }
        self.upsert(key, value);
        Ok(())
    }

    /// Whether no properties are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the header value; `None` when there is nothing to send.
    #[must_use]
    pub fn to_header(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .entries
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        Some(pairs.join(", "))
    }

    fn upsert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }
}
