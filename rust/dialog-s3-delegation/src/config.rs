//! Key/value configuration consumed by the bindings.
//!
//! Loading configuration is the caller's concern; bindings only read the
//! in-memory [`Configuration`] handed to them at init.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DelegationError;

/// String keyed configuration with typed accessors.
///
/// Values may carry secrets, so the [`Debug`] output lists keys only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, returning the updated configuration.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Get the raw value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a trimmed value; empty values read as unset.
    pub fn get_trimmed(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|value| !value.is_empty())
    }

    /// Get a trimmed value or a default.
    pub fn get_trimmed_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_trimmed(key).unwrap_or(default)
    }

    /// Parse a boolean value.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, DelegationError> {
        match self.get_trimmed(key) {
            None => Ok(default),
            Some(value) if value.eq_ignore_ascii_case("true") => Ok(true),
            Some(value) if value.eq_ignore_ascii_case("false") => Ok(false),
            Some(value) => Err(DelegationError::configuration(format!(
                "{key}: not a boolean: \"{value}\""
            ))),
        }
    }

    /// Parse a duration value.
    ///
    /// Accepts an integer with an optional unit suffix: `ms`, `s`, `m`, `h`
    /// or `d`. Bare integers are seconds.
    pub fn get_duration(&self, key: &str, default: Duration) -> Result<Duration, DelegationError> {
        match self.get_trimmed(key) {
            None => Ok(default),
            Some(value) => parse_duration(value).ok_or_else(|| {
                DelegationError::configuration(format!("{key}: not a duration: \"{value}\""))
            }),
        }
    }

    /// Split a comma separated value into its trimmed, non-empty entries.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterate over the configured keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut configuration = Self::new();
        for (key, value) in iter {
            configuration.set(key, value);
        }
        configuration
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn parse_duration(value: &str) -> Option<Duration> {
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: u64 = number.parse().ok()?;
    let duration = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => Duration::from_millis(number),
        "" | "s" => Duration::from_secs(number),
        "m" => Duration::from_secs(number.checked_mul(60)?),
        "h" => Duration::from_secs(number.checked_mul(3600)?),
        "d" => Duration::from_secs(number.checked_mul(86_400)?),
        _ => return None,
    };
    Some(duration)
}
