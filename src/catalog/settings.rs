//! Layer settings
//!
//! Settings are a schema-less, insertion-ordered bag of named values.
//! The order is part of the IR contract: catalog defaults are inserted in
//! canonical field order, and merges keep existing keys where they are.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LayercraftError, Result};

/// A single setting value
///
/// `Auto` is the "unset / derive me" sentinel and is encoded as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Choice(String),
    Auto,
}

impl SettingValue {
    /// Integer payload, if this is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if this is a `Choice`
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            SettingValue::Choice(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, SettingValue::Auto)
    }

    /// Parse a loosely typed literal as typed in a form field or on the
    /// command line.
    ///
    /// `true`/`false` become booleans, `auto`/`null` the sentinel, numbers
    /// integers or floats, anything else an enumerated choice.
    pub fn parse_literal(literal: &str) -> Result<Self> {
        let trimmed = literal.trim();
        if trimmed.is_empty() {
            return Err(LayercraftError::InvalidSettingLiteral {
                literal: literal.to_string(),
            });
        }

        match trimmed {
            "true" => return Ok(SettingValue::Bool(true)),
            "false" => return Ok(SettingValue::Bool(false)),
            "auto" | "null" => return Ok(SettingValue::Auto),
            _ => {}
        }

        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(SettingValue::Int(n));
        }

        if let Ok(x) = trimmed.parse::<f64>() {
            if x.is_finite() {
                return Ok(SettingValue::Float(x));
            }
            return Err(LayercraftError::InvalidSettingLiteral {
                literal: literal.to_string(),
            });
        }

        Ok(SettingValue::Choice(trimmed.to_string()))
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(n) => write!(f, "{}", n),
            SettingValue::Float(x) => write!(f, "{:?}", x),
            SettingValue::Choice(s) => write!(f, "{}", s),
            SettingValue::Auto => write!(f, "auto"),
        }
    }
}

impl From<i64> for SettingValue {
    fn from(n: i64) -> Self {
        SettingValue::Int(n)
    }
}

impl From<f64> for SettingValue {
    fn from(x: f64) -> Self {
        SettingValue::Float(x)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Choice(s.to_string())
    }
}

/// Ordered mapping of setting name to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    entries: Vec<(String, SettingValue)>,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Insert or replace a value
    ///
    /// Existing keys keep their position; new keys are appended.
    pub fn insert(&mut self, key: impl Into<String>, value: SettingValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Integer value of a setting, if present and integral
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(SettingValue::as_int)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Merge `patch` into these settings key by key
    pub fn merge(&mut self, patch: &Settings) {
        for (key, value) in patch.iter() {
            self.insert(key, value.clone());
        }
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, SettingValue)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, SettingValue)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (key, value) in iter {
            settings.insert(key, value);
        }
        settings
    }
}

impl Serialize for Settings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SettingsVisitor;

        impl<'de> Visitor<'de> for SettingsVisitor {
            type Value = Settings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of setting names to values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Settings, A::Error> {
                let mut settings = Settings::new();
                while let Some((key, value)) = access.next_entry::<String, SettingValue>()? {
                    settings.insert(key, value);
                }
                Ok(settings)
            }
        }

        deserializer.deserialize_map(SettingsVisitor)
    }
}
