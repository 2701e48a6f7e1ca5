//! Per-language translation dictionary with dotted key-path lookup.

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Nested string dictionary loaded from `/assets/i18n/{lang}.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationDictionary {
    root: Map<String, Value>,
}

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationDictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dictionary from parsed JSON. The top level must be an object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => bail!(
                "Translation dictionary must be a JSON object, got {}",
                json_kind(&other)
            ),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).context("Failed to parse translation dictionary")?;
        Self::from_json(value)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Resolve a dotted key path such as `contact.form.submit`.
    ///
    /// Every intermediate segment must be an object and the last one a string;
    /// anything else is treated as missing.
    pub fn lookup(&self, key_path: &str) -> Option<&str> {
        if key_path.is_empty() {
            return None;
        }

        let mut segments = key_path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                _ => return None,
            };
        }

        current.as_str()
    }

    /// Number of string leaves, for logging.
    pub fn len(&self) -> usize {
        fn count(value: &Value) -> usize {
            match value {
                Value::String(_) => 1,
                Value::Object(map) => map.values().map(count).sum(),
                _ => 0,
            }
        }
        self.root.values().map(count).sum()
    }
}

/// Replace `{{name}}` placeholders with parameter values.
///
/// Whitespace inside the braces is ignored. Placeholders without a matching
/// parameter are left untouched.
pub fn interpolate(text: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() || !text.contains("{{") {
        return text.to_string();
    }

    let regex = PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("valid regex"));

    regex
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
