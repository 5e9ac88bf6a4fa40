use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::color::palette::ColorResult;

/// Locale code plus a string table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleBinding {
    /// BCP-47-ish locale code, e.g. `en-US`.
    pub locale: String,
    /// Translation table.
    pub strings: BTreeMap<String, String>,
}

impl LocaleBinding {
    /// Empty table for `locale`.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            strings: BTreeMap::new(),
        }
    }

    /// Add one translation.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(key.into(), value.into());
        self
    }

    /// Translation for `key`, or `key` itself when missing.
    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        self.strings.get(key).map(String::as_str).unwrap_or(key)
    }
}

/// Props as handed to layout: a private deep copy with numbers normalized and the resolved colors
/// and locale injected under `colors` and `locale`.
#[derive(Clone, Debug, PartialEq)]
pub struct SanitizedProps {
    value: Value,
    colors: ColorResult,
    locale: LocaleBinding,
}

impl SanitizedProps {
    /// The full sanitized object.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Look up a dot-separated path; numeric segments index arrays.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(&self.value, |v, seg| match v {
                Value::Object(m) => m.get(seg),
                Value::Array(a) => seg.parse::<usize>().ok().and_then(|i| a.get(i)),
                _ => None,
            })
    }

    /// Resolved palette.
    pub fn colors(&self) -> &ColorResult {
        &self.colors
    }

    /// Bound locale.
    pub fn locale(&self) -> &LocaleBinding {
        &self.locale
    }

    /// Shorthand for [`LocaleBinding::translate`].
    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        self.locale.translate(key)
    }
}

/// Deep-copy `props` for layout.
///
/// Integers become floating-point numbers (layout only understands one numeric type). A
/// non-object `props` is replaced by an empty object.
pub fn sanitize_props(props: &Value, colors: &ColorResult, locale: &LocaleBinding) -> SanitizedProps {
    let mut map = match props {
        Value::Object(m) => m.iter().map(|(k, v)| (k.clone(), normalize(v))).collect(),
        Value::Null => Map::new(),
        other => {
            tracing::warn!(kind = kind(other), "props is not an object; using empty props");
            Map::new()
        }
    };
    map.insert(
        "colors".to_string(),
        serde_json::to_value(colors).unwrap_or_default(),
    );
    map.insert("locale".to_string(), Value::String(locale.locale.clone()));

    SanitizedProps {
        value: Value::Object(map),
        colors: colors.clone(),
        locale: locale.clone(),
    }
}

fn normalize(v: &Value) -> Value {
    match v {
        Value::Number(n) if !n.is_f64() => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Value::Array(a) => Value::Array(a.iter().map(normalize).collect()),
        Value::Object(m) => Value::Object(m.iter().map(|(k, v)| (k.clone(), normalize(v))).collect()),
        other => other.clone(),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/props.rs"]
mod tests;
