use crate::{Error, Result};
use serde_json::map::Entry;
use serde_json::{Map, Value};

/// JSON-backed settings object shared by the layout engine, the explorer and the CLI.
///
/// Keys are addressed with dotted paths (`layout.minHorizontalSpacing`). Unknown keys are kept
/// and ignored, so a single document can carry settings for every component.
#[derive(Debug, Clone, PartialEq)]
pub struct ArborConfig(Value);

impl Default for ArborConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl ArborConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(Error::InvalidConfig {
                path: String::new(),
                message: "config document must be a JSON object".to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    /// Reads a strictly positive, finite number.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when it is present but not a
    /// positive number.
    pub fn positive_f64(&self, dotted_path: &str) -> Result<Option<f64>> {
        let Some(value) = self.get(dotted_path) else {
            return Ok(None);
        };
        match value.as_f64() {
            Some(v) if v.is_finite() && v > 0.0 => Ok(Some(v)),
            _ => Err(Error::InvalidConfig {
                path: dotted_path.to_string(),
                message: format!("expected a positive number, got {value}"),
            }),
        }
    }

    /// Writes `value` at `dotted_path`, creating missing intermediate objects.
    ///
    /// Fails when the path is blank or a segment on the way already holds a non-object value.
    pub fn set_value(&mut self, dotted_path: &str, value: Value) -> Result<()> {
        let invalid = |message: String| Error::InvalidConfig {
            path: dotted_path.to_string(),
            message,
        };
        let mut segments: Vec<&str> = dotted_path.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty key segment".to_string()));
        }
        let leaf = segments.pop().unwrap_or_default();

        let mut cur = self
            .0
            .as_object_mut()
            .ok_or_else(|| invalid("config root is not an object".to_string()))?;
        for segment in segments {
            cur = cur
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| invalid(format!("`{segment}` already holds a non-object value")))?;
        }
        cur.insert(leaf.to_string(), value);
        Ok(())
    }

    /// Applies a command-line `path=value` override. The value is read as JSON when it parses
    /// (`layout.topMargin=20`) and as a plain string otherwise (`explorer.policy=serialize`).
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let Some((path, raw)) = assignment.split_once('=') else {
            return Err(Error::InvalidConfig {
                path: assignment.to_string(),
                message: "expected `path=value`".to_string(),
            });
        };
        let raw = raw.trim();
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.set_value(path, value)
    }

    /// Layers `other` over `self`: objects are combined key by key, any other value in `other`
    /// replaces the one in `self`.
    pub fn merge_from(&mut self, other: &ArborConfig) {
        overlay(&mut self.0, &other.0);
    }
}

fn overlay(base: &mut Value, top: &Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.entry(key.as_str()) {
                    Entry::Occupied(mut slot) => overlay(slot.get_mut(), value),
                    Entry::Vacant(slot) => {
                        slot.insert(value.clone());
                    }
                }
            }
        }
        (base, top) => *base = top.clone(),
    }
}
