//! Logged values: scalar cells, ordered records and run configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Run configuration: an ordered mapping from key to JSON value.
///
/// Serialized in full into the run log header and the registry's runs row,
/// and expanded key by key into the registry's config table.
pub type RunConfig = serde_json::Map<String, serde_json::Value>;

/// Text stored in the registry's config table for one configuration value.
///
/// Strings are stored raw; everything else as compact JSON.
#[must_use]
pub fn config_value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A single cell of a logged record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Missing value (empty cell)
    Null,
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Free text
    Str(String),
}

impl Scalar {
    /// Infer a scalar from the raw (already unquoted) text of a CSV cell.
    ///
    /// Inference order: empty → `Null`, integer, float, boolean, string.
    #[must_use]
    pub fn parse_cell(text: &str) -> Self {
        if text.is_empty() {
            return Self::Null;
        }
        if let Ok(i) = text.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Self::Float(f);
        }
        match text {
            "True" | "true" => Self::Bool(true),
            "False" | "false" => Self::Bool(false),
            _ => Self::Str(text.to_string()),
        }
    }

    /// Raw text written to a CSV cell (before quoting).
    ///
    /// The encoding is lossy where text looks like another type: an empty
    /// `Str` is written as an empty cell and reads back as `Null`, and text
    /// such as `"42"` or `"True"` reads back as `Int` or `Bool`. Cells keep
    /// their value's text, not its type.
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            // Debug keeps the fractional part ("1.0"), Display would print "1"
            Self::Float(f) => format!("{f:?}"),
            Self::Str(s) => s.clone(),
        }
    }

    /// Numeric view of the cell, if it holds a number.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of the cell, if it holds an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Text view of the cell, if it holds a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// True for empty cells.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cell())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Scalar {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Float(v as f64), Self::Int)
    }
}

impl From<usize> for Scalar {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Self::Float(v as f64), Self::Int)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One logged observation: field names mapped to scalars, in insertion order.
///
/// Field order matters: the first record logged to a run fixes the column
/// order of the run log.
///
/// # Example
///
/// ```rust
/// use runlog::Record;
///
/// let record = Record::new().with("loss", 0.25).with("epoch", 3);
/// assert_eq!(record.keys().collect::<Vec<_>>(), vec!["loss", "epoch"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, replacing an existing value in place.
    ///
    /// Returns the previous value if the field already existed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.fields.push((key, value));
        None
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Check whether a field is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl<K: Into<String>, V: Into<Scalar>, const N: usize> From<[(K, V); N]> for Record {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_inference() {
        assert_eq!(Scalar::parse_cell(""), Scalar::Null);
        assert_eq!(Scalar::parse_cell("3"), Scalar::Int(3));
        assert_eq!(Scalar::parse_cell("-7"), Scalar::Int(-7));
        assert_eq!(Scalar::parse_cell("0.5"), Scalar::Float(0.5));
        assert_eq!(Scalar::parse_cell("1e-3"), Scalar::Float(0.001));
        assert_eq!(Scalar::parse_cell("True"), Scalar::Bool(true));
        assert_eq!(Scalar::parse_cell("false"), Scalar::Bool(false));
        assert_eq!(Scalar::parse_cell("adam"), Scalar::Str("adam".to_string()));
    }

    #[test]
    fn test_float_cell_keeps_fraction() {
        assert_eq!(Scalar::Float(1.0).to_cell(), "1.0");
        assert_eq!(Scalar::Float(0.5).to_cell(), "0.5");
        assert_eq!(Scalar::parse_cell(&Scalar::Float(1.0).to_cell()), Scalar::Float(1.0));
    }

    #[test]
    fn test_text_cells_are_reinferred() {
        assert_eq!(Scalar::Str(String::new()).to_cell(), Scalar::Null.to_cell());
        assert_eq!(Scalar::parse_cell(&Scalar::Str(String::new()).to_cell()), Scalar::Null);
        assert_eq!(Scalar::parse_cell(&Scalar::from("42").to_cell()), Scalar::Int(42));
        assert_eq!(Scalar::parse_cell(&Scalar::from("True").to_cell()), Scalar::Bool(true));
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = Record::from([("a", 1), ("b", 2)]);
        let previous = record.insert("a", 10);

        assert_eq!(previous, Some(Scalar::Int(1)));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&Scalar::Int(10)));
    }

    #[test]
    fn test_option_into_scalar() {
        let none: Option<f64> = None;
        assert_eq!(Scalar::from(none), Scalar::Null);
        assert_eq!(Scalar::from(Some(2.5)), Scalar::Float(2.5));
    }

    #[test]
    fn test_config_value_text() {
        assert_eq!(config_value_text(&serde_json::json!("adam")), "adam");
        assert_eq!(config_value_text(&serde_json::json!(0.01)), "0.01");
        assert_eq!(config_value_text(&serde_json::json!([1, 2])), "[1,2]");
    }
}
