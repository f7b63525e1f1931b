use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single typed cell after normalization. `Absent` is the only missing
/// marker: every recognized null spelling and both upstream missing
/// representations collapse into it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Absent,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The raw JSON shape this value serializes to. Feeding it back through
    /// the normalizer yields the same typed value again.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Absent => serde_json::Value::Null,
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
            CellValue::Number(n) => serde_json::json!(n),
            CellValue::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Absent => write!(f, ""),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// An insertion-ordered collection of typed cells, keyed by column name.
/// Column order mirrors the source spreadsheet and is part of the output
/// contract, so lookups stay linear over a narrow row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedRecord {
    fields: Vec<(String, CellValue)>,
}

impl TypedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a column value, keeping first-seen position.
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, column: &str) -> Option<CellValue> {
        let idx = self.fields.iter().position(|(name, _)| name == column)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Render back to a raw JSON row, column order preserved.
    pub fn to_raw(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

impl Serialize for TypedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl FromIterator<(String, CellValue)> for TypedRecord {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        let mut record = TypedRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_seen_order() {
        let mut record = TypedRecord::new();
        record.insert("b", CellValue::Number(1.0));
        record.insert("a", CellValue::Number(2.0));
        record.insert("b", CellValue::Number(3.0));

        let names: Vec<&str> = record.column_names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(record.get("b"), Some(&CellValue::Number(3.0)));
    }

    #[test]
    fn test_remove_returns_value() {
        let mut record = TypedRecord::new();
        record.insert("x", CellValue::Text("keep".into()));
        record.insert("y", CellValue::Bool(true));

        assert_eq!(record.remove("x"), Some(CellValue::Text("keep".into())));
        assert!(!record.contains("x"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_to_raw_round_trips_shapes() {
        let mut record = TypedRecord::new();
        record.insert("n", CellValue::Number(42.5));
        record.insert("d", CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
        record.insert("gone", CellValue::Absent);

        let raw = record.to_raw();
        assert_eq!(raw["n"], serde_json::json!(42.5));
        assert_eq!(raw["d"], serde_json::json!("2024-01-31"));
        assert!(raw["gone"].is_null());
    }
}
