//! Document store value types
//!
//! Documents are loosely typed: a map of field names to store-native values.
//! Repositories decode them into fixed entity shapes at their boundary.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Logical collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tasks,
    Comments,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Self::Tasks, Self::Comments];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Comments => "comments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store-native field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    #[serde(rename = "nullValue")]
    Null,
    #[serde(rename = "booleanValue")]
    Boolean(bool),
    #[serde(rename = "integerValue")]
    Integer(i64),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "timestampValue")]
    Timestamp(DateTime<Utc>),
    #[serde(rename = "stringValue")]
    String(String),
}

impl FieldValue {
    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Double(_) => 2,
            Self::Timestamp(_) => 3,
            Self::String(_) => 4,
        }
    }

    /// Read the value as an instant: native timestamps, RFC 3339 strings and
    /// epoch milliseconds.
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(value) => Some(*value),
            Self::String(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|value| value.with_timezone(&Utc)),
            Self::Integer(millis) => DateTime::<Utc>::from_timestamp_millis(*millis),
            _ => None,
        }
    }

    /// Total order used for sorting query results.
    ///
    /// Values of the same type compare naturally (integers and doubles
    /// compare as numbers). Two values both readable as instants compare in
    /// time, so legacy string and millisecond timestamps sort among native
    /// ones. Otherwise values order by type.
    pub fn compare(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (self.as_instant(), other.as_instant()) {
            return a.cmp(&b);
        }

        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Double(b)) => (*a as f64).total_cmp(b),
            (Self::Double(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Field map of a document
pub type Fields = BTreeMap<String, FieldValue>;

/// A document as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    fn malformed(&self, field: &str, reason: &str) -> Error {
        Error::Storage(format!(
            "Malformed document {}: field `{}` {}",
            self.id, field, reason
        ))
    }

    /// Read a required string field
    pub fn string(&self, field: &str) -> Result<String> {
        match self.get(field) {
            Some(FieldValue::String(value)) => Ok(value.clone()),
            Some(_) => Err(self.malformed(field, "is not a string")),
            None => Err(self.malformed(field, "is missing")),
        }
    }

    /// Read a boolean field, treating a missing or null value as `false`
    pub fn boolean(&self, field: &str) -> Result<bool> {
        match self.get(field) {
            Some(FieldValue::Boolean(value)) => Ok(*value),
            Some(FieldValue::Null) | None => Ok(false),
            Some(_) => Err(self.malformed(field, "is not a boolean")),
        }
    }

    /// Read a timestamp field.
    ///
    /// Native timestamps are used as-is, RFC 3339 strings are parsed and
    /// integers are read as epoch milliseconds. Anything else is rejected.
    pub fn timestamp(&self, field: &str) -> Result<DateTime<Utc>> {
        match self.get(field) {
            Some(value) => value
                .as_instant()
                .ok_or_else(|| self.malformed(field, "is not a valid timestamp")),
            None => Err(self.malformed(field, "is missing")),
        }
    }
}

/// Equality predicate on a named field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filters plus an optional order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Whether a document belongs to the result set.
    ///
    /// Documents lacking the order field are excluded.
    pub fn matches(&self, document: &Document) -> bool {
        let filters_match = self
            .filters
            .iter()
            .all(|filter| document.get(&filter.field) == Some(&filter.value));
        let has_order_field = self
            .order
            .as_ref()
            .map_or(true, |order| document.get(&order.field).is_some());
        filters_match && has_order_field
    }

    /// Sort documents by the query order. The sort is stable, so documents
    /// passed in insertion order keep it for ties.
    pub fn sort(&self, documents: &mut [Document]) {
        let Some(order) = &self.order else {
            return;
        };
        documents.sort_by(|a, b| {
            let ordering = match (a.get(&order.field), b.get(&order.field)) {
                (Some(a), Some(b)) => a.compare(b),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            match order.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(id: &str, fields: &[(&str, FieldValue)]) -> Document {
        Document::new(
            id,
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_query_matches_equality_filters() {
        let query = Query::new().where_eq("user", "a@x.com");

        assert!(query.matches(&doc("1", &[("user", "a@x.com".into())])));
        assert!(!query.matches(&doc("2", &[("user", "b@x.com".into())])));
        assert!(!query.matches(&doc("3", &[])));
    }

    #[test]
    fn test_query_excludes_documents_missing_order_field() {
        let query = Query::new().order_by("created", Direction::Ascending);
        assert!(!query.matches(&doc("1", &[("user", "a@x.com".into())])));
    }

    #[test]
    fn test_descending_sort_keeps_insertion_order_for_ties() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut docs = vec![
            doc("a", &[("created", early.into())]),
            doc("b", &[("created", late.into())]),
            doc("c", &[("created", late.into())]),
        ];

        Query::new()
            .order_by("created", Direction::Descending)
            .sort(&mut docs);

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_compare_mixes_numbers_and_orders_by_type() {
        assert_eq!(
            FieldValue::Integer(2).compare(&FieldValue::Double(1.5)),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::Null.compare(&FieldValue::Boolean(false)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::String("a".into()).compare(&FieldValue::Integer(10)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_timestamps_sort_as_instants_across_formats() {
        let native = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let legacy_millis = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
        let mut docs = vec![
            doc("native", &[("created", native.into())]),
            doc("string", &[("created", "2020-01-01T00:00:00Z".into())]),
            doc("millis", &[("created", FieldValue::Integer(legacy_millis))]),
        ];

        Query::new()
            .order_by("created", Direction::Ascending)
            .sort(&mut docs);

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["string", "millis", "native"]);
    }

    #[test]
    fn test_timestamp_normalization() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

        let native = doc("1", &[("created", expected.into())]);
        assert_eq!(native.timestamp("created").unwrap(), expected);

        let text = doc("2", &[("created", "2024-03-05T09:00:00-03:00".into())]);
        assert_eq!(text.timestamp("created").unwrap(), expected);

        let millis = doc("3", &[("created", expected.timestamp_millis().into())]);
        assert_eq!(millis.timestamp("created").unwrap(), expected);

        let garbage = doc("4", &[("created", "yesterday".into())]);
        assert!(matches!(garbage.timestamp("created"), Err(Error::Storage(_))));

        let wrong_type = doc("5", &[("created", true.into())]);
        assert!(wrong_type.timestamp("created").is_err());
    }

    #[test]
    fn test_boolean_defaults_to_false() {
        assert!(!doc("1", &[]).boolean("public").unwrap());
        assert!(!doc("2", &[("public", FieldValue::Null)]).boolean("public").unwrap());
        assert!(doc("3", &[("public", true.into())]).boolean("public").unwrap());
        assert!(doc("4", &[("public", "yes".into())]).boolean("public").is_err());
    }

    #[test]
    fn test_field_value_wire_format() {
        let json = serde_json::to_string(&FieldValue::Boolean(true)).unwrap();
        assert_eq!(json, r#"{"booleanValue":true}"#);
    }
}
