//! # Storage-Agnostic Queries
//!
//! A [`Query`] is an ordered list of [`Predicate`]s plus an optional sort and pagination window.
//! It says nothing about how a store evaluates it; concrete stores translate it (see
//! [`CriteriaTranslator`](crate::CriteriaTranslator) for the document-store syntax).
//!
//! ```rust
//! use resource_framework::Query;
//!
//! let query = Query::new()
//!     .and_where("author", "=", "matthew")
//!     .or_where("is_draft", "!=", true)
//!     .sort("created", "desc")
//!     .limit(10, 20);
//!
//! assert_eq!(query.predicates().len(), 2);
//! assert_eq!(query.sort_spec().unwrap().to_string(), "created DESC");
//! ```
//!
//! ## Structured form
//!
//! Queries round-trip through a plain JSON map (`where`, `limit`, `offset`, `sort`) so they can be
//! persisted or sent over the wire. [`Query::from_structured`] is intentionally permissive: unknown
//! keys, malformed entries and invalid sort directions fall back to defaults instead of failing.

use crate::error::ResourceError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// How a predicate combines with the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl FromStr for Conjunction {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            other => Err(ResourceError::InvalidInput(format!(
                "Expected \"AND\" or \"OR\" for where clause type; received \"{other}\""
            ))),
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `field operator value` comparison tagged with its conjunction.
///
/// The operator is kept verbatim; it is only interpreted when a store translates the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    conjunction: Conjunction,
    field: String,
    operator: String,
    value: Value,
}

impl Predicate {
    /// Builds a predicate from a textual conjunction (`"and"`/`"or"`, any case).
    pub fn new(
        conjunction: &str,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, ResourceError> {
        let conjunction = conjunction.parse()?;
        Ok(Self::with_conjunction(conjunction, field, operator, value))
    }

    pub fn with_conjunction(
        conjunction: Conjunction,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            conjunction,
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn to_structured(&self) -> Value {
        json!({
            "type": self.conjunction.as_str().to_ascii_lowercase(),
            "key": self.field,
            "comparison": self.operator,
            "value": self.value,
        })
    }
}

/// Sort direction. Anything that is not `DESC` (any case) is ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn parse_lenient(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("DESC") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// The single active sort statement of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

/// A storage-agnostic query: predicates, sort and pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", from = "Value")]
pub struct Query {
    predicates: Vec<Predicate>,
    limit: Option<i64>,
    offset: i64,
    sort: Option<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an AND predicate.
    pub fn and_where(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.predicates.push(Predicate::with_conjunction(
            Conjunction::And,
            field,
            operator,
            value,
        ));
        self
    }

    /// Appends an OR predicate.
    pub fn or_where(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.predicates.push(Predicate::with_conjunction(
            Conjunction::Or,
            field,
            operator,
            value,
        ));
        self
    }

    /// Sets the pagination window, replacing any previous limit and offset.
    pub fn limit(mut self, count: i64, offset: i64) -> Self {
        self.limit = Some(count);
        self.offset = offset;
        self
    }

    /// Sets the sort statement, replacing any previous one.
    pub fn sort(mut self, field: impl Into<String>, direction: &str) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            direction: Direction::parse_lenient(direction),
        });
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn sort_spec(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    /// Serializes the query to its structured map form.
    pub fn to_structured(&self) -> Value {
        let predicates: Vec<Value> = self.predicates.iter().map(Predicate::to_structured).collect();
        json!({
            "where": predicates,
            "limit": self.limit.map_or(Value::Bool(false), Value::from),
            "offset": self.offset,
            "sort": self.sort.as_ref().map_or(Value::Bool(false), |s| Value::String(s.to_string())),
        })
    }

    /// Rebuilds a query from its structured map form.
    ///
    /// Keys are matched case-insensitively. An offset is only applied together with a limit,
    /// `where` entries without a `type` are AND predicates, and entries without a textual `key`
    /// are skipped.
    pub fn from_structured(definition: &Value) -> Self {
        let mut query = Self::new();
        let Some(definition) = definition.as_object() else {
            return query;
        };

        let mut limit = None;
        let mut offset = 0;
        for (key, value) in definition {
            match key.to_ascii_lowercase().as_str() {
                "offset" => offset = as_integer(value).unwrap_or(0),
                "limit" => limit = as_integer(value),
                "sort" => query.sort = parse_sort(value),
                "where" => {
                    let Some(entries) = value.as_array() else {
                        continue;
                    };
                    for entry in entries.iter().filter_map(Value::as_object) {
                        query = query.push_structured(entry);
                    }
                }
                _ => {}
            }
        }

        match limit {
            Some(limit) => query.limit(limit, offset),
            None => query,
        }
    }

    fn push_structured(self, entry: &Map<String, Value>) -> Self {
        let Some(field) = entry.get("key").and_then(Value::as_str) else {
            return self;
        };
        let operator = entry
            .get("comparison")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let value = entry.get("value").cloned().unwrap_or(Value::Null);

        let is_or = entry
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case("or"));
        if is_or {
            self.or_where(field, operator, value)
        } else {
            self.and_where(field, operator, value)
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn parse_sort(value: &Value) -> Option<Sort> {
    let statement = value.as_str()?.trim();
    if statement.is_empty() {
        return None;
    }
    // the direction is always the last token; field names may contain spaces
    let (field, direction) = statement.rsplit_once(' ').unwrap_or((statement, "ASC"));
    Some(Sort {
        field: field.to_string(),
        direction: Direction::parse_lenient(direction),
    })
}

impl From<Query> for Value {
    fn from(query: Query) -> Self {
        query.to_structured()
    }
}

impl From<Value> for Query {
    fn from(value: Value) -> Self {
        Self::from_structured(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_normalizes_conjunction_case() {
        let predicate = Predicate::new("or", "foo", "=", "bar").unwrap();
        assert_eq!(predicate.conjunction(), Conjunction::Or);
        assert_eq!(predicate.field(), "foo");
    }

    #[test]
    fn test_predicate_rejects_unknown_conjunction() {
        let result = Predicate::new("xor", "foo", "=", "bar");
        assert!(matches!(result, Err(ResourceError::InvalidInput(_))));
    }

    #[test]
    fn test_sort_coerces_unknown_direction_to_ascending() {
        let query = Query::new().sort("created", "sideways");
        assert_eq!(query.sort_spec().unwrap().direction, Direction::Asc);

        let query = query.sort("updated", "desc");
        let sort = query.sort_spec().unwrap();
        assert_eq!(sort.field, "updated");
        assert_eq!(sort.direction, Direction::Desc);
    }

    #[test]
    fn test_from_structured_tolerates_garbage() {
        let query = Query::from_structured(&json!({
            "where": [
                { "key": "foo", "comparison": "=", "value": 1 },
                "not an object",
                { "comparison": "=", "value": 2 },
            ],
            "offset": 5,
            "sort": "title",
            "unknown": true,
        }));

        assert_eq!(query.predicates().len(), 1);
        assert_eq!(query.predicates()[0].conjunction(), Conjunction::And);
        // offset is ignored without a limit
        assert_eq!(query.limit_value(), None);
        assert_eq!(query.offset(), 0);
        assert_eq!(query.sort_spec().unwrap().to_string(), "title ASC");
    }

    #[test]
    fn test_structured_form_uses_false_for_unset_values() {
        let structured = Query::new().to_structured();
        assert_eq!(
            structured,
            json!({ "where": [], "limit": false, "offset": 0, "sort": false })
        );
    }
}
