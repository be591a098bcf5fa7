//! # Document-Store Criteria
//!
//! Translates a [`Query`] into the MongoDB query language: a filter document, a sort document and
//! skip/limit values.
//!
//! ## Grouping
//!
//! Predicates are split into an AND group and an OR group, preserving their relative order. Each
//! group is folded field by field:
//!
//! | Existing entry      | Incoming `=`                      | Incoming `<`, `>=`, `!=`, ...        |
//! |---------------------|-----------------------------------|--------------------------------------|
//! | none                | `field: value`                    | `field: { $op: value }`              |
//! | scalar `v`          | `field: { $in: [v, value] }`      | `field: { $in: [v], $op: value }`    |
//! | document            | append to (or start) `$in`        | set `$op` (last write wins)          |
//!
//! The OR group is nested under `$or` inside the AND document, as an array holding one document
//! per field. An empty AND group with a non-empty OR group yields a filter holding only `$or`.
//!
//! Unrecognized comparison tokens are treated as equality.

use crate::query::{Conjunction, Direction, Predicate, Query};
use crate::record::Record;
use serde_json::{Map, Value};
use tracing::debug;

/// Key under which the OR group is nested.
pub const OR_KEY: &str = "$or";
/// Key of the "value is one of" accumulator.
pub const IN_KEY: &str = "$in";

/// Comparison operators understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Ne,
    Unrecognized,
}

impl Operator {
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "=" => Self::Eq,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "!=" => Self::Ne,
            _ => Self::Unrecognized,
        }
    }

    /// The store operator key, or `None` for equality.
    pub fn store_key(self) -> Option<&'static str> {
        match self {
            Self::Lt => Some("$lt"),
            Self::Lte => Some("$lte"),
            Self::Gt => Some("$gt"),
            Self::Gte => Some("$gte"),
            Self::Ne => Some("$ne"),
            Self::Eq | Self::Unrecognized => None,
        }
    }
}

/// Store-specific query criteria produced for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub filter: Record,
    /// `field -> 1 | -1`
    pub sort: Option<Record>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Accumulated condition for one field within a group.
#[derive(Debug, Clone)]
enum FieldCondition {
    Equals(Value),
    Document(Map<String, Value>),
}

impl FieldCondition {
    fn start(operator: Option<&'static str>, value: Value) -> Self {
        match operator {
            None => Self::Equals(value),
            Some(op) => Self::Document(Map::from_iter([(op.to_string(), value)])),
        }
    }

    fn merge(self, operator: Option<&'static str>, value: Value) -> Self {
        match (self, operator) {
            (Self::Equals(existing), None) => {
                Self::Document(Map::from_iter([(
                    IN_KEY.to_string(),
                    Value::Array(vec![existing, value]),
                )]))
            }
            (Self::Equals(existing), Some(op)) => Self::Document(Map::from_iter([
                (IN_KEY.to_string(), Value::Array(vec![existing])),
                (op.to_string(), value),
            ])),
            (Self::Document(mut document), None) => {
                match document.get_mut(IN_KEY) {
                    Some(Value::Array(values)) => values.push(value),
                    _ => {
                        document.insert(IN_KEY.to_string(), Value::Array(vec![value]));
                    }
                }
                Self::Document(document)
            }
            (Self::Document(mut document), Some(op)) => {
                document.insert(op.to_string(), value);
                Self::Document(document)
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Equals(value) => value,
            Self::Document(document) => Value::Object(document),
        }
    }
}

/// Ordered per-field conditions of one conjunction group.
#[derive(Debug, Default)]
struct Group {
    fields: Vec<(String, FieldCondition)>,
}

impl Group {
    fn with(mut self, predicate: &Predicate) -> Self {
        let operator = Operator::from_token(predicate.operator());
        if operator == Operator::Unrecognized {
            debug!(
                field = predicate.field(),
                comparison = predicate.operator(),
                "Unrecognized comparison treated as equality"
            );
        }
        let key = operator.store_key();
        let value = predicate.value().clone();

        match self.fields.iter().position(|(f, _)| f == predicate.field()) {
            Some(index) => {
                let (field, condition) = self.fields.remove(index);
                self.fields.insert(index, (field, condition.merge(key, value)));
            }
            None => self
                .fields
                .push((predicate.field().to_string(), FieldCondition::start(key, value))),
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_document(self) -> Record {
        self.fields
            .into_iter()
            .map(|(field, condition)| (field, condition.into_value()))
            .collect()
    }

    /// One single-field document per entry, the shape `$or` expects.
    fn into_alternatives(self) -> Vec<Value> {
        self.fields
            .into_iter()
            .map(|(field, condition)| {
                Value::Object(Map::from_iter([(field, condition.into_value())]))
            })
            .collect()
    }
}

/// Translates queries into document-store criteria.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaTranslator;

impl CriteriaTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Produces fresh criteria for `query`. Never fails.
    pub fn translate(&self, query: &Query) -> Criteria {
        Criteria {
            filter: Self::filter(query.predicates()),
            sort: query.sort_spec().map(|sort| {
                let marker = match sort.direction {
                    Direction::Desc => -1,
                    Direction::Asc => 1,
                };
                Map::from_iter([(sort.field.clone(), Value::from(marker))])
            }),
            // skip only travels with a limit
            skip: query.limit_value().map(|_| query.offset()),
            limit: query.limit_value(),
        }
    }

    fn filter(predicates: &[Predicate]) -> Record {
        let (and_group, or_group) = predicates.iter().fold(
            (Group::default(), Group::default()),
            |(and_group, or_group), predicate| match predicate.conjunction() {
                Conjunction::And => (and_group.with(predicate), or_group),
                Conjunction::Or => (and_group, or_group.with(predicate)),
            },
        );

        let mut filter = and_group.into_document();
        if !or_group.is_empty() {
            filter.insert(OR_KEY.to_string(), Value::Array(or_group.into_alternatives()));
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter_of(query: &Query) -> Value {
        Value::Object(CriteriaTranslator::new().translate(query).filter)
    }

    #[test]
    fn test_equality_is_direct_assignment() {
        let query = Query::new().and_where("foo", "=", "bar");
        assert_eq!(filter_of(&query), json!({ "foo": "bar" }));
    }

    #[test]
    fn test_repeated_equality_accumulates_in_order() {
        let query = Query::new()
            .and_where("foo", "=", 1)
            .and_where("foo", "=", 2)
            .and_where("foo", "=", 2)
            .and_where("foo", "=", 3);
        assert_eq!(filter_of(&query), json!({ "foo": { "$in": [1, 2, 2, 3] } }));
    }

    #[test]
    fn test_comparison_operators_map_to_store_keys() {
        let query = Query::new()
            .and_where("a", "<", 1)
            .and_where("b", "<=", 2)
            .and_where("c", ">", 3)
            .and_where("d", ">=", 4)
            .and_where("e", "!=", 5);
        assert_eq!(
            filter_of(&query),
            json!({
                "a": { "$lt": 1 },
                "b": { "$lte": 2 },
                "c": { "$gt": 3 },
                "d": { "$gte": 4 },
                "e": { "$ne": 5 },
            })
        );
    }

    #[test]
    fn test_range_after_scalar_keeps_scalar_in_accumulator() {
        let query = Query::new().and_where("age", "=", 30).and_where("age", "<", 65);
        assert_eq!(filter_of(&query), json!({ "age": { "$in": [30], "$lt": 65 } }));
    }

    #[test]
    fn test_range_operators_merge_and_last_write_wins() {
        let query = Query::new()
            .and_where("age", ">", 18)
            .and_where("age", "<", 65)
            .and_where("age", ">", 21);
        assert_eq!(filter_of(&query), json!({ "age": { "$gt": 21, "$lt": 65 } }));
    }

    #[test]
    fn test_equality_after_range_starts_accumulator() {
        let query = Query::new()
            .and_where("age", ">", 18)
            .and_where("age", "=", 40)
            .and_where("age", "=", 50);
        assert_eq!(
            filter_of(&query),
            json!({ "age": { "$gt": 18, "$in": [40, 50] } })
        );
    }

    #[test]
    fn test_unrecognized_operator_degrades_to_equality() {
        let query = Query::new().and_where("foo", "eq", "bar").and_where("baz", "LIKE", "b%");
        assert_eq!(filter_of(&query), json!({ "foo": "bar", "baz": "b%" }));
    }

    #[test]
    fn test_or_group_nests_under_grouping_key() {
        let query = Query::new()
            .and_where("foo", "=", "bar")
            .or_where("bar", "!=", "baz")
            .and_where("baz", ">", 1)
            .or_where("qux", "=", 1)
            .or_where("qux", "=", 2);
        assert_eq!(
            filter_of(&query),
            json!({
                "foo": "bar",
                "baz": { "$gt": 1 },
                "$or": [
                    { "bar": { "$ne": "baz" } },
                    { "qux": { "$in": [1, 2] } },
                ],
            })
        );
    }

    #[test]
    fn test_all_or_query_yields_bare_grouping_document() {
        let query = Query::new().or_where("a", "=", 1).or_where("b", "=", 2);
        assert_eq!(
            filter_of(&query),
            json!({ "$or": [ { "a": 1 }, { "b": 2 } ] })
        );
    }

    #[test]
    fn test_empty_query_translates_to_empty_criteria() {
        let criteria = CriteriaTranslator::new().translate(&Query::new());
        assert_eq!(criteria, Criteria::default());
    }

    #[test]
    fn test_sort_markers() {
        let translator = CriteriaTranslator::new();
        let desc = translator.translate(&Query::new().sort("created", "DESC"));
        assert_eq!(desc.sort, Some(Map::from_iter([("created".to_string(), json!(-1))])));

        let asc = translator.translate(&Query::new().sort("title", "bogus"));
        assert_eq!(asc.sort, Some(Map::from_iter([("title".to_string(), json!(1))])));
    }

    #[test]
    fn test_skip_only_with_limit() {
        let translator = CriteriaTranslator::new();
        let paged = translator.translate(&Query::new().limit(10, 30));
        assert_eq!(paged.limit, Some(10));
        assert_eq!(paged.skip, Some(30));

        let unpaged = translator.translate(&Query::new());
        assert_eq!(unpaged.limit, None);
        assert_eq!(unpaged.skip, None);
    }

    #[test]
    fn test_translation_does_not_share_state_between_calls() {
        let translator = CriteriaTranslator::new();
        let first = translator.translate(&Query::new().and_where("foo", "=", 1));
        let second = translator.translate(&Query::new().and_where("foo", "=", 2));
        assert_eq!(Value::Object(first.filter), json!({ "foo": 1 }));
        assert_eq!(Value::Object(second.filter), json!({ "foo": 2 }));
    }
}
