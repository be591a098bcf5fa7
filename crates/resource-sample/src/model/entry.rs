use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use resource_framework::{Entity, Record, RecordId, ValidationErrors, ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const REQUIRED: &str = "Value is required and can't be empty";

/// A blog entry, identified by its URL slug.
///
/// # Resource Framework
/// This struct implements the [`Entity`](resource_framework::Entity) trait, allowing it to be
/// managed by a [`Resource`](resource_framework::Resource).
///
/// Populating from a record is forgiving the way form input is: timestamps accept integers,
/// numeric strings, RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]` dates (read as UTC) and extended-JSON
/// `{"$date": ..}` values; unparseable timestamps leave the field untouched. Flags accept booleans, numbers or `"1"`/`"true"`/`"on"`, and tags accept a
/// list or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogEntry {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub is_draft: bool,
    pub is_public: bool,
    /// Unix timestamp, stamped on create when unset.
    pub created: i64,
    /// Unix timestamp, refreshed on every update.
    pub updated: i64,
    pub timezone: String,
    pub tags: Vec<String>,
    pub version: i64,
}

impl Default for BlogEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            body: String::new(),
            author: String::new(),
            is_draft: true,
            is_public: false,
            created: 0,
            updated: 0,
            timezone: "UTC".to_string(),
            tags: Vec::new(),
            version: 2,
        }
    }
}

impl BlogEntry {
    /// Creates a draft entry.
    pub fn new(
        slug: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: slug.into(),
            title: title.into(),
            body: body.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Visible to readers: neither a draft nor private.
    pub fn is_published(&self) -> bool {
        !self.is_draft && self.is_public
    }
}

impl Entity for BlogEntry {
    fn id(&self) -> Option<RecordId> {
        (!self.id.is_empty()).then(|| RecordId::from(self.id.as_str()))
    }

    fn to_record(&self) -> Record {
        let mut record = Record::from_iter([
            ("title".to_string(), json!(self.title)),
            ("body".to_string(), json!(self.body)),
            ("author".to_string(), json!(self.author)),
            ("is_draft".to_string(), json!(self.is_draft)),
            ("is_public".to_string(), json!(self.is_public)),
            ("created".to_string(), json!(self.created)),
            ("updated".to_string(), json!(self.updated)),
            ("timezone".to_string(), json!(self.timezone)),
            ("tags".to_string(), json!(self.tags)),
            ("version".to_string(), json!(self.version)),
        ]);
        if !self.id.is_empty() {
            record.insert(ID_FIELD.to_string(), json!(self.id));
        }
        record
    }

    fn from_record(&mut self, record: Record) {
        for (key, value) in record {
            match key.as_str() {
                ID_FIELD => self.id = text(value),
                "title" => self.title = text(value),
                "body" => self.body = text(value),
                "author" => self.author = text(value),
                "is_draft" => self.is_draft = flag(&value),
                "is_public" => self.is_public = flag(&value),
                "created" => {
                    if let Some(ts) = timestamp(&value) {
                        self.created = ts;
                    }
                }
                "updated" => {
                    if let Some(ts) = timestamp(&value) {
                        self.updated = ts;
                    }
                }
                "timezone" => self.timezone = text(value),
                "tags" => self.tags = tags(value),
                "version" => {
                    if let Some(version) = value.as_i64() {
                        self.version = version;
                    }
                }
                _ => {}
            }
        }
    }

    fn is_valid(&self) -> bool {
        self.input_errors().is_empty()
    }

    fn input_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.id.is_empty() {
            errors.add("id", REQUIRED);
        } else if !is_slug(&self.id) {
            errors.add(
                "id",
                format!("\"{}\" may only contain lowercase letters, digits and dashes", self.id),
            );
        }
        for (field, value) in [
            ("title", &self.title),
            ("body", &self.body),
            ("author", &self.author),
        ] {
            if value.trim().is_empty() {
                errors.add(field, REQUIRED);
            }
        }
        if !is_timezone(&self.timezone) {
            errors.add(
                "timezone",
                format!("Invalid timezone \"{}\" provided.", self.timezone),
            );
        }
        if self.created <= 0 {
            errors.add("created", "Invalid timestamp");
        }
        if self.updated < self.created {
            errors.add("updated", "Cannot predate the creation timestamp");
        }

        errors
    }
}

fn text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"),
        _ => false,
    }
}

fn timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => parse_date(s.trim()),
        Value::Object(extended) => match extended.get("$date")? {
            Value::String(s) => parse_date(s.trim()),
            // milliseconds since the epoch
            Value::Number(n) => n.as_i64().map(|ms| ms.div_euclid(1000)),
            _ => None,
        },
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<i64> {
    if let Ok(seconds) = text.parse::<i64>() {
        return Some(seconds);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.timestamp());
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(date.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc().timestamp())
}

fn tags(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(tag) => Some(tag),
                _ => None,
            })
            .collect(),
        Value::String(list) => list
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn is_slug(slug: &str) -> bool {
    slug.bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// A name known to the IANA timezone database.
fn is_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}
