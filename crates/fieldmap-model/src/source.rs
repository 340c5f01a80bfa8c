//! Flattened source document leaves.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse value type inferred from a leaf's terminal key and value shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    String,
    Number,
    Boolean,
    Email,
    Phone,
    Address,
    Name,
    Date,
    Id,
}

const EMAIL_KEYS: &[&str] = &["email", "mail"];
const PHONE_KEYS: &[&str] = &["phone", "contact", "mobile", "telephone", "cell"];
const ADDRESS_KEYS: &[&str] = &["address", "street", "city", "state", "zip", "postal"];
const NAME_KEYS: &[&str] = &["name", "personnel"];
const DATE_KEYS: &[&str] = &["date", "created", "modified", "updated", "timestamp"];

impl InferredType {
    /// Infers the type of a leaf from its terminal key and value.
    ///
    /// Non-string scalars are typed by their JSON kind. Strings are typed by
    /// keyword hits on the key first, then by the shape of the value.
    pub fn infer(key: &str, value: &Value) -> Self {
        match value {
            Value::Bool(_) => return Self::Boolean,
            Value::Number(_) => return Self::Number,
            _ => {}
        }
        let key = key.trim().to_lowercase();
        let hit = |words: &[&str]| words.iter().any(|word| key.contains(word));
        if hit(EMAIL_KEYS) {
            return Self::Email;
        }
        if hit(PHONE_KEYS) {
            return Self::Phone;
        }
        if hit(ADDRESS_KEYS) {
            return Self::Address;
        }
        if hit(NAME_KEYS) {
            return Self::Name;
        }
        if hit(DATE_KEYS) {
            return Self::Date;
        }
        if key == "identifier" || key.ends_with("id") {
            return Self::Id;
        }
        match value.as_str() {
            Some(text) if looks_like_email(text) => Self::Email,
            Some(text) if looks_like_phone(text) => Self::Phone,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Name => "name",
            Self::Date => "date",
            Self::Id => "id",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn looks_like_email(text: &str) -> bool {
    let text = text.trim();
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
        }
        None => false,
    }
}

fn looks_like_phone(text: &str) -> bool {
    let text = text.trim();
    let digits = text.chars().filter(char::is_ascii_digit).count();
    digits >= 7
        && text.chars().enumerate().all(|(idx, c)| {
            c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (idx == 0 && c == '+')
        })
}

/// One leaf value of a source document, addressed by its dotted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePath {
    pub path: String,
    pub value: Value,
    pub inferred_type: InferredType,
}

impl SourcePath {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        let path = path.into();
        let inferred_type = InferredType::infer(terminal_segment(&path), &value);
        Self {
            path,
            value,
            inferred_type,
        }
    }

    /// The last segment of the path.
    pub fn terminal(&self) -> &str {
        terminal_segment(&self.path)
    }

    /// All but the last segment, or `None` for a top-level leaf.
    pub fn parent(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }

    /// Null and blank string leaves are counted but never applied.
    pub fn is_meaningful(&self) -> bool {
        is_meaningful_value(&self.value)
    }
}

pub fn terminal_segment(path: &str) -> &str {
    path.rsplit_once('.').map_or(path, |(_, last)| last)
}

pub fn is_meaningful_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}
