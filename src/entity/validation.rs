use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

/// The kind of rule a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Type,
    Format,
    MaxLength,
    Enum,
    Unique,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Required => "required",
            Rule::Type => "type",
            Rule::Format => "format",
            Rule::MaxLength => "maxLength",
            Rule::Enum => "enum",
            Rule::Unique => "unique",
        };
        f.write_str(name)
    }
}

/// A single field-level validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Dotted path to the field, e.g. `3.resource_id`.
    pub path: String,
    /// Index of the offending item when the error comes from a collection.
    pub index: Option<usize>,
    pub rule: Rule,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.rule, self.message)
    }
}

/// Validation failure for an entity or a collection of entities.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("could not validate {entity}: {}", summarize(.errors))]
pub struct EntityValidationError {
    pub entity: &'static str,
    pub errors: Vec<FieldError>,
}

impl EntityValidationError {
    pub fn new(entity: &'static str, errors: Vec<FieldError>) -> Self {
        Self { entity, errors }
    }

    /// A single uniqueness violation inside a collection.
    pub fn unique(entity: &'static str, index: usize, field: &str, message: String) -> Self {
        Self::new(
            entity,
            vec![FieldError {
                path: format!("{}.{}", index, field),
                index: Some(index),
                rule: Rule::Unique,
                message,
            }],
        )
    }

    /// Whether any error was raised for the given path and rule.
    pub fn has_error(&self, path: &str, rule: Rule) -> bool {
        self.errors.iter().any(|e| e.path == path && e.rule == rule)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn armored_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^-----BEGIN [A-Z0-9 ]+-----\r?\n[\s\S]*\r?\n-----END [A-Z0-9 ]+-----\s*$")
            .expect("armor pattern should compile")
    })
}

/// Check whether a value looks like an ASCII-armored block.
pub fn is_armored(value: &str) -> bool {
    armored_regex().is_match(value)
}

/// Reads typed fields out of a JSON object, collecting errors as it goes.
///
/// Each accessor returns `None` when the field is missing or invalid and
/// records the reason. Call [`ObjectReader::into_error`] once the entity has
/// been read to get the accumulated errors.
pub struct ObjectReader<'a> {
    object: Option<&'a Map<String, Value>>,
    prefix: String,
    errors: Vec<FieldError>,
    index: Option<usize>,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self::with_prefix(value, "", None)
    }

    /// Read an item of a collection; paths become `{index}.{field}`.
    pub fn at_index(value: &'a Value, index: usize) -> Self {
        Self::with_prefix(value, &index.to_string(), Some(index))
    }

    fn with_prefix(value: &'a Value, prefix: &str, index: Option<usize>) -> Self {
        let mut reader = Self {
            object: value.as_object(),
            prefix: prefix.to_string(),
            errors: Vec::new(),
            index,
        };
        if reader.object.is_none() {
            let path = if prefix.is_empty() { "." } else { prefix };
            reader.errors.push(FieldError {
                path: path.to_string(),
                index,
                rule: Rule::Type,
                message: "The value should be an object.".to_string(),
            });
        }
        reader
    }

    fn path(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.prefix, field)
        }
    }

    pub fn push(&mut self, field: &str, rule: Rule, message: impl Into<String>) {
        let path = self.path(field);
        self.errors.push(FieldError {
            path,
            index: self.index,
            rule,
            message: message.into(),
        });
    }

    /// Raw access to a field; `None` for missing and for JSON `null`.
    pub fn field(&self, field: &str) -> Option<&'a Value> {
        self.object
            .and_then(|o| o.get(field))
            .filter(|v| !v.is_null())
    }

    pub fn optional_str(&mut self, field: &str) -> Option<&'a str> {
        let value = self.field(field)?;
        match value.as_str() {
            Some(s) => Some(s),
            None => {
                self.push(field, Rule::Type, format!("The {} should be a string.", field));
                None
            }
        }
    }

    pub fn required_str(&mut self, field: &str) -> Option<&'a str> {
        if self.object.is_some() && self.field(field).is_none() {
            self.push(field, Rule::Required, format!("The {} is required.", field));
            return None;
        }
        self.optional_str(field)
    }

    pub fn optional_uuid(&mut self, field: &str) -> Option<Uuid> {
        let raw = self.optional_str(field)?;
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.push(
                    field,
                    Rule::Format,
                    format!("The {} should be a valid UUID.", field),
                );
                None
            }
        }
    }

    pub fn required_uuid(&mut self, field: &str) -> Option<Uuid> {
        if self.object.is_some() && self.field(field).is_none() {
            self.push(field, Rule::Required, format!("The {} is required.", field));
            return None;
        }
        self.optional_uuid(field)
    }

    pub fn optional_bool(&mut self, field: &str) -> Option<bool> {
        let value = self.field(field)?;
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.push(field, Rule::Type, format!("The {} should be a boolean.", field));
                None
            }
        }
    }

    pub fn required_bool(&mut self, field: &str) -> Option<bool> {
        if self.object.is_some() && self.field(field).is_none() {
            self.push(field, Rule::Required, format!("The {} is required.", field));
            return None;
        }
        self.optional_bool(field)
    }

    /// A required string no longer than `max` characters.
    pub fn bounded_str(&mut self, field: &str, max: usize) -> Option<&'a str> {
        let value = self.required_str(field)?;
        if value.chars().count() > max {
            self.push(
                field,
                Rule::MaxLength,
                format!("The {} should be {} characters in length maximum.", field, max),
            );
            return None;
        }
        Some(value)
    }

    /// A required ASCII-armored block.
    pub fn required_armored(&mut self, field: &str) -> Option<&'a str> {
        let value = self.required_str(field)?;
        if !is_armored(value) {
            self.push(
                field,
                Rule::Format,
                format!("The {} should be a valid armored message.", field),
            );
            return None;
        }
        Some(value)
    }

    /// A required string restricted to `allowed` values.
    pub fn required_enum(&mut self, field: &str, allowed: &[&str]) -> Option<&'a str> {
        let value = self.required_str(field)?;
        if !allowed.contains(&value) {
            self.push(
                field,
                Rule::Enum,
                format!("The {} should be one of: {}.", field, allowed.join(", ")),
            );
            return None;
        }
        Some(value)
    }

    /// An optional array; errors if the field is present but not an array.
    pub fn optional_array(&mut self, field: &str) -> Option<&'a Vec<Value>> {
        let value = self.field(field)?;
        match value.as_array() {
            Some(items) => Some(items),
            None => {
                self.push(field, Rule::Type, format!("The {} should be an array.", field));
                None
            }
        }
    }

    /// Merge errors produced by a nested reader or collection under `field`.
    pub fn absorb(&mut self, field: &str, nested: EntityValidationError) {
        for error in nested.errors {
            let path = self.path(&format!("{}.{}", field, error.path));
            self.errors.push(FieldError { path, ..error });
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    pub fn into_error(self, entity: &'static str) -> EntityValidationError {
        EntityValidationError::new(entity, self.errors)
    }
}
