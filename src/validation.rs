//! Payload validation
//!
//! Write payloads arrive as JSON objects. [`Record::from_json`] checks them
//! against an [`EntityDescriptor`] once, at the boundary: every key must be a
//! declared column and every value must coerce to that column's type. Past
//! this point the engine only handles typed values.
//!
//! ```rust,ignore
//! let record = Record::from_json(&descriptor, &json!({"word": "neko", "count": 3}))?;
//! assert_eq!(record.get("count"), Some(&Value::Int(Some(3))));
//! ```

use sea_orm::{EntityTrait, Value};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

use crate::core::descriptor::{ColumnInfo, EntityDescriptor};
use crate::errors::{CrudError, CrudResult};
use crate::filtering::values::coerce_json;

/// Validation error with field name and message
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collection of validation errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `Ok` when nothing was collected
    ///
    /// # Errors
    /// A `Validation` error listing every collected message
    pub fn result(self) -> CrudResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl From<ValidationErrors> for CrudError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_many(errors.errors.iter().map(ToString::to_string).collect())
    }
}

/// One typed field of a [`Record`]
#[derive(Debug, Clone)]
pub struct Field<C> {
    pub name: String,
    pub column: C,
    pub value: Value,
}

/// A write payload validated against one entity
pub struct Record<E: EntityTrait> {
    fields: Vec<Field<E::Column>>,
    raw: JsonValue,
}

impl<E: EntityTrait> Clone for Record<E> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            raw: self.raw.clone(),
        }
    }
}

impl<E: EntityTrait> fmt::Debug for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("fields", &self.fields)
            .field("raw", &self.raw)
            .finish()
    }
}

impl<E: EntityTrait> Record<E> {
    /// Validate a JSON object against the descriptor.
    ///
    /// A `null` primary key is treated as absent.
    ///
    /// # Errors
    /// - `ValidationError` when the payload is not an object, a value does not
    ///   fit its column, or `null` is sent for a non-nullable column
    /// - `UnknownColumn` for a key that is not a column
    pub fn from_json(descriptor: &EntityDescriptor<E>, payload: &JsonValue) -> CrudResult<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| CrudError::validation("Payload must be a JSON object"))?;
        let primary_key = descriptor.primary_key();
        let is_key = |info: &ColumnInfo<E::Column>| primary_key.iter().any(|pk| pk.name() == info.name());

        let mut errors = ValidationErrors::new();
        let mut fields = Vec::with_capacity(object.len());
        for (key, value) in object {
            let info = descriptor.resolve(key)?;
            if !info.kind().is_writable() {
                errors.add(ValidationError::new(key, "column cannot be written"));
                continue;
            }
            if value.is_null() && !info.is_nullable() {
                if !is_key(info) {
                    errors.add(ValidationError::new(key, "cannot be null"));
                }
                continue;
            }
            match coerce_json(info, value) {
                Ok(value) => fields.push(Field {
                    name: info.name().to_owned(),
                    column: info.column(),
                    value,
                }),
                Err(err) => errors.add(ValidationError::new(key, strip_field(&err, key))),
            }
        }
        errors.result()?;

        Ok(Self {
            fields,
            raw: payload.clone(),
        })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// `Some` only for a present, non-null value
    #[must_use]
    pub fn get_non_null(&self, name: &str) -> Option<&Value> {
        self.get(name).filter(|v| !is_null(v))
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(idx).value)
    }

    /// Set a column only when the payload did not provide it
    pub fn insert_if_absent(&mut self, info: &ColumnInfo<E::Column>, value: Value) {
        if self.get(info.name()).is_none() {
            self.fields.push(Field {
                name: info.name().to_owned(),
                column: info.column(),
                value,
            });
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field<E::Column>> {
        self.fields.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The payload exactly as received
    #[must_use]
    pub fn raw(&self) -> &JsonValue {
        &self.raw
    }

    #[must_use]
    pub fn into_raw(self) -> JsonValue {
        self.raw
    }
}

/// Whether a `sea_orm::Value` is SQL NULL
#[must_use]
pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Bool(v) => v.is_none(),
        Value::TinyInt(v) => v.is_none(),
        Value::SmallInt(v) => v.is_none(),
        Value::Int(v) => v.is_none(),
        Value::BigInt(v) => v.is_none(),
        Value::Float(v) => v.is_none(),
        Value::Double(v) => v.is_none(),
        Value::String(v) => v.is_none(),
        Value::Bytes(v) => v.is_none(),
        Value::Json(v) => v.is_none(),
        Value::ChronoDate(v) => v.is_none(),
        Value::ChronoDateTime(v) => v.is_none(),
        Value::ChronoDateTimeWithTimeZone(v) => v.is_none(),
        Value::Uuid(v) => v.is_none(),
        _ => false,
    }
}

// Coercion messages are prefixed with the column name already
fn strip_field(err: &CrudError, field: &str) -> String {
    let message = err.message();
    message
        .strip_prefix(&format!("{field}: "))
        .map_or_else(|| message.clone(), str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_fixtures::word;
    use serde_json::json;

    fn descriptor() -> EntityDescriptor<word::Entity> {
        EntityDescriptor::from_entity("word")
    }

    #[test]
    fn test_valid_record() {
        let payload = json!({"word": "neko", "count": 3, "note": null});
        let record = Record::from_json(&descriptor(), &payload).unwrap();
        assert_eq!(record.get("count"), Some(&Value::Int(Some(3))));
        assert_eq!(record.get("note"), Some(&Value::String(None)));
        assert!(record.get_non_null("note").is_none());
        assert_eq!(record.raw(), &payload);
    }

    #[test]
    fn test_non_object_payload() {
        for payload in [json!([1, 2]), json!("word"), json!(null)] {
            let err = Record::from_json(&descriptor(), &payload).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationError);
        }
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Record::from_json(&descriptor(), &json!({"word": "a", "is_admin": true}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownColumn);
    }

    #[test]
    fn test_errors_are_collected() {
        let payload = json!({"count": "many", "word": null, "score": "high"});
        let err = Record::from_json(&descriptor(), &payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        let message = err.message();
        assert!(message.contains("count: expected integer"), "{message}");
        assert!(message.contains("word: cannot be null"), "{message}");
        assert!(message.contains("score: expected number"), "{message}");
    }

    #[test]
    fn test_null_primary_key_is_absent() {
        let record = Record::from_json(&descriptor(), &json!({"id": null, "word": "a"})).unwrap();
        assert!(record.get("id").is_none());
    }

    #[test]
    fn test_insert_if_absent_and_remove() {
        let d = descriptor();
        let owner = d.resolve("user_id").unwrap();

        let mut record = Record::from_json(&d, &json!({"word": "a"})).unwrap();
        record.insert_if_absent(owner, Value::Int(Some(7)));
        assert_eq!(record.get("user_id"), Some(&Value::Int(Some(7))));

        let mut record = Record::from_json(&d, &json!({"word": "a", "user_id": 9})).unwrap();
        record.insert_if_absent(owner, Value::Int(Some(7)));
        assert_eq!(record.get("user_id"), Some(&Value::Int(Some(9))));

        assert_eq!(record.remove("word"), Some(Value::String(Some(Box::new("a".into())))));
        assert!(record.remove("word").is_none());
    }

    #[test]
    fn test_validation_errors_collection() {
        let mut errors = ValidationErrors::new();
        assert!(errors.clone().result().is_ok());
        errors.add(ValidationError::new("email", "is required"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].to_string(), "email: is required");
        assert_eq!(errors.result().unwrap_err().message(), "email: is required");
    }
}
