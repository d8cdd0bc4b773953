use serde_json::{Map, Value};

use crate::RequestError;

/// The type a message field is declared as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    /// Any number, integer or not
    Number,
    Integer,
    Bool,
    Object,
}

impl FieldKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
        }
    }
}

/// Returns the declared type of a field in a message's `info`.
/// A field name always has the same type, whichever command it is used by.
pub fn field_kind(name: &str) -> Option<FieldKind> {
    let kind = match name {
        "room_id" | "room_id_copy" | "room_name" | "room_secret" | "room_message" => {
            FieldKind::String
        }
        "client_name" | "client_feedback" | "client_email" | "client_user_agent" => {
            FieldKind::String
        }
        "media_id" | "media_id_after" | "media_name" | "media_type" => FieldKind::String,
        "payment_return_url" => FieldKind::String,
        "room_start" | "room_paused" | "client_synced" => FieldKind::Number,
        "room_loaded" | "payment_amount" => FieldKind::Integer,
        "room_admins_only" => FieldKind::Bool,
        "media_content" => FieldKind::Object,
        _ => return None,
    };

    Some(kind)
}

/// The validated fields of a message.
///
/// Strings are trimmed and empty strings are turned into nulls, so a nullable
/// string is either `None` or has content.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    values: Map<String, Value>,
}

impl Fields {
    /// Validates `data` against the shared field table
    pub fn expect(
        data: &Map<String, Value>,
        required: &[&str],
        nullable: &[&str],
    ) -> Result<Self, RequestError> {
        Self::expect_with(data, field_kind, required, nullable)
    }

    /// Validates `data`, which must contain exactly the `required` and `nullable` fields.
    pub fn expect_with(
        data: &Map<String, Value>,
        kinds: impl Fn(&str) -> Option<FieldKind>,
        required: &[&str],
        nullable: &[&str],
    ) -> Result<Self, RequestError> {
        let mut extraneous: Vec<_> = data
            .keys()
            .filter(|k| !required.contains(&k.as_str()) && !nullable.contains(&k.as_str()))
            .map(String::as_str)
            .collect();

        if !extraneous.is_empty() {
            extraneous.sort_unstable();

            return Err(RequestError::client_error(format!(
                "Unknown fields given: {}",
                extraneous.join(", ")
            )));
        }

        let mut values = Map::new();

        for &key in required.iter().chain(nullable) {
            let is_nullable = nullable.contains(&key);
            let invalid = || RequestError::client_error(format!("Invalid value for '{key}' field"));

            let value = data
                .get(key)
                .ok_or_else(|| RequestError::client_error(format!("Missing '{key}' field")))?;

            let kind = kinds(key).ok_or_else(invalid)?;
            let is_valid = kind.accepts(value) || (is_nullable && value.is_null());

            if !is_valid {
                return Err(invalid());
            }

            let value = normalize(value);

            if value.is_null() && !is_nullable {
                return Err(invalid());
            }

            values.insert(key.to_string(), value);
        }

        Ok(Self { values })
    }

    /// Takes a required string
    pub fn string(&mut self, name: &str) -> Result<String, RequestError> {
        self.optional_string(name).ok_or_else(|| missing(name))
    }

    pub fn optional_string(&mut self, name: &str) -> Option<String> {
        match self.values.remove(name) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Takes a required number
    pub fn number(&mut self, name: &str) -> Result<f64, RequestError> {
        self.optional_number(name).ok_or_else(|| missing(name))
    }

    pub fn optional_number(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name).and_then(|v| v.as_f64())
    }

    pub fn integer(&mut self, name: &str) -> Result<i64, RequestError> {
        self.values
            .remove(name)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| missing(name))
    }

    pub fn bool(&mut self, name: &str) -> Result<bool, RequestError> {
        self.values
            .remove(name)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| missing(name))
    }

    pub fn object(&mut self, name: &str) -> Result<Map<String, Value>, RequestError> {
        match self.values.remove(name) {
            Some(Value::Object(value)) => Ok(value),
            _ => Err(missing(name)),
        }
    }
}

fn missing(name: &str) -> RequestError {
    RequestError::client_error(format!("Missing '{name}' field"))
}

/// Trims strings and maps empty ones to null, as the store cannot keep empty strings
fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();

            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        }
        other => other.clone(),
    }
}
