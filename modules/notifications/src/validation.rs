//! Request body and path validation
//!
//! Bodies are accepted as raw JSON so that every shape problem (wrong types,
//! missing fields, blank strings) is reported as a field-level validation
//! error instead of a generic deserialization failure.

use platform_http_contracts::FieldError;
use serde_json::{Map, Value};

use crate::models::{NewNotification, NotificationPatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationErrors {
    pub message: String,
    pub details: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    fn fields(details: Vec<FieldError>) -> Self {
        Self::new("validation error", details)
    }

    /// The body could not be parsed as JSON at all.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::fields(vec![FieldError::new("body", reason)])
    }
}

/// Check an already-typed create command: non-blank subject and message,
/// recipient (when present) strictly positive.
pub fn validate_new(input: &NewNotification) -> Result<(), ValidationErrors> {
    let mut details = Vec::new();
    if input.subject.trim().is_empty() {
        details.push(FieldError::new("subject", "subject is required"));
    }
    if input.message.trim().is_empty() {
        details.push(FieldError::new("message", "message is required"));
    }
    if let Some(id) = input.recipient_id {
        if id <= 0 {
            details.push(FieldError::new(
                "recipientId",
                "recipientId must be a positive integer",
            ));
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::fields(details))
    }
}

/// Check an update: no field provided blank. An empty patch is a no-op.
pub fn validate_patch(patch: &NotificationPatch) -> Result<(), ValidationErrors> {
    let mut details = Vec::new();
    if matches!(&patch.subject, Some(s) if s.trim().is_empty()) {
        details.push(FieldError::new("subject", "subject must not be empty"));
    }
    if matches!(&patch.message, Some(m) if m.trim().is_empty()) {
        details.push(FieldError::new("message", "message must not be empty"));
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::fields(details))
    }
}

/// Parse a create body. `recipientId: null` is treated as absent.
pub fn parse_create(body: &Value) -> Result<NewNotification, ValidationErrors> {
    let obj = as_object(body)?;
    let mut details = Vec::new();

    let subject = string_field(obj, "subject", &mut details);
    let message = string_field(obj, "message", &mut details);
    let recipient_id = recipient_field(obj, &mut details);

    let input = NewNotification {
        subject: subject.unwrap_or_default(),
        message: message.unwrap_or_default(),
        recipient_id,
    };

    if let Err(e) = validate_new(&input) {
        for detail in e.details {
            if !details.iter().any(|d: &FieldError| d.field == detail.field) {
                details.push(detail);
            }
        }
    }

    if details.is_empty() {
        Ok(input)
    } else {
        Err(ValidationErrors::fields(details))
    }
}

/// Parse an update body. Fields that are absent or `null` are left unchanged.
///
/// A body naming neither field is "Nothing to update"; explicit nulls count
/// as named and make the update a no-op.
pub fn parse_update(body: &Value) -> Result<NotificationPatch, ValidationErrors> {
    let obj = as_object(body)?;
    if !obj.contains_key("subject") && !obj.contains_key("message") {
        return Err(ValidationErrors::new("Nothing to update", Vec::new()));
    }
    let mut details = Vec::new();

    let patch = NotificationPatch {
        subject: string_field(obj, "subject", &mut details),
        message: string_field(obj, "message", &mut details),
    };

    if !details.is_empty() {
        return Err(ValidationErrors::fields(details));
    }
    validate_patch(&patch)?;
    Ok(patch)
}

/// Parse a path identifier; only positive integers name a notification.
pub fn parse_id(raw: &str) -> Result<i64, ValidationErrors> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationErrors::fields(vec![FieldError::new(
            "id",
            "id must be a positive integer",
        )])),
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    body.as_object().ok_or_else(|| {
        ValidationErrors::fields(vec![FieldError::new(
            "body",
            "request body must be a JSON object",
        )])
    })
}

/// Trimmed string value, `None` when absent or null. Wrong types are recorded.
fn string_field(
    obj: &Map<String, Value>,
    field: &str,
    details: &mut Vec<FieldError>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            details.push(FieldError::new(field, format!("{field} must be a string")));
            None
        }
    }
}

fn recipient_field(obj: &Map<String, Value>, details: &mut Vec<FieldError>) -> Option<i64> {
    let invalid = || FieldError::new("recipientId", "recipientId must be a positive integer");

    match obj.get("recipientId") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => {
            let id = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            });
            if id.is_none() {
                details.push(invalid());
            }
            id
        }
        // integer strings such as "5" or "+5"; range is checked by validate_new
        Some(Value::String(s)) => {
            let id = s.parse::<i64>().ok();
            if id.is_none() {
                details.push(invalid());
            }
            id
        }
        Some(_) => {
            details.push(invalid());
            None
        }
    }
}
