use platform_http_contracts::FieldError;
use serde_json::Value;
use validator::ValidateEmail;

use crate::models::{NewUser, NotifyRequest, UserPatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationErrors {
    pub message: String,
    pub details: Vec<FieldError>,
}

impl ValidationErrors {
    fn new(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::new("malformed request body", vec![FieldError::new("body", reason)])
    }
}

fn trimmed(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_email(email: &str) -> Result<(), ValidationErrors> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(ValidationErrors::new(
            "invalid email format",
            vec![FieldError::new("email", "invalid email format")],
        ))
    }
}

pub fn parse_new_user(body: &Value) -> Result<NewUser, ValidationErrors> {
    let name = trimmed(body, "name");
    let email = trimmed(body, "email");

    let (Some(name), Some(email)) = (name.clone(), email.clone()) else {
        let mut details = Vec::new();
        if name.is_none() {
            details.push(FieldError::new("name", "name is required"));
        }
        if email.is_none() {
            details.push(FieldError::new("email", "email is required"));
        }
        return Err(ValidationErrors::new("name and email are required", details));
    };

    check_email(&email)?;
    Ok(NewUser { name, email })
}

pub fn parse_user_patch(body: &Value) -> Result<UserPatch, ValidationErrors> {
    let patch = UserPatch {
        name: trimmed(body, "name"),
        email: trimmed(body, "email"),
    };
    if let Some(email) = &patch.email {
        check_email(email)?;
    }
    Ok(patch)
}

pub fn parse_notify(body: &Value) -> Result<NotifyRequest, ValidationErrors> {
    match (trimmed(body, "subject"), trimmed(body, "message")) {
        (Some(subject), Some(message)) => Ok(NotifyRequest { subject, message }),
        (subject, message) => {
            let mut details = Vec::new();
            if subject.is_none() {
                details.push(FieldError::new("subject", "subject is required"));
            }
            if message.is_none() {
                details.push(FieldError::new("message", "message is required"));
            }
            Err(ValidationErrors::new("subject and message are required", details))
        }
    }
}

pub fn parse_id(raw: &str) -> Result<i64, ValidationErrors> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationErrors::new(
            "invalid id",
            vec![FieldError::new("id", "id must be a positive integer")],
        )),
    }
}
