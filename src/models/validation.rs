//! Field-level validation errors in the `{"field": ["message", ...]}` shape
//! API clients expect.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let key = if field == "__all__" {
                NON_FIELD_ERRORS.to_string()
            } else {
                field.to_string()
            };
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| default_message(&error.code));
                out.add(key.clone(), message);
            }
        }
        out
    }
}

fn default_message(code: &str) -> String {
    match code {
        "email" => "Enter a valid email address.".to_string(),
        "length" => "Ensure this field has a valid length.".to_string(),
        "range" => "Ensure this value is within the allowed range.".to_string(),
        other => format!("Invalid value ({}).", other),
    }
}

/// Require a trimmed, non-blank string.
pub fn not_blank(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    }
}

/// Record a uniqueness violation when `taken` is true.
pub fn unique(errors: &mut FieldErrors, field: &str, taken: bool, label: &str) {
    if taken {
        errors.add(field, format!("{} with this {} already exists.", label, field));
    }
}

/// Record a missing related object.
pub fn exists(errors: &mut FieldErrors, field: &str, id: i64, found: bool) {
    if !found {
        errors.add(
            field,
            format!("Invalid pk \"{}\" - object does not exist.", id),
        );
    }
}
