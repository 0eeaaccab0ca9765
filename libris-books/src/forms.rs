//! User input for the mutations, validated before anything is sent.

use crate::models::Genre;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::{collections::BTreeMap, fmt};
use validator::{Validate, ValidationErrors};

/// Validation messages keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages for one field, empty if it's valid.
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first message of the first invalid field, in field name order.
    pub fn first(&self) -> Option<&str> {
        self.0
            .values()
            .flat_map(|messages| messages.iter())
            .map(String::as_str)
            .next()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    pub(crate) fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::default();
        for (field, errors) in errors.field_errors() {
            for error in errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                fields.add(field.to_string(), message);
            }
        }
        fields
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

fn check<T: Validate>(form: &T) -> Result<(), FieldErrors> {
    form.validate().map_err(FieldErrors::from)
}

/// A book to add. Serializes to the create request body.
#[derive(Clone, Debug, PartialEq, Serialize, Validate)]
pub struct NewBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub genre: Genre,
    #[validate(length(min = 10, message = "ISBN must be at least 10 characters"))]
    pub isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Must have at least 1 copy"))]
    pub copies: u32
}

impl NewBook {
    pub fn check(&self) -> Result<(), FieldErrors> {
        check(self)
    }
}

/// A partial update. Only the fields that are set are sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Validate)]
pub struct BookChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, message = "ISBN must be at least 10 characters"))]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>
}

impl BookChanges {
    pub fn check(&self) -> Result<(), FieldErrors> {
        check(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == BookChanges::default()
    }
}

/// The default due date for a new borrow.
pub fn tomorrow(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(1)
}

#[derive(Clone, Debug, PartialEq, Validate)]
pub struct BorrowForm {
    #[validate(length(min = 1, message = "Book ID is required"))]
    pub book: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
    pub due_date: DateTime<Utc>
}

impl BorrowForm {
    /// One copy, due tomorrow.
    pub fn new<S: Into<String>>(book: S) -> Self {
        BorrowForm {
            book: book.into(),
            quantity: 1,
            due_date: tomorrow(Utc::now())
        }
    }

    pub fn check(&self) -> Result<(), FieldErrors> {
        self.check_at(Utc::now())
    }

    /// Validate against a fixed clock. The due date must be strictly after `now`.
    pub fn check_at(&self, now: DateTime<Utc>) -> Result<(), FieldErrors> {
        let mut errors = match check(self) {
            Ok(()) => FieldErrors::default(),
            Err(errors) => errors
        };
        if self.due_date <= now {
            errors.add("due_date", "Due date must be in the future");
        }
        errors.into_result()
    }
}
