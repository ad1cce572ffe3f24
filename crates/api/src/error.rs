// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;

use juniper::{FieldError, IntoFieldError, Object, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    identity::IdentityError, model::EntityKind, store::StoreError, uploads::UploadError,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single violated registration constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Every violated field of a registration payload, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.violations {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.message)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} {id} does not exist")]
    NotFound { kind: EntityKind, id: Uuid },
    #[error("Invalid registration: {0}")]
    Validation(ValidationErrors),
    #[error("{}", .0.user_message())]
    Identity(#[from] IdentityError),
    #[error("Storage failure: {0}")]
    TransientStore(String),
}

impl Error {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Error::NotFound { kind, id }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_FAILED",
            Error::Identity(e) => e.code(),
            Error::TransientStore(_) => "STORE_UNAVAILABLE",
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        if let StoreError::MissingTeam(id) = e {
            return Error::not_found(EntityKind::Team, id);
        }
        tracing::error!("Profile store failure: {e}");
        Error::TransientStore(e.to_string())
    }
}

impl From<UploadError> for Error {
    fn from(e: UploadError) -> Self {
        Error::TransientStore(e.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(e: ValidationErrors) -> Self {
        Error::Validation(e)
    }
}

impl IntoFieldError for Error {
    fn into_field_error(self) -> FieldError {
        let mut extensions = Object::with_capacity(2);
        extensions.add_field("code", Value::scalar(self.code().to_string()));
        if let Error::Validation(errors) = &self {
            let fields = errors
                .violations()
                .iter()
                .map(|v| {
                    let mut entry = Object::with_capacity(2);
                    entry.add_field("field", Value::scalar(v.field.to_string()));
                    entry.add_field("message", Value::scalar(v.message.clone()));
                    Value::Object(entry)
                })
                .collect();
            extensions.add_field("fields", Value::List(fields));
        }
        FieldError::new(self.to_string(), Value::Object(extensions))
    }
}
