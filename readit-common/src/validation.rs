//! Request-body validation shared by every creation endpoint.
//!
//! Each request body is first deserialized into a [`Draft`] whose fields are
//! all optional, so that a missing field produces the same client error
//! everywhere instead of a deserializer message.

use crate::model::ModelValidationError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Unvalidated creation request with a fixed set of required fields.
pub trait Draft: Sized {
    type Output;

    /// Field names as the client spells them, in the order they are reported.
    const REQUIRED_FIELDS: &'static [&'static str];

    fn validate(self) -> Result<Self::Output, DraftError>;

    #[must_use]
    fn missing() -> DraftError {
        MissingFieldsError::new(Self::REQUIRED_FIELDS).into()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum DraftError {
    #[error(transparent)]
    Missing(#[from] MissingFieldsError),
    #[error(transparent)]
    Invalid(#[from] ModelValidationError),
}

impl From<crate::model::subreddit::InvalidSubredditNameError> for DraftError {
    fn from(value: crate::model::subreddit::InvalidSubredditNameError) -> Self {
        Self::Invalid(value.into())
    }
}

/// At least one required field was absent or blank.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub struct MissingFieldsError {
    required: &'static [&'static str],
}

impl MissingFieldsError {
    #[must_use]
    pub const fn new(required: &'static [&'static str]) -> Self {
        Self { required }
    }

    #[must_use]
    pub fn required(&self) -> &'static [&'static str] {
        self.required
    }
}

impl Display for MissingFieldsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.required {
            [] => write!(f, "required fields are missing"),
            [single] => write!(f, "{single} is required"),
            [init @ .., last] => write!(f, "{} and {last} are required", init.join(", ")),
        }
    }
}

/// Trims a required text field, treating blank input as absent.
#[must_use]
pub fn required_text(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();

    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_owned())
    }
}

/// Same normalization as [`required_text`] for fields that may be omitted.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    required_text(value)
}
