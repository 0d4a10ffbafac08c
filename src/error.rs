//! Error types for certificate generation.

use std::fmt;

use thiserror::Error;

/// Result type alias for certificate operations.
pub type Result<T> = std::result::Result<T, CertError>;

/// Errors surfaced to the caller of a [`Session`](crate::session::Session).
///
/// Missing templates and roster sources are not errors: they degrade to the
/// fallback layout and fail-open validation respectively.
#[derive(Error, Debug)]
pub enum CertError {
    /// The layout configuration is incomplete or malformed.
    #[error("Invalid layout configuration: {0}")]
    Config(String),

    /// One or more form fields were rejected.
    #[error("Form rejected: {}", display_fields(.0))]
    Form(Vec<FieldError>),

    /// Download or print was requested before any certificate was rendered.
    #[error("Please generate a certificate first.")]
    NotRendered,

    /// PNG or PDF encoding failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Filesystem error while writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which form input a [`FieldError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    ParticipantName,
    EventName,
    EventDate,
}

impl FormField {
    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            FormField::ParticipantName => "Participant Name",
            FormField::EventName => "Event Name",
            FormField::EventDate => "Date",
        }
    }
}

/// A message attached to a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

impl FieldError {
    pub fn required(field: FormField) -> Self {
        Self {
            field,
            message: format!("{} is required", field.label()),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn display_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
