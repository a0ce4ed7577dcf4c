// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error normalization.
//!
//! Whatever a caller reports as an error is classified into one of three
//! shapes before it is attached to a record. The input is only borrowed, so
//! an error the caller is about to propagate keeps its identity.

use std::borrow::Cow;
use std::error::Error as StdError;

use serde::Serialize;

use crate::sanitize::{SanitizedValue, Sanitizer, Value};

/// Cap on how many `source()` links are followed.
const MAX_CAUSES: usize = 16;

/// Something handed to `report_error`.
pub enum ErrorInput<'a> {
    /// A real error value.
    Native {
        error: &'a (dyn StdError + 'static),
        type_name: Option<&'static str>,
    },
    /// An error-shaped data object, typically `{ message, code }` from a
    /// backend client library.
    Data(Value),
    /// A bare message.
    Text(Cow<'a, str>),
}

impl<'a> ErrorInput<'a> {
    /// Borrow a concrete error, keeping its type name.
    pub fn from_error<E: StdError + 'static>(error: &'a E) -> Self {
        Self::Native {
            error,
            type_name: Some(std::any::type_name::<E>()),
        }
    }
}

impl<'a> From<&'a (dyn StdError + 'static)> for ErrorInput<'a> {
    fn from(error: &'a (dyn StdError + 'static)) -> Self {
        Self::Native {
            error,
            type_name: None,
        }
    }
}

impl<'a> From<&'a (dyn StdError + Send + Sync + 'static)> for ErrorInput<'a> {
    fn from(error: &'a (dyn StdError + Send + Sync + 'static)) -> Self {
        Self::Native {
            error,
            type_name: None,
        }
    }
}

impl<'a> From<&'a anyhow::Error> for ErrorInput<'a> {
    fn from(error: &'a anyhow::Error) -> Self {
        let error: &(dyn StdError + Send + Sync + 'static) = error.as_ref();
        Self::Native {
            error,
            type_name: None,
        }
    }
}

impl<'a> From<&'a str> for ErrorInput<'a> {
    fn from(message: &'a str) -> Self {
        Self::Text(Cow::Borrowed(message))
    }
}

impl From<String> for ErrorInput<'_> {
    fn from(message: String) -> Self {
        Self::Text(Cow::Owned(message))
    }
}

impl From<Value> for ErrorInput<'_> {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

/// Normalized error attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReportedError {
    Native {
        #[serde(skip_serializing_if = "Option::is_none")]
        type_name: Option<String>,
        message: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        causes: Vec<String>,
    },
    /// A data object carrying a message, wrapped with the original attached.
    PlainMessage {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<SanitizedValue>,
        original: SanitizedValue,
    },
    Text {
        message: String,
    },
}

impl ReportedError {
    pub fn message(&self) -> &str {
        match self {
            Self::Native { message, .. }
            | Self::PlainMessage { message, .. }
            | Self::Text { message } => message,
        }
    }

    /// Error code preserved from a data object, if any.
    pub fn code(&self) -> Option<&SanitizedValue> {
        match self {
            Self::PlainMessage { code, .. } => code.as_ref(),
            _ => None,
        }
    }
}

/// Classify a reported error. Data objects are sanitized before they are
/// inspected, so secrets never reach the record.
pub fn classify(input: ErrorInput<'_>, sanitizer: &Sanitizer) -> ReportedError {
    match input {
        ErrorInput::Native { error, type_name } => {
            let mut causes = Vec::new();
            let mut source = error.source();
            while let Some(cause) = source {
                if causes.len() >= MAX_CAUSES {
                    break;
                }
                causes.push(cause.to_string());
                source = cause.source();
            }
            ReportedError::Native {
                type_name: type_name.map(str::to_string),
                message: error.to_string(),
                causes,
            }
        }
        ErrorInput::Data(value) => {
            let original = sanitizer.sanitize(&value);
            match original.get("message").and_then(SanitizedValue::as_str) {
                Some(message) => ReportedError::PlainMessage {
                    message: message.to_string(),
                    code: original
                        .get("code")
                        .filter(|code| **code != SanitizedValue::Null)
                        .cloned(),
                    original,
                },
                None => ReportedError::Text {
                    message: match &original {
                        SanitizedValue::String(s) => s.clone(),
                        other => serde_json::to_string(other)
                            .unwrap_or_else(|_| "Unknown error".to_string()),
                    },
                },
            }
        }
        ErrorInput::Text(message) => ReportedError::Text {
            message: message.into_owned(),
        },
    }
}
