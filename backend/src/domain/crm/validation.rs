//! Field validation shared by deal, activity and reminder constructors.

use serde_json::json;

use crate::domain::Error;

pub(crate) const MAX_NAME_LEN: usize = 200;
pub(crate) const MAX_TEXT_LEN: usize = 5_000;
pub(crate) const MAX_TAGS: usize = 20;
pub(crate) const MAX_TAG_LEN: usize = 40;
pub(crate) const DEFAULT_CURRENCY: &str = "COP";
pub(crate) const DEFAULT_COUNTRY_CODE: &str = "+57";

/// Input rejected by a CRM constructor or transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrmValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("email must contain '@'")]
    InvalidEmail,
    #[error("value must not be negative")]
    NegativeValue,
    #[error("probability must be between 0 and 100")]
    ProbabilityOutOfRange,
    #[error("currency must be a three-letter ISO code")]
    InvalidCurrency,
    #[error("at most {max} tags are allowed")]
    TooManyTags { max: usize },
    #[error("stage_change activities are recorded automatically")]
    ReservedActivityKind,
    #[error("range start must be before its end")]
    InvertedRange,
    #[error("days must be between 1 and 3650")]
    WindowOutOfRange,
}

impl CrmValidationError {
    /// Payload field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field } | Self::TooLong { field, .. } => field,
            Self::InvalidEmail => "email",
            Self::NegativeValue => "value",
            Self::ProbabilityOutOfRange => "probability",
            Self::InvalidCurrency => "currency",
            Self::TooManyTags { .. } => "tags",
            Self::ReservedActivityKind => "kind",
            Self::InvertedRange => "from",
            Self::WindowOutOfRange => "days",
        }
    }

    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "empty",
            Self::TooLong { .. } => "too_long",
            Self::InvalidEmail => "invalid_email",
            Self::NegativeValue => "negative_value",
            Self::ProbabilityOutOfRange => "probability_out_of_range",
            Self::InvalidCurrency => "invalid_currency",
            Self::TooManyTags { .. } => "too_many_tags",
            Self::ReservedActivityKind => "reserved_activity_kind",
            Self::InvertedRange => "inverted_range",
            Self::WindowOutOfRange => "window_out_of_range",
        }
    }
}

impl From<CrmValidationError> for Error {
    fn from(value: CrmValidationError) -> Self {
        Error::invalid_request(value.to_string()).with_details(json!({
            "field": value.field(),
            "code": value.code(),
        }))
    }
}

/// Trim `raw` and require it to be non-empty and bounded.
pub(crate) fn required_text(
    raw: &str,
    field: &'static str,
    max: usize,
) -> Result<String, CrmValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CrmValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(CrmValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

/// Trim optional text; blank input collapses to `None`.
pub(crate) fn optional_text(
    raw: Option<&str>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, CrmValidationError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) if value.chars().count() > max => {
            Err(CrmValidationError::TooLong { field, max })
        }
        Some(value) => Ok(Some(value.to_owned())),
    }
}

pub(crate) fn email(raw: Option<&str>) -> Result<Option<String>, CrmValidationError> {
    let value = optional_text(raw, "email", MAX_NAME_LEN)?;
    match value {
        Some(address) if !address.contains('@') => Err(CrmValidationError::InvalidEmail),
        other => Ok(other.map(|address| address.to_lowercase())),
    }
}

pub(crate) fn currency(raw: Option<&str>) -> Result<String, CrmValidationError> {
    let Some(code) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(DEFAULT_CURRENCY.to_owned());
    };
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(CrmValidationError::InvalidCurrency)
    }
}

pub(crate) fn money(value: i64) -> Result<i64, CrmValidationError> {
    if value < 0 {
        Err(CrmValidationError::NegativeValue)
    } else {
        Ok(value)
    }
}

pub(crate) fn probability(value: i64) -> Result<u8, CrmValidationError> {
    u8::try_from(value)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or(CrmValidationError::ProbabilityOutOfRange)
}

/// Trim, de-duplicate and bound the tag list while keeping input order.
pub(crate) fn tags(raw: &[String]) -> Result<Vec<String>, CrmValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = required_text(tag, "tags", MAX_TAG_LEN)?;
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    if out.len() > MAX_TAGS {
        return Err(CrmValidationError::TooManyTags { max: MAX_TAGS });
    }
    Ok(out)
}
