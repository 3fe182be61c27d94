//! Common validation utilities.
//!
//! Validation in this system is aggregating: callers collect every violation
//! before reporting, so these helpers return messages instead of failing fast.

use chrono::NaiveDate;
use validator::{ValidationError, ValidationErrors};

/// Separator used when several violations are reported as one message.
pub const MESSAGE_SEPARATOR: &str = "; ";

/// Validates that a string contains at least one non-whitespace character.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that `due` falls strictly after `start`.
pub fn validate_date_order(start: NaiveDate, due: NaiveDate) -> Result<(), ValidationError> {
    if due > start {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_order");
        err.message = Some("Due date must be after the start date".into());
        Err(err)
    }
}

/// Flattens `validator` errors into human readable messages.
///
/// Messages are ordered by field name so the aggregated output is stable.
pub fn collect_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect()
}

/// Joins violation messages into the single message reported to callers.
pub fn join_messages(messages: &[String]) -> String {
    messages.join(MESSAGE_SEPARATOR)
}
