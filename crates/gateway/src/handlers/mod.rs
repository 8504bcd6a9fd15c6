//! API handlers module

pub mod analysis;
pub mod documents;
pub mod health;
pub mod search;

use cocounsel_common::errors::{AppError, Result};
use validator::Validate;

/// Run `validator` rules, reporting the first failing field
pub(crate) fn validate<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        field: e.field_errors().keys().next().map(|k| k.to_string()),
        message: e.to_string(),
    })
}
