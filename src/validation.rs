//! Argument validation for values passed to `lpass` on its command line.
//!
//! Arguments are passed without a shell, so shell metacharacters are
//! harmless. What does matter is that `lpass` parses a leading `-` as an
//! option and that NUL bytes cannot be carried in an argument.

use crate::{LastPassError, Result};

/// Validates a value that becomes a positional `lpass` argument.
///
/// `what` names the value in the error message ("username", "entry name").
///
/// # Errors
///
/// Returns [`LastPassError::InvalidArgument`] if the value:
/// - is empty
/// - contains a null byte
/// - contains control characters
/// - starts with `-`
///
/// # Example
///
/// ```
/// use lastpass::validation::validate_argument;
///
/// assert!(validate_argument("entry name", "Personal\\Bank/Checking").is_ok());
/// assert!(validate_argument("entry name", "user@example.com").is_ok());
///
/// assert!(validate_argument("entry name", "").is_err());
/// assert!(validate_argument("entry name", "--color=always").is_err());
/// ```
pub fn validate_argument(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LastPassError::InvalidArgument(format!(
            "{} cannot be empty",
            what
        )));
    }

    if value.contains('\0') {
        return Err(LastPassError::InvalidArgument(format!(
            "{} contains null byte",
            what
        )));
    }

    if value.chars().any(|c| c.is_control()) {
        return Err(LastPassError::InvalidArgument(format!(
            "{} contains control characters",
            what
        )));
    }

    if value.starts_with('-') {
        return Err(LastPassError::InvalidArgument(format!(
            "{} cannot start with '-'",
            what
        )));
    }

    Ok(())
}
