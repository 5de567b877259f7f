//! Client-side checks run before a form is submitted.

use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("{0} is required")]
  Empty(&'static str),
  #[error("Passwords do not match")]
  PasswordMismatch,
  #[error("Password must be at least 8 characters and contain a letter and a digit")]
  WeakPassword,
  #[error("{field} must be a number between {min} and {max}")]
  BadNumber {
    field: &'static str,
    min: u64,
    max: u64,
  },
  #[error("{0} must be y or n")]
  BadChoice(&'static str),
}

pub fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(ValidationError::Empty(field));
  }
  Ok(trimmed)
}

/// A new password and its confirmation.
///
/// Mismatch is reported before strength so the user fixes the typo first.
pub fn new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
  if password.is_empty() {
    return Err(ValidationError::Empty("Password"));
  }
  if password != confirm {
    return Err(ValidationError::PasswordMismatch);
  }
  let has_letter = password.chars().any(char::is_alphabetic);
  let has_digit = password.chars().any(|c| c.is_ascii_digit());
  if password.chars().count() < MIN_PASSWORD_LEN || !has_letter || !has_digit {
    return Err(ValidationError::WeakPassword);
  }
  Ok(())
}

/// Parse a whole number within `min..=max`.
pub fn number(field: &'static str, value: &str, min: u64, max: u64) -> Result<u64, ValidationError> {
  let value = required(field, value)?;
  match value.parse::<u64>() {
    Ok(n) if (min..=max).contains(&n) => Ok(n),
    _ => Err(ValidationError::BadNumber { field, min, max }),
  }
}

/// Like [`number`], but a blank value is `None`.
pub fn optional_number(
  field: &'static str,
  value: &str,
  min: u64,
  max: u64,
) -> Result<Option<u64>, ValidationError> {
  if value.trim().is_empty() {
    return Ok(None);
  }
  number(field, value, min, max).map(Some)
}

/// A yes/no answer: y, yes, n or no in any case.
pub fn yes_no(field: &'static str, value: &str) -> Result<bool, ValidationError> {
  match required(field, value)?.to_lowercase().as_str() {
    "y" | "yes" => Ok(true),
    "n" | "no" => Ok(false),
    _ => Err(ValidationError::BadChoice(field)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_required_trims() {
    assert_eq!(required("Username", "  bob "), Ok("bob"));
    assert_eq!(
      required("Username", "   "),
      Err(ValidationError::Empty("Username"))
    );
  }

  #[test]
  fn test_password_checks() {
    assert_eq!(new_password("", ""), Err(ValidationError::Empty("Password")));
    assert_eq!(
      new_password("hunter22", "hunter23"),
      Err(ValidationError::PasswordMismatch)
    );
    assert_eq!(new_password("short1", "short1"), Err(ValidationError::WeakPassword));
    assert_eq!(
      new_password("lettersonly", "lettersonly"),
      Err(ValidationError::WeakPassword)
    );
    assert_eq!(new_password("12345678", "12345678"), Err(ValidationError::WeakPassword));
    assert_eq!(new_password("hunter2hunter", "hunter2hunter"), Ok(()));
  }

  #[test]
  fn test_number_range() {
    assert_eq!(number("Duration", "24", 1, 8760), Ok(24));
    assert!(matches!(
      number("Duration", "0", 1, 8760),
      Err(ValidationError::BadNumber { .. })
    ));
    assert!(matches!(
      number("Duration", "abc", 1, 8760),
      Err(ValidationError::BadNumber { .. })
    ));
    assert_eq!(
      number("Duration", "", 1, 8760),
      Err(ValidationError::Empty("Duration"))
    );
  }

  #[test]
  fn test_optional_number() {
    assert_eq!(optional_number("User ID", " ", 1, u64::MAX), Ok(None));
    assert_eq!(optional_number("User ID", "42", 1, u64::MAX), Ok(Some(42)));
    assert!(optional_number("User ID", "x", 1, u64::MAX).is_err());
  }

  #[test]
  fn test_yes_no() {
    assert_eq!(yes_no("Expired", "Y"), Ok(true));
    assert_eq!(yes_no("Expired", " no "), Ok(false));
    assert_eq!(yes_no("Expired", "maybe"), Err(ValidationError::BadChoice("Expired")));
  }

  #[test]
  fn test_messages() {
    assert_eq!(ValidationError::Empty("Key").to_string(), "Key is required");
    assert_eq!(
      ValidationError::BadNumber {
        field: "Limit",
        min: 0,
        max: 100
      }
      .to_string(),
      "Limit must be a number between 0 and 100"
    );
  }
}
