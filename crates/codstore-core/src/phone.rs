//! Customer phone normalization.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number is empty")]
    Empty,
    #[error("phone number must be + followed by 8 to 15 digits")]
    InvalidFormat,
}

/// Normalize a submitted phone number to `+<8–15 digits>`.
///
/// Strips everything except digits and a leading `+`, converts an
/// international `00` prefix to `+`, then validates the digit count.
///
/// # Errors
///
/// Returns [`PhoneError`] if the input is empty or the normalized form does
/// not match `+<8–15 digits>`.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }

    let mut cleaned = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            cleaned.push(c);
        }
    }

    let digits = match cleaned.strip_prefix('+') {
        Some(rest) => rest.to_string(),
        None => match cleaned.strip_prefix("00") {
            Some(rest) => rest.to_string(),
            None => cleaned,
        },
    };

    if digits.len() < 8 || digits.len() > 15 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PhoneError::InvalidFormat);
    }

    Ok(format!("+{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_zero_prefix_becomes_plus() {
        assert_eq!(
            normalize_phone("00237676778377").as_deref(),
            Ok("+237676778377")
        );
    }

    #[test]
    fn existing_plus_is_kept() {
        assert_eq!(
            normalize_phone("+237 676 77 83 77").as_deref(),
            Ok("+237676778377")
        );
    }

    #[test]
    fn separators_are_stripped() {
        assert_eq!(
            normalize_phone("237-676-77-83-77").as_deref(),
            Ok("+237676778377")
        );
    }

    #[test]
    fn too_short_is_rejected() {
        assert_eq!(normalize_phone("+1234567"), Err(PhoneError::InvalidFormat));
    }

    #[test]
    fn too_long_is_rejected() {
        assert_eq!(
            normalize_phone("+1234567890123456"),
            Err(PhoneError::InvalidFormat)
        );
    }

    #[test]
    fn empty_is_rejected() {
        assert_eq!(normalize_phone("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn letters_only_is_rejected() {
        assert_eq!(normalize_phone("call me"), Err(PhoneError::InvalidFormat));
    }

    #[test]
    fn interior_plus_is_dropped() {
        assert_eq!(
            normalize_phone("237+676778377").as_deref(),
            Ok("+237676778377")
        );
    }
}
