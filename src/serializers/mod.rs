//! Wire representations and field validation.
//!
//! Every input type carries optional fields so one type serves create, full
//! update (`PUT`) and partial update (`PATCH`); `WriteMode` decides which
//! missing fields are errors. Read-only fields are simply not deserialized.

pub mod booking;
pub mod listing;
pub mod review;

pub use booking::BookingInput;
pub use listing::ListingInput;
pub use review::ReviewInput;

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Replace,
    Partial,
}

impl WriteMode {
    fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Records a required-field error when a field is absent and the mode needs it.
pub(crate) fn require<T>(errors: &mut FieldErrors, mode: WriteMode, field: &str, value: &Option<T>) {
    if value.is_none() && mode.requires_all() {
        errors.add(field, REQUIRED);
    }
}

/// Validates a bounded, non-blank text field and returns the trimmed value.
pub(crate) fn check_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        );
        return None;
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_only_outside_partial_mode() {
        let mut errors = FieldErrors::new();
        require::<String>(&mut errors, WriteMode::Partial, "title", &None);
        assert!(errors.is_empty());

        require::<String>(&mut errors, WriteMode::Replace, "title", &None);
        assert_eq!(errors.get("title"), Some(&[REQUIRED.to_string()][..]));
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            check_text(&mut errors, "title", Some("  Loft  "), 10),
            Some("Loft".to_string())
        );
        assert_eq!(check_text(&mut errors, "title", Some("   "), 10), None);
        assert_eq!(check_text(&mut errors, "location", Some("abcdefghijk"), 10), None);
        assert_eq!(check_text(&mut errors, "other", None, 10), None);

        assert_eq!(errors.get("title"), Some(&[BLANK.to_string()][..]));
        assert!(errors.contains("location"));
        assert!(!errors.contains("other"));
    }
}
