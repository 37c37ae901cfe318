//! Creation-time validation of lecture parameters.
//!
//! Hash derivation accepts any well-typed parameters; these checks are what
//! a lecture must satisfy before it is submitted to the ledger.

use crate::error::{CoreError, Result};
use crate::lecture::LectureParams;

/// Validate parameters for a new lecture.
///
/// - Name and token URI must not be blank.
/// - End time must be non-zero.
/// - When a start time is present it must precede the end time.
pub fn validate_params(params: &LectureParams) -> Result<()> {
    if params.name.trim().is_empty() {
        return Err(CoreError::invalid("lecture name is required"));
    }
    if params.token_uri.trim().is_empty() {
        return Err(CoreError::invalid("token URI is required"));
    }
    if params.end_time == 0 {
        return Err(CoreError::invalid("end time is required"));
    }
    if let Some(start) = params.start_time {
        if start >= params.end_time {
            return Err(CoreError::invalid(format!(
                "start time {} is not before end time {}",
                start, params.end_time
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_params() {
        assert!(validate_params(&LectureParams::with_window("Talk", 1, 2, "ipfs://x")).is_ok());
        assert!(validate_params(&LectureParams::with_deadline("Talk", 2, "https://x")).is_ok());
    }

    #[test]
    fn test_blank_fields_rejected() {
        assert!(validate_params(&LectureParams::with_deadline("  ", 2, "ipfs://x")).is_err());
        assert!(validate_params(&LectureParams::with_deadline("Talk", 2, "")).is_err());
        assert!(validate_params(&LectureParams::with_deadline("Talk", 0, "ipfs://x")).is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = validate_params(&LectureParams::with_window("Talk", 5, 5, "ipfs://x")).unwrap_err();
        assert!(err.to_string().contains("not before"));
    }
}
