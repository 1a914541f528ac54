//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest team identifier accepted on the REST surface.
const MAX_TEAM_ID_CHARS: usize = 64;

/// Validates that a text field holds something other than whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_not_blank("Capital of Italy?") // Ok
/// validate_not_blank("   ")               // Err
/// ```
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a team identifier taken from a path segment.
pub fn validate_team_id(id: &str) -> Result<(), ValidationError> {
    validate_not_blank(id)?;

    let count = id.chars().count();
    if count > MAX_TEAM_ID_CHARS {
        let mut err = ValidationError::new("team_id_length");
        err.message = Some(
            format!("Team ID must be at most {MAX_TEAM_ID_CHARS} characters (got {count})").into(),
        );
        return Err(err);
    }
    Ok(())
}
