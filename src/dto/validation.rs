//! Validation helpers for inbound client messages.

use validator::ValidationError;

/// Longest accepted display name, counted in characters after trimming.
pub const MAX_DISPLAY_NAME_LEN: usize = 24;
/// Longest accepted room code.
pub const MAX_ROOM_CODE_LEN: usize = 32;
/// Longest accepted guess.
pub const MAX_GUESS_LEN: usize = 100;
/// Longest accepted chat message.
pub const MAX_CHAT_LEN: usize = 500;

/// Validates that a display name is 1 to 24 visible characters without control characters.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Alice")   // Ok
/// validate_display_name("   ")     // Err - blank
/// validate_display_name("a\u{7}b") // Err - control character
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_DISPLAY_NAME_LEN {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!("Display name must be 1 to {MAX_DISPLAY_NAME_LEN} characters (got {len})")
                .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("display_name_format");
        err.message = Some("Display name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a room code is 1 to 32 ASCII letters, digits, `-` or `_`.
pub fn validate_room_code(room: &str) -> Result<(), ValidationError> {
    if room.is_empty() || room.len() > MAX_ROOM_CODE_LEN {
        let mut err = ValidationError::new("room_length");
        err.message = Some(
            format!(
                "Room code must be 1 to {MAX_ROOM_CODE_LEN} characters (got {})",
                room.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !room
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("room_format");
        err.message =
            Some("Room code must contain only letters, digits, `-` or `_`".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that free text does not exceed `max` characters.
pub fn validate_text_length(text: &str, max: usize) -> Result<(), ValidationError> {
    let len = text.chars().count();
    if len > max {
        let mut err = ValidationError::new("text_length");
        err.message = Some(format!("Text must be at most {max} characters (got {len})").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Alice").is_ok());
        assert!(validate_display_name("  Zoë  ").is_ok());
        assert!(validate_display_name(&"x".repeat(MAX_DISPLAY_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_validate_display_name_invalid() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(MAX_DISPLAY_NAME_LEN + 1)).is_err());
        assert!(validate_display_name("bad\u{7}name").is_err());
    }

    #[test]
    fn test_validate_room_code() {
        assert!(validate_room_code("room-1_A").is_ok());
        assert!(validate_room_code("").is_err());
        assert!(validate_room_code("with space").is_err());
        assert!(validate_room_code(&"r".repeat(MAX_ROOM_CODE_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_text_length() {
        assert!(validate_text_length("", MAX_GUESS_LEN).is_ok());
        assert!(validate_text_length(&"é".repeat(MAX_GUESS_LEN), MAX_GUESS_LEN).is_ok());
        assert!(validate_text_length(&"é".repeat(MAX_GUESS_LEN + 1), MAX_GUESS_LEN).is_err());
    }
}
