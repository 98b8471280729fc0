/// Username: 2-50 chars, letters, digits, `_`, `-` and `.`.
pub fn validate_username(username: &str) -> Option<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Some("Username is required".to_string());
    }
    let len = trimmed.chars().count();
    if len < 2 {
        return Some("Username must be at least 2 characters".to_string());
    }
    if len > 50 {
        return Some("Username must be at most 50 characters".to_string());
    }
    if !trimmed.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Some("Username may only contain letters, numbers, '_', '-' and '.'".to_string());
    }
    None
}

pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    if password.chars().count() < 8 {
        return Some("Password must be at least 8 characters".to_string());
    }
    None
}

/// A required text field with a maximum length in characters.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// A size limit on a text blob, in bytes.
pub fn validate_max_bytes(value: &str, field_name: &str, max_bytes: usize) -> Option<String> {
    (value.len() > max_bytes).then(|| format!("{field_name} must be at most {max_bytes} bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("ann.smith").is_none());
        assert!(validate_username(" ").is_some());
        assert!(validate_username("a").is_some());
        assert!(validate_username("bad name").is_some());
        assert!(validate_username(&"x".repeat(51)).is_some());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("").is_some());
        assert!(validate_password("short").is_some());
        assert!(validate_password("long enough").is_none());
    }

    #[test]
    fn required_and_size() {
        assert_eq!(validate_required("  ", "Name", 10).as_deref(), Some("Name is required"));
        assert!(validate_required("ok", "Name", 10).is_none());
        assert!(validate_max_bytes("abcd", "HTML", 3).is_some());
        assert!(validate_max_bytes("abc", "HTML", 3).is_none());
    }
}
