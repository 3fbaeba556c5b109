//! Structural + semantic validation of inbound messages (C3, spec §4.3).
//!
//! Purely structural: policy (host-only, phase constraints) lives in handlers.

const RESERVED_USERNAMES: &[&str] = &["admin", "moderator", "bot", "system", "null", "undefined"];

pub fn validate_username(raw: &str) -> Result<String, String> {
    let trimmed = collapse_whitespace(strip_html(raw).trim());

    if trimmed.chars().count() < 2 || trimmed.chars().count() > 30 {
        return Err("Username must be 2-30 characters".to_string());
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c.is_numeric() || matches!(c, ' ' | '-' | '_' | '.'))
    {
        return Err("Username contains invalid characters".to_string());
    }

    let lower = trimmed.to_lowercase();
    if RESERVED_USERNAMES.iter().any(|reserved| lower == *reserved) {
        return Err("Username is reserved".to_string());
    }

    Ok(trimmed)
}

pub fn validate_invite_code(code: &str) -> Result<(), String> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_alphanumeric() && c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Invite code must be exactly 6 uppercase alphanumerics".to_string());
    }
    Ok(())
}

pub fn sanitize_answer(raw: &str) -> Result<String, String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '\'' | '"' | '&'))
        .collect();
    let collapsed = collapse_whitespace(stripped.trim());
    let truncated: String = collapsed.chars().take(100).collect();

    if truncated.is_empty() {
        return Err("Answer cannot be empty".to_string());
    }

    Ok(truncated)
}

pub fn validate_max_room_size(size: u8) -> Result<(), String> {
    if !(2..=5).contains(&size) {
        return Err("maxRoomSize must be between 2 and 5".to_string());
    }
    Ok(())
}

pub fn validate_time_per_question(seconds: u32) -> Result<(), String> {
    if ![10, 15, 20, 30].contains(&seconds) {
        return Err("timePerQuestion must be one of 10, 15, 20, 30".to_string());
    }
    Ok(())
}

fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_username() {
        assert_eq!(validate_username("  Alice  Bee ").unwrap(), "Alice Bee");
    }

    #[test]
    fn rejects_too_short_username() {
        assert!(validate_username("a").is_err());
    }

    #[test]
    fn rejects_reserved_username() {
        assert!(validate_username("Admin").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(validate_username("bob<script>").is_err());
    }

    #[test]
    fn invite_code_must_be_six_uppercase_alphanumerics() {
        assert!(validate_invite_code("AB12CD").is_ok());
        assert!(validate_invite_code("ab12cd").is_err());
        assert!(validate_invite_code("AB12C").is_err());
    }

    #[test]
    fn sanitize_answer_strips_dangerous_characters_and_truncates() {
        let answer = sanitize_answer("  <b>Fra\"nce'&</b>  ").unwrap();
        assert_eq!(answer, "bFrance/b");
    }

    #[test]
    fn sanitize_answer_rejects_empty_after_cleanup() {
        assert!(sanitize_answer("   ").is_err());
    }

    #[test]
    fn max_room_size_bounds() {
        assert!(validate_max_room_size(1).is_err());
        assert!(validate_max_room_size(2).is_ok());
        assert!(validate_max_room_size(5).is_ok());
        assert!(validate_max_room_size(6).is_err());
    }

    #[test]
    fn time_per_question_enum() {
        assert!(validate_time_per_question(10).is_ok());
        assert!(validate_time_per_question(12).is_err());
    }
}
