//! Helper functions for settings operations.

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Format a boolean value for display.
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Round to six decimals so `f32` settings display as typed (0.8, not
/// 0.800000011920929).
pub fn round_display(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Truncate a string to `max_chars` characters, appending "..." if truncated.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return "(not set)".to_string();
    }
    if count <= 8 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool(" no "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn round_display_hides_float_noise() {
        assert_eq!(round_display(f64::from(0.8f32)).to_string(), "0.8");
        assert_eq!(round_display(15.0).to_string(), "15");
    }

    #[test]
    fn secrets_keep_only_a_short_tail() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("sk-1234567890abcd"), "********abcd");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_with_ellipsis("请你扮演一个角色", 4), "请你扮演...");
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
    }
}
