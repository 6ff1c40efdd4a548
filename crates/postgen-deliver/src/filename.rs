/// Base name used when the title is blank.
pub const DEFAULT_BASE_NAME: &str = "social_post";

/// Longest base name kept, in characters.
pub const MAX_BASE_NAME_LEN: usize = 100;

/// Normalize a post title into a filesystem-safe base name: ASCII letters and
/// digits are lowercased, everything else becomes `_`.
pub fn sanitize_base_name(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return DEFAULT_BASE_NAME.to_string();
    }
    trimmed
        .chars()
        .take(MAX_BASE_NAME_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic_title() {
        assert_eq!(sanitize_base_name("Breaking News"), "breaking_news");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_base_name("Última Hora: 50% off!"), "_ltima_hora__50__off_");
        assert_eq!(sanitize_base_name("../etc/passwd"), "___etc_passwd");
    }

    #[test]
    fn test_blank_title_uses_default() {
        assert_eq!(sanitize_base_name(""), DEFAULT_BASE_NAME);
        assert_eq!(sanitize_base_name("   "), DEFAULT_BASE_NAME);
    }

    #[test]
    fn test_long_titles_are_capped() {
        let name = sanitize_base_name(&"a".repeat(500));
        assert_eq!(name.len(), MAX_BASE_NAME_LEN);
    }

    #[test]
    fn test_output_is_always_safe() {
        for title in ["Hello World", "emoji 🚀 here", "tabs\tand\nnewlines", "MiXeD 123"] {
            let name = sanitize_base_name(title);
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }
}
