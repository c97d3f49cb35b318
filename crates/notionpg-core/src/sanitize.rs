//! Property label → column identifier mapping.

use unicode_normalization::UnicodeNormalization;

/// Convert an arbitrary property label to a safe column name.
///
/// NFKD-decompose so accented letters contribute their base letter, drop
/// everything non-ASCII, lowercase, trim, turn internal spaces into
/// underscores, then strip anything outside `[a-z0-9_]`. Total over all
/// printable input and idempotent.
pub fn sanitize_name(label: &str) -> String {
    let ascii: String = label.nfkd().filter(char::is_ascii).collect();
    ascii
        .to_lowercase()
        .trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_become_underscores() {
        assert_eq!(sanitize_name("Due Date"), "due_date");
        assert_eq!(sanitize_name("  padded  "), "padded");
    }

    #[test]
    fn test_accents_decompose_to_base_letters() {
        assert_eq!(sanitize_name("Priorité"), "priorite");
        assert_eq!(sanitize_name("Straße"), "strae");
        assert_eq!(sanitize_name("Café #2"), "cafe_2");
    }

    #[test]
    fn test_symbols_and_non_ascii_stripped() {
        assert_eq!(sanitize_name("Cost ($)"), "cost_");
        assert_eq!(sanitize_name("日本語"), "");
        assert_eq!(sanitize_name("a/b\\c"), "abc");
    }

    #[test]
    fn test_idempotent() {
        for label in ["Due Date", "Priorité!", "x  y", "ALL_CAPS_9", "日本 mix"] {
            let once = sanitize_name(label);
            assert_eq!(sanitize_name(&once), once, "not idempotent for {label:?}");
        }
    }

    #[test]
    fn test_output_alphabet() {
        for label in ["Weird \t label\n", "émoji 🎉 time", "100%"] {
            let out = sanitize_name(label);
            assert!(
                out.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "bad output {out:?} for {label:?}"
            );
        }
    }
}
