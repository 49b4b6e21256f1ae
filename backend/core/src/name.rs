//! Command name normalization.
//!
//! User-supplied names are folded into a restricted slug before they are ever
//! used as a lookup key: 1-32 code points of letters, digits, `-`, `_` or `'`,
//! lowercased, whitespace turned into hyphens, runs of the same separator
//! collapsed, separators trimmed from both ends. The transformation is
//! idempotent, so a stored name re-normalizes to itself.

use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the reserved management command. User commands may not claim it.
pub const MANAGEMENT_COMMAND: &str = "makro";

/// Maximum slug length in code points.
pub const MAX_NAME_LEN: usize = 32;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^-_'\p{L}\p{N}]").unwrap());
static VALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-_'\p{L}\p{N}]{1,32}$").unwrap());

/// Normalize a user-supplied command name into its canonical slug.
///
/// Returns an empty string when nothing valid survives normalization.
pub fn normalize(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let hyphenated = WHITESPACE.replace_all(&lowered, "-");
    let cleaned = INVALID.replace_all(&hyphenated, "-");
    let collapsed = collapse_separators(&cleaned);
    let trimmed = collapsed.trim_matches(['-', '_']);
    let limited: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    // A truncation can re-expose a trailing separator.
    let limited = limited.trim_matches(['-', '_']).to_string();
    if limited.is_empty() || !VALID.is_match(&limited) {
        return String::new();
    }
    limited
}

/// Whether a (normalized) name collides with the management command.
pub fn is_reserved(name: &str) -> bool {
    name == MANAGEMENT_COMMAND
}

fn collapse_separators(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev: Option<char> = None;
    for ch in input.chars() {
        if (ch == '-' || ch == '_') && prev == Some(ch) {
            continue;
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(normalize("  My Cool Command "), "my-cool-command");
    }

    #[test]
    fn strips_invalid_runs() {
        assert_eq!(normalize("a!!b"), "a-b");
        assert_eq!(normalize("héllo wörld"), "héllo-wörld");
    }

    #[test]
    fn collapses_repeated_separators_only_when_identical() {
        assert_eq!(normalize("a--b"), "a-b");
        assert_eq!(normalize("a__b"), "a_b");
        assert_eq!(normalize("a-_b"), "a-_b");
    }

    #[test]
    fn trims_edge_separators() {
        assert_eq!(normalize("--name--"), "name");
        assert_eq!(normalize("__"), "");
    }

    #[test]
    fn caps_at_32_code_points() {
        let long = "x".repeat(64);
        assert_eq!(normalize(&long).chars().count(), 32);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["  My Cool Command ", "a--b__c", "--x--", "héllo wörld", &"y".repeat(40)] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn empty_and_symbol_only_names_reject() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn reserved_name_is_flagged() {
        assert!(is_reserved(&normalize("Makro")));
        assert!(!is_reserved("makro2"));
    }
}
