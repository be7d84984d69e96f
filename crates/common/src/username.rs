//! Username validation
//!
//! A username is 1 to 32 characters from `[a-z0-9_-]`. It starts and ends
//! with a letter or digit, and separators (`_`, `-`) never sit next to each
//! other.

use std::sync::LazyLock;

use regex::Regex;

/// Longest accepted username
pub const MAX_USERNAME_LENGTH: usize = 32;

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9]|[_-][a-z0-9])*$").expect("username pattern is valid")
});

/// Whether `name` is an acceptable username
pub fn is_valid_username(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_USERNAME_LENGTH {
        return false;
    }
    USERNAME_PATTERN.is_match(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accepts_canonical_names() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("a-b_c"));
        assert!(is_valid_username("a"));
        assert!(is_valid_username("0"));
        assert!(is_valid_username("user-2024"));
        assert!(is_valid_username(&"a".repeat(MAX_USERNAME_LENGTH)));
    }

    #[test]
    fn test_rejects_bad_edges() {
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("_alice"));
        assert!(!is_valid_username("-alice"));
        assert!(!is_valid_username("alice_"));
        assert!(!is_valid_username("alice-"));
        assert!(!is_valid_username("_"));
    }

    #[test]
    fn test_rejects_adjacent_separators() {
        assert!(!is_valid_username("a__b"));
        assert!(!is_valid_username("a--b"));
        assert!(!is_valid_username("a_-b"));
        assert!(!is_valid_username("a-_b"));
    }

    fn by_hand(name: &str) -> bool {
        let bytes = name.as_bytes();
        let sep = |b: &u8| *b == b'_' || *b == b'-';
        !bytes.is_empty()
            && bytes.len() <= MAX_USERNAME_LENGTH
            && bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || sep(b))
            && !sep(&bytes[0])
            && !sep(&bytes[bytes.len() - 1])
            && !bytes.windows(2).any(|w| sep(&w[0]) && sep(&w[1]))
    }

    #[test]
    fn test_matches_rule_for_short_names() {
        let alphabet = ['a', '0', '_', '-', 'A'];
        let mut names = vec![String::new()];
        for _ in 0..4 {
            let longer: Vec<String> = names
                .iter()
                .flat_map(|n| alphabet.iter().map(move |c| format!("{}{}", n, c)))
                .collect();
            for name in names.iter().chain(longer.iter()) {
                assert_eq!(is_valid_username(name), by_hand(name), "{:?}", name);
            }
            names = longer;
        }
    }

    #[test]
    fn test_rejects_foreign_characters_and_length() {
        assert!(!is_valid_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)));
        assert!(!is_valid_username("Alice"));
        assert!(!is_valid_username("al ice"));
        assert!(!is_valid_username("al.ice"));
        assert!(!is_valid_username("ålice"));
        assert!(!is_valid_username("alice\n"));
    }
}
