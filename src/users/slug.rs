use rand::Rng;

/// Characters that survive into a url key unchanged. Everything else is
/// replaced with `-`, so the key length always equals the display name length.
fn is_url_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '*')
}

/// Derive the url key for a display name. Pure and deterministic.
pub fn url_key(user_name: &str) -> String {
    user_name
        .chars()
        .map(|c| if is_url_safe(c) { c } else { '-' })
        .collect()
}

const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect()
}

/// Source of collision suffixes for url key conflicts. The store takes this
/// as a trait object so tests can substitute a deterministic sequence.
pub trait SuffixSource: Send + Sync {
    /// Three characters out of `[a-zA-Z0-9]`.
    fn suffix(&self) -> String;
}

pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn suffix(&self) -> String {
        random_string(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_key_passes_safe_characters_through() {
        assert_eq!(url_key("Alice-Smith_1.0*"), "Alice-Smith_1.0*");
    }

    #[test]
    fn url_key_replaces_everything_else_with_dash() {
        assert_eq!(url_key("Alice Smith"), "Alice-Smith");
        assert_eq!(url_key("user name"), "user-name");
        assert_eq!(url_key("a/b?c#d"), "a-b-c-d");
    }

    #[test]
    fn url_key_is_deterministic() {
        let name = "Some User (2024)!";
        assert_eq!(url_key(name), url_key(name));
    }

    #[test]
    fn url_key_preserves_length_in_chars() {
        for name in ["héllo wörld", "暱稱", "plain", ""] {
            assert_eq!(url_key(name).chars().count(), name.chars().count());
        }
    }

    #[test]
    fn url_key_output_is_always_url_safe() {
        let out = url_key("spaces & sláshes / 名前");
        assert!(out.chars().all(is_url_safe));
    }

    #[test]
    fn random_suffix_is_three_alphanumerics() {
        for _ in 0..50 {
            let s = RandomSuffix.suffix();
            assert_eq!(s.len(), 3);
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
