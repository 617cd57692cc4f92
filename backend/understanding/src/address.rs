//! Address extraction: find a what3words token in free text.
//!
//! Only recognizers use this; the scan workflow treats addresses as opaque
//! strings.

use once_cell::sync::Lazy;
use regex::Regex;

/// `///word.word.word`, the form printed on labels.
static PREFIXED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"///\s*(\p{L}+)\.(\p{L}+)\.(\p{L}+)").unwrap()
});

/// Bare `word.word.word` bounded by non-word characters.
static BARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\p{L}\p{N}./@])(\p{L}+)\.(\p{L}+)\.(\p{L}+)(?:$|[^\p{L}\p{N}.])").unwrap()
});

/// Return the first address in `text`, lowercased and without the `///` prefix.
///
/// A prefixed token wins over a bare one, so `see example.co.uk, ///index.home.raft`
/// yields `index.home.raft`.
pub fn extract_address(text: &str) -> Option<String> {
    let caps = PREFIXED_RE
        .captures(text)
        .or_else(|| BARE_RE.captures(text))?;
    Some(format!(
        "{}.{}.{}",
        caps[1].to_lowercase(),
        caps[2].to_lowercase(),
        caps[3].to_lowercase()
    ))
}

/// Whether `s` is exactly one address token (with or without prefix).
pub fn is_address(s: &str) -> bool {
    let s = s.trim().trim_start_matches('/');
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(char::is_alphabetic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_prefixed_address() {
        let text = "Deliver to ///Daring.Lion.Race (back door)";
        assert_eq!(extract_address(text).as_deref(), Some("daring.lion.race"));
    }

    #[test]
    fn prefers_prefixed_over_bare() {
        let text = "see example.co.uk or ///index.home.raft";
        assert_eq!(extract_address(text).as_deref(), Some("index.home.raft"));
    }

    #[test]
    fn extracts_bare_address() {
        assert_eq!(
            extract_address("address: filled.count.soap").as_deref(),
            Some("filled.count.soap")
        );
    }

    #[test]
    fn ignores_four_part_tokens_and_numbers() {
        assert_eq!(extract_address("version 1.2.3"), None);
        assert_eq!(extract_address("a.b.c.d"), None);
    }

    #[test]
    fn validates_single_token() {
        assert!(is_address("///laptop.green.view"));
        assert!(is_address("family.open.today"));
        assert!(!is_address("family.open"));
        assert!(!is_address("family..today"));
    }
}
