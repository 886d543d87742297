//! Text normalization shared by the resolver, matcher and synthesizer.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Prepositions and articles that carry no query meaning.
pub const CONNECTOR_WORDS: &[&str] = &[
    "en", "de", "del", "la", "el", "para", "con", "sobre", "in", "of", "the", "for", "on", "from",
];

/// Decompose, drop diacritics, lower-case, drop punctuation, trim.
///
/// Whitespace runs are kept as-is apart from trimming; use [`canonical`] when
/// words need to be compared.
pub fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// [`normalize`], then drop connector words and collapse whitespace.
pub fn canonical(text: &str) -> String {
    normalize(text)
        .split_whitespace()
        .filter(|word| !is_connector(word))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_connector(word: &str) -> bool {
    CONNECTOR_WORDS.contains(&word)
}

/// Keep only alphanumeric characters of a token.
pub fn strip_non_alphanumeric(token: &str) -> String {
    token.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Collapse whitespace runs into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when any of `needles` is a substring of `haystack`.
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// True when any of `words` equals one of the whitespace-separated words of `text`.
pub fn has_word(text: &str, words: &[&str]) -> bool {
    text.split_whitespace().any(|w| words.contains(&w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics_and_case() {
        assert_eq!(normalize("Sesión ACTIVA"), "sesion activa");
        assert_eq!(normalize("  Año  "), "ano");
    }

    #[test]
    fn test_normalize_drops_punctuation() {
        assert_eq!(normalize("¿estado de la base?"), "estado de la base");
        assert_eq!(normalize("¡BRM!"), "brm");
    }

    #[test]
    fn test_canonical_removes_connectors() {
        assert_eq!(canonical("Estado de la base"), "estado base");
        assert_eq!(canonical("estado   base"), "estado base");
        assert_eq!(canonical("uso del tablespace en BRM"), "uso tablespace brm");
    }

    #[test]
    fn test_strip_non_alphanumeric() {
        assert_eq!(strip_non_alphanumeric("BRM,"), "BRM");
        assert_eq!(strip_non_alphanumeric("(sap)"), "sap");
        assert_eq!(strip_non_alphanumeric("sesión"), "sesión");
    }

    #[test]
    fn test_has_word_is_word_level() {
        assert!(has_word("hi there", &["hi"]));
        assert!(!has_word("archivos", &["hi"]));
    }
}
