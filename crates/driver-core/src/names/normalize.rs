//! Name normalization for fuzzy identifier matching.
//!
//! Rules:
//! - remove a UTF-8 BOM if present
//! - lower-case
//! - collapse every run of whitespace, `_`, `-` and other ASCII punctuation
//!   into a single `_`
//! - drop leading and trailing separators
//!
//! "Created on", "created-on" and " CREATED__ON " all normalize to
//! `created_on`.

const SEPARATOR: char = '_';

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_punctuation()
}

/// Normalize a label or machine name for comparison.
pub fn normalize_name(input: &str) -> String {
    let s = input.trim_start_matches('\u{FEFF}');

    let mut out = String::with_capacity(s.len());
    let mut pending_separator = false;
    for c in s.chars() {
        if is_separator(c) {
            pending_separator = !out.is_empty();
            continue;
        }
        if pending_separator {
            out.push(SEPARATOR);
            pending_separator = false;
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_separators() {
        assert_eq!(normalize_name("Created on"), "created_on");
        assert_eq!(normalize_name("created-on"), "created_on");
        assert_eq!(normalize_name(" CREATED__ON "), "created_on");
        assert_eq!(normalize_name("Author's name"), "author_s_name");
    }

    #[test]
    fn remove_bom() {
        assert_eq!(normalize_name("\u{FEFF}Title"), "title");
    }

    #[test]
    fn separators_only_normalize_to_empty() {
        assert_eq!(normalize_name(" - _ "), "");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn non_ascii_letters_survive() {
        assert_eq!(normalize_name("Catégorie Principale"), "catégorie_principale");
    }
}
