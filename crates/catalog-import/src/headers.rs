//! Header and token folding.
//!
//! Spreadsheet headers arrive in many spellings (`Descripción`,
//! `DESCRIPCION`, `descripcion_detallada`, `Descripción Detallada`). All of
//! them are reduced to one canonical key before any lookup.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercases `s` and strips diacritics (`"Sí"` → `"si"`).
#[must_use]
pub fn fold(s: &str) -> String {
    s.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonical column key: folded, with runs of whitespace, hyphens, and
/// underscores collapsed to a single `_`.
#[must_use]
pub fn canonical_header(raw: &str) -> String {
    let folded = fold(raw.trim_start_matches('\u{feff}'));
    let mut out = String::with_capacity(folded.len());
    let mut pending_sep = false;

    for c in folded.chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_sep = !out.is_empty();
        } else {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(c);
        }
    }

    out
}
