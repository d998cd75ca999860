//! Singular/plural normalization for table name matching.
//!
//! Uses the `inflector` crate with a short list of irregular plurals that
//! show up in application schemas.

use inflector::Inflector;

static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("medium", "media"),
    ("datum", "data"),
    ("criterion", "criteria"),
];

/// Pluralize a word, handling irregulars first then falling back to inflector.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return plural.to_string();
        }
    }
    lower.to_plural()
}

/// Singularize a word, handling irregulars first then falling back to inflector.
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return singular.to_string();
        }
    }
    lower.to_singular()
}

/// Do two names refer to the same thing, ignoring number?
pub fn same_noun(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || singularize(a) == singularize(b)
}
