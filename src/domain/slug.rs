//! URL slugs for newly created entities.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("static slug pattern"));

/// Lowercases the joined parts and collapses every run of characters outside
/// `[a-z0-9]` into a single hyphen.
pub fn slugify(parts: &[&str]) -> String {
    let joined = parts.join(" ").to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&joined, "-")
        .trim_matches('-')
        .to_string()
}

/// Slug used when the plain slug is taken (or empty).
pub fn disambiguate(slug: &str, id: Uuid) -> String {
    let simple = id.simple().to_string();
    let suffix = &simple[..8];
    if slug.is_empty() {
        suffix.to_string()
    } else {
        format!("{slug}-{suffix}")
    }
}
