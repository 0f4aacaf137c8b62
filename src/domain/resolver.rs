//! Route key disambiguation: primary key or slug, never both.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("static uuid pattern")
});

/// How an entity route parameter is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    Id(Uuid),
    Slug(String),
}

impl EntityKey {
    /// A hyphenated UUID selects the primary-key lookup; any other string is a slug.
    pub fn parse(raw: &str) -> Self {
        if UUID_PATTERN.is_match(raw)
            && let Ok(id) = Uuid::parse_str(raw)
        {
            return EntityKey::Id(id);
        }
        EntityKey::Slug(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_uuid_selects_id_lookup() {
        let id = Uuid::new_v4();
        assert_eq!(EntityKey::parse(&id.to_string()), EntityKey::Id(id));
    }

    #[test]
    fn uppercase_uuid_is_still_an_id() {
        let id = Uuid::new_v4();
        let upper = id.to_string().to_uppercase();
        assert_eq!(EntityKey::parse(&upper), EntityKey::Id(id));
    }

    #[test]
    fn anything_else_is_a_slug() {
        let id = Uuid::new_v4();
        for raw in [
            "le-plateau-montreal".to_string(),
            id.simple().to_string(),
            format!("{id}-extra"),
            format!("{{{id}}}"),
            String::new(),
        ] {
            assert_eq!(EntityKey::parse(&raw), EntityKey::Slug(raw.clone()));
        }
    }
}
