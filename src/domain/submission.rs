//! Validation of review submissions before anything is persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use super::kind::NaturalKey;
use super::{DomainError, EntityKind, RatingSet};

const MAX_FIELD_LENGTH: usize = 200;
const MAX_DISPLAY_NAME_LENGTH: usize = 100;
const KEY_SEPARATOR: &str = "\u{1f}";

/// Comparison form of an identifying field: trimmed, inner whitespace
/// collapsed, lowercased.
pub fn match_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Review as submitted by a user.
///
/// The entity is named by its identifying fields; which ones are required
/// depends on the entity kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReviewDraft {
    /// Entity name (required except for buildings, where it defaults to the address)
    #[schema(example = "Le Plateau")]
    pub name: Option<String>,
    /// Street address (buildings only)
    pub address: Option<String>,
    #[schema(example = "Montreal")]
    pub city: Option<String>,
    #[schema(example = "QC")]
    pub province: Option<String>,
    /// Category → score (1..=5); must cover exactly the kind's categories
    #[serde(default)]
    pub ratings: BTreeMap<String, i64>,
    #[serde(default)]
    pub comment: Option<String>,
    /// URLs of already uploaded images
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Size limits applied to free-form submission fields.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionLimits {
    pub max_comment_length: usize,
    pub max_images: usize,
}

/// Identifying fields of the reviewed entity, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIdentity {
    pub kind: EntityKind,
    pub name: String,
    pub address: Option<String>,
    pub city: String,
    pub province: Option<String>,
}

impl EntityIdentity {
    /// Key unique within a kind: address and city for buildings, name, city
    /// and province for everything else.
    pub fn natural_key(&self) -> String {
        let parts = match self.kind.natural_key() {
            NaturalKey::AddressCity => {
                vec![self.address.as_deref().unwrap_or_default(), self.city.as_str()]
            }
            NaturalKey::NameCityProvince => vec![
                self.name.as_str(),
                self.city.as_str(),
                self.province.as_deref().unwrap_or_default(),
            ],
        };
        parts
            .into_iter()
            .map(match_key)
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedReview {
    pub identity: EntityIdentity,
    pub ratings: RatingSet,
    pub comment: Option<String>,
    pub image_urls: Vec<String>,
    pub is_anonymous: bool,
    pub display_name: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(
    problems: &mut BTreeMap<String, String>,
    field: &str,
    value: &Option<String>,
) {
    match value {
        None => {
            problems.insert(field.to_string(), "field is required".to_string());
        }
        Some(v) if v.chars().count() > MAX_FIELD_LENGTH => {
            problems.insert(
                field.to_string(),
                format!("must be at most {MAX_FIELD_LENGTH} characters"),
            );
        }
        Some(_) => {}
    }
}

impl ReviewDraft {
    /// Checks the draft against the rules of `kind`, collecting every problem.
    pub fn validate(
        self,
        kind: EntityKind,
        limits: &SubmissionLimits,
    ) -> Result<ValidatedReview, DomainError> {
        let mut problems = BTreeMap::new();

        let name = clean(self.name);
        let address = clean(self.address);
        let city = clean(self.city);
        let province = clean(self.province);

        require(&mut problems, "city", &city);
        let name = match kind.natural_key() {
            NaturalKey::NameCityProvince => {
                require(&mut problems, "name", &name);
                require(&mut problems, "province", &province);
                name
            }
            NaturalKey::AddressCity => {
                require(&mut problems, "address", &address);
                name.or_else(|| address.clone())
            }
        };

        let ratings = match RatingSet::new(kind, &self.ratings) {
            Ok(set) => Some(set),
            Err(DomainError::Validation(rating_problems)) => {
                problems.extend(rating_problems);
                None
            }
            Err(other) => return Err(other),
        };

        let comment = clean(self.comment);
        if let Some(text) = &comment
            && text.chars().count() > limits.max_comment_length
        {
            problems.insert(
                "comment".to_string(),
                format!("must be at most {} characters", limits.max_comment_length),
            );
        }

        if self.image_urls.len() > limits.max_images {
            problems.insert(
                "image_urls".to_string(),
                format!("at most {} images are allowed", limits.max_images),
            );
        }
        for (index, raw) in self.image_urls.iter().enumerate() {
            let valid = Url::parse(raw)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                problems.insert(
                    format!("image_urls[{index}]"),
                    "must be an absolute http(s) URL".to_string(),
                );
            }
        }

        let display_name = clean(self.display_name);
        if let Some(display) = &display_name
            && display.chars().count() > MAX_DISPLAY_NAME_LENGTH
        {
            problems.insert(
                "display_name".to_string(),
                format!("must be at most {MAX_DISPLAY_NAME_LENGTH} characters"),
            );
        }

        match (name, city, ratings) {
            (Some(name), Some(city), Some(ratings)) if problems.is_empty() => {
                Ok(ValidatedReview {
                    identity: EntityIdentity {
                        kind,
                        name,
                        address,
                        city,
                        province,
                    },
                    ratings,
                    comment,
                    image_urls: self.image_urls,
                    is_anonymous: self.is_anonymous,
                    display_name,
                })
            }
            _ => Err(DomainError::Validation(problems)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: SubmissionLimits = SubmissionLimits {
        max_comment_length: 20,
        max_images: 2,
    };

    fn ratings(kind: EntityKind, score: i64) -> BTreeMap<String, i64> {
        kind.categories()
            .iter()
            .map(|name| (name.to_string(), score))
            .collect()
    }

    fn problems_of(result: Result<ValidatedReview, DomainError>) -> BTreeMap<String, String> {
        match result {
            Err(DomainError::Validation(problems)) => problems,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn landlord_requires_name_city_province() {
        let draft = ReviewDraft {
            city: Some("Toronto".into()),
            ratings: ratings(EntityKind::Landlord, 4),
            ..Default::default()
        };

        let problems = problems_of(draft.validate(EntityKind::Landlord, &LIMITS));
        assert!(problems.contains_key("name"));
        assert!(problems.contains_key("province"));
        assert!(!problems.contains_key("city"));
    }

    #[test]
    fn natural_key_ignores_case_and_spacing() {
        let landlord = |name: &str, city: &str| EntityIdentity {
            kind: EntityKind::Landlord,
            name: name.to_string(),
            address: None,
            city: city.to_string(),
            province: Some("QC".to_string()),
        };

        assert_eq!(
            landlord("Gestion  Béland", "MONTRÉAL").natural_key(),
            landlord("gestion béland", "Montréal").natural_key()
        );
        assert_ne!(
            landlord("Acme", "Laval").natural_key(),
            landlord("Acme Laval", "").natural_key()
        );
        assert_eq!(match_key("  10   Main ST "), "10 main st");
    }

    #[test]
    fn building_key_uses_address_not_name() {
        let building = |name: &str| EntityIdentity {
            kind: EntityKind::Building,
            name: name.to_string(),
            address: Some("5 Rue Rachel".to_string()),
            city: "Montreal".to_string(),
            province: None,
        };

        assert_eq!(
            building("The Rachel").natural_key(),
            building("5 Rue Rachel").natural_key()
        );
    }

    #[test]
    fn building_name_defaults_to_address() {
        let draft = ReviewDraft {
            address: Some("  120 Maple Ave ".into()),
            city: Some("Toronto".into()),
            ratings: ratings(EntityKind::Building, 5),
            ..Default::default()
        };

        let validated = draft.validate(EntityKind::Building, &LIMITS).unwrap();
        assert_eq!(validated.identity.name, "120 Maple Ave");
        assert_eq!(validated.identity.address.as_deref(), Some("120 Maple Ave"));
        assert_eq!(validated.identity.province, None);
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let draft = ReviewDraft {
            name: Some("   ".into()),
            city: Some("Montreal".into()),
            province: Some("QC".into()),
            ratings: ratings(EntityKind::Neighborhood, 3),
            ..Default::default()
        };

        let problems = problems_of(draft.validate(EntityKind::Neighborhood, &LIMITS));
        assert_eq!(problems.get("name").map(String::as_str), Some("field is required"));
    }

    #[test]
    fn unrated_category_blocks_submission() {
        let mut scores = ratings(EntityKind::RentCompany, 4);
        scores.remove("transparency");
        let draft = ReviewDraft {
            name: Some("Acme Rentals".into()),
            city: Some("Halifax".into()),
            province: Some("NS".into()),
            ratings: scores,
            ..Default::default()
        };

        let problems = problems_of(draft.validate(EntityKind::RentCompany, &LIMITS));
        assert_eq!(problems.len(), 1);
        assert!(problems.contains_key("ratings.transparency"));
    }

    #[test]
    fn comment_and_image_limits_are_enforced() {
        let draft = ReviewDraft {
            name: Some("Acme Rentals".into()),
            city: Some("Halifax".into()),
            province: Some("NS".into()),
            ratings: ratings(EntityKind::RentCompany, 4),
            comment: Some("x".repeat(21)),
            image_urls: vec![
                "https://cdn.example.com/a.jpg".into(),
                "ftp://example.com/b.jpg".into(),
                "not a url".into(),
            ],
            ..Default::default()
        };

        let problems = problems_of(draft.validate(EntityKind::RentCompany, &LIMITS));
        assert!(problems.contains_key("comment"));
        assert!(problems.contains_key("image_urls"));
        assert!(problems.contains_key("image_urls[1]"));
        assert!(problems.contains_key("image_urls[2]"));
        assert!(!problems.contains_key("image_urls[0]"));
    }

    #[test]
    fn valid_draft_keeps_optional_fields() {
        let draft = ReviewDraft {
            name: Some("Le Plateau".into()),
            address: None,
            city: Some("Montreal".into()),
            province: Some("QC".into()),
            ratings: ratings(EntityKind::Neighborhood, 5),
            comment: Some(" Great cafes ".into()),
            image_urls: vec!["https://cdn.example.com/a.jpg".into()],
            is_anonymous: true,
            display_name: Some("Sam".into()),
        };

        let validated = draft.validate(EntityKind::Neighborhood, &LIMITS).unwrap();
        assert_eq!(validated.comment.as_deref(), Some("Great cafes"));
        assert_eq!(validated.image_urls.len(), 1);
        assert!(validated.is_anonymous);
        assert_eq!(validated.ratings.average(), 5.0);
    }
}
