//! Entity kinds and their fixed rating categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DomainError;

/// The four kinds of ratable subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Neighborhood,
    Building,
    Landlord,
    RentCompany,
}

const NEIGHBORHOOD_CATEGORIES: &[&str] = &[
    "safety",
    "cleanliness",
    "noise",
    "transit",
    "amenities",
    "community",
];

const BUILDING_CATEGORIES: &[&str] = &[
    "maintenance",
    "cleanliness",
    "noise",
    "security",
    "amenities",
    "value",
];

const LANDLORD_CATEGORIES: &[&str] = &[
    "responsiveness",
    "fairness",
    "communication",
    "maintenance",
    "respect",
];

const RENT_COMPANY_CATEGORIES: &[&str] = &[
    "responsiveness",
    "professionalism",
    "transparency",
    "maintenance",
    "value",
];

/// Which fields identify an entity when a review names it instead of its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalKey {
    /// Street address and city (buildings)
    AddressCity,
    /// Name, city and province (everything else)
    NameCityProvince,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Neighborhood,
        EntityKind::Building,
        EntityKind::Landlord,
        EntityKind::RentCompany,
    ];

    /// Value stored in the `kind` / `entity_kind` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Neighborhood => "neighborhood",
            EntityKind::Building => "building",
            EntityKind::Landlord => "landlord",
            EntityKind::RentCompany => "rent_company",
        }
    }

    /// Value used in URL paths.
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::RentCompany => "rent-company",
            other => other.as_str(),
        }
    }

    /// Parses a path segment; the stored spelling is accepted as well.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "rent-company" => Some(EntityKind::RentCompany),
            other => other.parse().ok(),
        }
    }

    /// Rating categories in display order.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Neighborhood => NEIGHBORHOOD_CATEGORIES,
            EntityKind::Building => BUILDING_CATEGORIES,
            EntityKind::Landlord => LANDLORD_CATEGORIES,
            EntityKind::RentCompany => RENT_COMPANY_CATEGORIES,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        match self {
            EntityKind::Building => NaturalKey::AddressCity,
            _ => NaturalKey::NameCityProvince,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "neighborhood" => Ok(EntityKind::Neighborhood),
            "building" => Ok(EntityKind::Building),
            "landlord" => Ok(EntityKind::Landlord),
            "rent_company" => Ok(EntityKind::RentCompany),
            other => Err(DomainError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_counts_match_kind() {
        assert_eq!(EntityKind::Neighborhood.categories().len(), 6);
        assert_eq!(EntityKind::Building.categories().len(), 6);
        assert_eq!(EntityKind::Landlord.categories().len(), 5);
        assert_eq!(EntityKind::RentCompany.categories().len(), 5);
    }

    #[test]
    fn path_segments_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_path_segment(kind.path_segment()), Some(kind));
        }
        assert_eq!(
            EntityKind::from_path_segment("rent_company"),
            Some(EntityKind::RentCompany)
        );
        assert_eq!(EntityKind::from_path_segment("apartment"), None);
    }

    #[test]
    fn buildings_use_address_as_natural_key() {
        assert_eq!(EntityKind::Building.natural_key(), NaturalKey::AddressCity);
        assert_eq!(
            EntityKind::Landlord.natural_key(),
            NaturalKey::NameCityProvince
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "castle".parse::<EntityKind>().unwrap_err();
        assert!(matches!(err, DomainError::UnknownKind(value) if value == "castle"));
    }
}
