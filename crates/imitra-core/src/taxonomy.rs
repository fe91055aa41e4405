//! Closed vocabularies used to route complaints: category, department, priority.
//!
//! Every value serialises as a `snake_case` string. The category → department
//! table is static; the classifier only ever picks a category and derives the
//! department from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Roads,
    WaterSupply,
    Electricity,
    StreetLighting,
    Sanitation,
    Drainage,
    FireSafety,
    PublicHealth,
    Parks,
    Other,
}

impl Category {
    /// Table order. Keyword-score ties resolve to the earlier entry.
    pub const ALL: [Category; 10] = [
        Self::Roads,
        Self::WaterSupply,
        Self::Electricity,
        Self::StreetLighting,
        Self::Sanitation,
        Self::Drainage,
        Self::FireSafety,
        Self::PublicHealth,
        Self::Parks,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roads => "roads",
            Self::WaterSupply => "water_supply",
            Self::Electricity => "electricity",
            Self::StreetLighting => "street_lighting",
            Self::Sanitation => "sanitation",
            Self::Drainage => "drainage",
            Self::FireSafety => "fire_safety",
            Self::PublicHealth => "public_health",
            Self::Parks => "parks",
            Self::Other => "other",
        }
    }

    /// Department responsible for this category.
    pub fn department(&self) -> Department {
        match self {
            Self::Roads | Self::Drainage => Department::PublicWorks,
            Self::WaterSupply => Department::WaterSupply,
            Self::Electricity | Self::StreetLighting => Department::Electricity,
            Self::Sanitation => Department::Sanitation,
            Self::FireSafety => Department::FireAndEmergency,
            Self::PublicHealth => Department::Health,
            Self::Parks => Department::Horticulture,
            Self::Other => Department::GeneralAdministration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    PublicWorks,
    WaterSupply,
    Electricity,
    Sanitation,
    FireAndEmergency,
    Health,
    Horticulture,
    GeneralAdministration,
}

impl Department {
    pub const ALL: [Department; 8] = [
        Self::PublicWorks,
        Self::WaterSupply,
        Self::Electricity,
        Self::Sanitation,
        Self::FireAndEmergency,
        Self::Health,
        Self::Horticulture,
        Self::GeneralAdministration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicWorks => "public_works",
            Self::WaterSupply => "water_supply",
            Self::Electricity => "electricity",
            Self::Sanitation => "sanitation",
            Self::FireAndEmergency => "fire_and_emergency",
            Self::Health => "health",
            Self::Horticulture => "horticulture",
            Self::GeneralAdministration => "general_administration",
        }
    }

    /// Departments whose SLA allowance is halved.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::FireAndEmergency | Self::Health)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// One level up, saturating at `Critical`.
    pub fn bump(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }
}

/// Look up a variant by its wire name.
pub(crate) fn parse_variant<T: Copy>(
    all: &[T],
    name: impl Fn(&T) -> &'static str,
    kind: &'static str,
    value: &str,
) -> Result<T, DomainError> {
    let needle = value.trim();
    all.iter()
        .find(|v| name(*v).eq_ignore_ascii_case(needle))
        .copied()
        .ok_or_else(|| DomainError::UnknownVariant {
            kind,
            value: value.to_string(),
        })
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, Self::as_str, "category", s)
    }
}

impl FromStr for Department {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, Self::as_str, "department", s)
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(&Self::ALL, Self::as_str, "priority", s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_routes_to_a_department() {
        assert_eq!(Category::FireSafety.department(), Department::FireAndEmergency);
        assert_eq!(Category::StreetLighting.department(), Department::Electricity);
        assert_eq!(Category::Drainage.department(), Department::PublicWorks);
        assert_eq!(Category::Other.department(), Department::GeneralAdministration);
    }

    #[test]
    fn wire_names_match_serde() {
        for c in Category::ALL {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.as_str()));
        }
        for d in Department::ALL {
            let json = serde_json::to_string(&d).unwrap();
            assert_eq!(json, format!("\"{}\"", d.as_str()));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!("Fire_Safety".parse::<Category>().unwrap(), Category::FireSafety);
        assert_eq!(" high ".parse::<Priority>().unwrap(), Priority::High);
        let err = "plumbing".parse::<Department>().unwrap_err();
        assert!(matches!(err, DomainError::UnknownVariant { kind: "department", .. }));
    }

    #[test]
    fn priority_bump_saturates() {
        assert_eq!(Priority::Low.bump(), Priority::Medium);
        assert_eq!(Priority::High.bump(), Priority::Critical);
        assert_eq!(Priority::Critical.bump(), Priority::Critical);
        assert!(Priority::Critical > Priority::Low);
    }

    #[test]
    fn only_fire_and_health_are_urgent() {
        let urgent: Vec<_> = Department::ALL.iter().filter(|d| d.is_urgent()).collect();
        assert_eq!(urgent, vec![&Department::FireAndEmergency, &Department::Health]);
    }
}
