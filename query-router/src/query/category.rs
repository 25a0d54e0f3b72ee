//! Closed set of query categories

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};

/// Tenant id used for categories whose answers do not depend on the project
pub const GENERAL_TENANT: &str = "general";

/// Which answer-producing subsystem a sub-query is routed to.
///
/// Parsing accepts the canonical snake_case names as well as the short labels
/// the classifier prompt historically used (`csv`, `docs`, `vision`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Category {
    /// Unit-level facts: prices, availability, offers, payment plans
    #[strum(serialize = "structured_data", serialize = "csv")]
    StructuredData,
    /// Amenities, construction, materials and other project documentation
    #[strum(serialize = "document", serialize = "docs")]
    Document,
    /// Floor plans, master plans, unit layouts
    #[strum(serialize = "image", serialize = "vision")]
    Image,
    /// Location, connectivity and nearby infrastructure
    #[strum(serialize = "location_metadata", serialize = "metadata")]
    LocationMetadata,
    /// Rules, taxes and standard procedures shared by every project
    #[strum(serialize = "general_knowledge", serialize = "general")]
    GeneralKnowledge,
    /// Anything the system cannot answer
    #[strum(serialize = "out_of_scope", serialize = "other")]
    OutOfScope,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::StructuredData => "structured_data",
            Category::Document => "document",
            Category::Image => "image",
            Category::LocationMetadata => "location_metadata",
            Category::GeneralKnowledge => "general_knowledge",
            Category::OutOfScope => "out_of_scope",
        }
    }

    /// Whether all sub-queries of this category go to the handler as one call
    pub fn is_mergeable(&self) -> bool {
        matches!(self, Category::Document | Category::Image)
    }

    /// Tenant the handler must be called with instead of the caller's
    pub fn fixed_tenant(&self) -> Option<&'static str> {
        match self {
            Category::GeneralKnowledge => Some(GENERAL_TENANT),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::StructuredData => {
                "the query is about a specific unit number, unit prices, availability, down payment, \
                 EMI/mortgage fit, or offers and commissions for customers or brokers"
            }
            Category::Document => {
                "the query is about amenities, facilities, construction details, materials, design \
                 specifics, appliances within a unit, or other project documentation"
            }
            Category::Image => {
                "answering needs a floor plan, master plan or unit plan: number or size of rooms, \
                 presence of specific rooms, which blocks have a unit type, area of a unit type"
            }
            Category::LocationMetadata => {
                "the query is about location, connectivity (roads, metro/MRT), air quality or social \
                 infrastructure near the project"
            }
            Category::GeneralKnowledge => {
                "the query is about rules and regulations, taxes, standard operating procedures, \
                 warranty or defect liability period"
            }
            Category::OutOfScope => "the query does not fall into any of the other categories",
        }
    }

    pub fn examples(&self) -> &'static [&'static str] {
        match self {
            Category::StructuredData => &[
                "What is the price of unit 123?",
                "What is the view of unit 123? Is it unsold?",
                "Which units can be purchased with a down payment of $200000?",
                "Any ongoing offers for 3 beds?",
            ],
            Category::Document => &[
                "What are the amenities available in the project?",
                "What is the material used in the kitchen?",
                "What's the ceiling height in the bathrooms?",
                "Does the 3 bed unit have a washer?",
            ],
            Category::Image => &[
                "How many rooms are in the 4 bed unit?",
                "Does the 2 bed unit have a balcony?",
                "Which towers have 2 bed + study units?",
                "What is the area of the 2 bed unit?",
            ],
            Category::LocationMetadata => &[
                "What are the nearby schools, hospitals and shopping malls?",
                "How far is the project from the nearest metro station?",
                "What is the air quality index around the property?",
            ],
            Category::GeneralKnowledge => &[
                "What is the capital gains tax treatment for non-resident purchasers?",
                "Two brokers shared the same lead; whom should the lead credit go to?",
                "What is the defect liability period?",
            ],
            Category::OutOfScope => &["Who won the football match yesterday?"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_canonical_and_legacy_labels() {
        assert_eq!(Category::from_str("structured_data").unwrap(), Category::StructuredData);
        assert_eq!(Category::from_str("csv").unwrap(), Category::StructuredData);
        assert_eq!(Category::from_str("docs").unwrap(), Category::Document);
        assert_eq!(Category::from_str("Vision").unwrap(), Category::Image);
        assert_eq!(Category::from_str("metadata").unwrap(), Category::LocationMetadata);
        assert_eq!(Category::from_str("general").unwrap(), Category::GeneralKnowledge);
        assert_eq!(Category::from_str("other").unwrap(), Category::OutOfScope);
        assert!(Category::from_str("return_image").is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for category in Category::iter() {
            assert_eq!(Category::from_str(&category.to_string()).unwrap(), category);
        }
    }

    #[test]
    fn test_mergeable_and_fixed_tenant() {
        let mergeable: Vec<Category> = Category::iter().filter(|c| c.is_mergeable()).collect();
        assert_eq!(mergeable, vec![Category::Document, Category::Image]);
        assert_eq!(Category::GeneralKnowledge.fixed_tenant(), Some(GENERAL_TENANT));
        assert_eq!(Category::StructuredData.fixed_tenant(), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Category::LocationMetadata).unwrap();
        assert_eq!(json, "\"location_metadata\"");
    }
}
