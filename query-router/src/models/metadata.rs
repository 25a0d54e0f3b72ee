use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString};

/// Kind of location data stored per project
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MetadataCategory {
    AirQualityIndex,
    Education,
    Healthcare,
    Entertainment,
    Landmark,
    Restaurant,
    Shopping,
}

impl MetadataCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataCategory::AirQualityIndex => "air_quality_index",
            MetadataCategory::Education => "education",
            MetadataCategory::Healthcare => "healthcare",
            MetadataCategory::Entertainment => "entertainment",
            MetadataCategory::Landmark => "landmark",
            MetadataCategory::Restaurant => "restaurant",
            MetadataCategory::Shopping => "shopping",
        }
    }
}

impl std::fmt::Display for MetadataCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
