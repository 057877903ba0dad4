//! Region and school lookup tables.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

use crate::error::{AppError, Result};

/// One education-branch region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: String,
    /// Comma-joined names of the region's cities
    pub name: String,
}

/// Region id to display name, ordered by numeric id.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMapping {
    regions: Vec<Region>,
}

impl RegionMapping {
    /// Build a mapping from `(id, cities)` pairs.
    pub fn from_cities<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<S>)>,
        S: AsRef<str>,
    {
        let mut regions: Vec<Region> = entries
            .into_iter()
            .map(|(id, cities)| Region {
                name: cities
                    .iter()
                    .map(|c| c.as_ref().trim())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(", "),
                id,
            })
            .collect();
        regions.sort_by_key(|r| (r.id.parse::<u64>().unwrap_or(u64::MAX), r.id.clone()));
        Self { regions }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Serialize for RegionMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.regions.len()))?;
        for region in &self.regions {
            map.serialize_entry(&region.id, &region.name)?;
        }
        map.end()
    }
}

/// Versioned fallback table served when the region endpoint is unavailable.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackRegions {
    pub version: String,
    #[serde(rename = "region")]
    pub regions: Vec<FallbackRegion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackRegion {
    pub id: String,
    pub cities: Vec<String>,
}

impl FallbackRegions {
    /// The table bundled with the crate.
    pub const BUNDLED: &'static str = include_str!("../../data/fallback_regions.toml");

    pub fn parse(content: &str) -> Result<Self> {
        let table: Self = toml::from_str(content)?;
        if table.regions.is_empty() {
            return Err(AppError::config("Fallback region table is empty"));
        }
        Ok(table)
    }

    pub fn bundled() -> Result<Self> {
        Self::parse(Self::BUNDLED)
    }

    pub fn into_mapping(self) -> RegionMapping {
        RegionMapping::from_cities(self.regions.into_iter().map(|r| (r.id, r.cities)))
    }
}

/// School id (NPSN) to school name, for one region.
pub type SchoolDirectory = BTreeMap<String, String>;
