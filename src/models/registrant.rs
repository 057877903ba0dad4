//! Registrant data structures.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One applicant's entry, as listed by the registration endpoint.
///
/// Fields the proxy does not interpret are kept in `extra` and passed
/// through unchanged to the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrantRecord {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub registration_number: String,

    #[serde(default)]
    pub score: Option<f64>,

    /// Kilometers to the first-choice school
    #[serde(default)]
    pub distance_1: Option<f64>,

    #[serde(default)]
    pub distance_2: Option<f64>,

    #[serde(default)]
    pub distance_3: Option<f64>,

    #[serde(default)]
    pub first_option_name: Option<String>,

    #[serde(default)]
    pub second_option_name: Option<String>,

    #[serde(default)]
    pub third_option_name: Option<String>,

    /// The applicant's origin school
    #[serde(default)]
    pub school_name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistrantRecord {
    /// Smallest known distance across the three choices.
    pub fn closest_distance(&self) -> Option<f64> {
        [self.distance_1, self.distance_2, self.distance_3]
            .into_iter()
            .flatten()
            .reduce(f64::min)
    }

    /// Option names that are present.
    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        [
            &self.first_option_name,
            &self.second_option_name,
            &self.third_option_name,
        ]
        .into_iter()
        .filter_map(|name| name.as_deref())
    }
}

/// A registrant annotated with its position in a filtered, sorted listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedRegistrant {
    #[serde(flatten)]
    pub record: RegistrantRecord,

    /// 1-based position within the filtered set
    #[serde(rename = "rankingFiltered")]
    pub ranking_filtered: usize,
}

/// Admission pathway a registrant applies under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OptionType {
    /// Domicile zone
    #[default]
    Domicile,
    /// Economically disadvantaged
    Disadvantaged,
    /// Parent transfer
    Transfer,
}

impl OptionType {
    pub const ALL: [OptionType; 3] = [
        OptionType::Domicile,
        OptionType::Disadvantaged,
        OptionType::Transfer,
    ];

    /// Parse a dashboard value; unrecognized input means domicile zone.
    pub fn from_query(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "KETM" => OptionType::Disadvantaged,
            "MUTASI" | "PERPINDAHAN" => OptionType::Transfer,
            _ => OptionType::Domicile,
        }
    }

    /// Key shown by the dashboard.
    pub fn key(&self) -> &'static str {
        match self {
            OptionType::Domicile => "DOMISILI",
            OptionType::Disadvantaged => "KETM",
            OptionType::Transfer => "MUTASI",
        }
    }

    /// Value of the upstream `option_type` filter.
    pub fn api_value(&self) -> &'static str {
        match self {
            OptionType::Domicile => "zonasi",
            OptionType::Disadvantaged => "ketm",
            OptionType::Transfer => "perpindahan",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
