// src/services/ranking.rs

//! Filter and rank engine.
//!
//! Pure functions over a registrant listing: filtering by text, distance,
//! and origin school, ordering by one of the [`RankingStrategy`] policies,
//! and numbering the survivors `1..=N`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::models::{RankedRegistrant, RankingStrategy, RegistrantRecord};

/// Origin-school value that disables the origin-school filter.
pub const ALL_ORIGIN_SCHOOLS: &str = "ALL_SCHOOLS";

/// Label for registrants without an origin school in summaries.
pub const UNKNOWN_ORIGIN_SCHOOL: &str = "Tidak Diketahui";

/// Direction of a nullable numeric sort key. Nulls always sort last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsLast {
    Ascending,
    Descending,
}

/// Total order over optional numbers with missing values last.
pub fn compare_nullable(a: Option<f64>, b: Option<f64>, direction: NullsLast) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            NullsLast::Ascending => a.total_cmp(&b),
            NullsLast::Descending => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Compare two registrants under `strategy`.
pub fn compare(a: &RegistrantRecord, b: &RegistrantRecord, strategy: RankingStrategy) -> Ordering {
    let by_score = || compare_nullable(a.score, b.score, NullsLast::Descending);
    let by_distance = || compare_nullable(a.distance_1, b.distance_1, NullsLast::Ascending);
    match strategy {
        RankingStrategy::ScoreFirst => by_score().then_with(by_distance),
        RankingStrategy::DistanceFirst => by_distance().then_with(by_score),
    }
}

/// User-supplied filter; every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrantFilter {
    pub search_text: Option<String>,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
    pub origin_school_name: Option<String>,
}

impl RegistrantFilter {
    /// Whether `record` passes every specified sub-filter.
    pub fn matches(&self, record: &RegistrantRecord) -> bool {
        self.matches_search(record) && self.matches_distance(record) && self.matches_origin(record)
    }

    fn matches_search(&self, record: &RegistrantRecord) -> bool {
        let Some(needle) = self.search_text.as_deref().map(str::to_lowercase) else {
            return true;
        };
        if needle.is_empty() {
            return true;
        }
        std::iter::once(record.name.as_str())
            .chain(std::iter::once(record.registration_number.as_str()))
            .chain(record.option_names())
            .any(|field| field.to_lowercase().contains(&needle))
    }

    fn matches_distance(&self, record: &RegistrantRecord) -> bool {
        if self.min_distance.is_none() && self.max_distance.is_none() {
            return true;
        }
        let Some(closest) = record.closest_distance() else {
            return false;
        };
        self.min_distance.is_none_or(|min| closest >= min)
            && self.max_distance.is_none_or(|max| closest <= max)
    }

    fn matches_origin(&self, record: &RegistrantRecord) -> bool {
        match self.origin_school_name.as_deref() {
            None | Some(ALL_ORIGIN_SCHOOLS) | Some("") => true,
            Some(origin) => record.school_name.as_deref().map(str::trim) == Some(origin.trim()),
        }
    }
}

/// Filter, sort, and number a listing. The input is left untouched.
pub fn rank(
    records: &[RegistrantRecord],
    filter: &RegistrantFilter,
    strategy: RankingStrategy,
) -> Vec<RankedRegistrant> {
    let mut survivors: Vec<&RegistrantRecord> =
        records.iter().filter(|r| filter.matches(r)).collect();
    // Stable, so ties keep upstream order.
    survivors.sort_by(|a, b| compare(a, b, strategy));

    survivors
        .into_iter()
        .enumerate()
        .map(|(index, record)| RankedRegistrant {
            record: record.clone(),
            ranking_filtered: index + 1,
        })
        .collect()
}

/// Sorted, deduplicated origin schools of a listing.
///
/// Callers pass the full cached listing, not a filtered one.
pub fn unique_origin_schools(records: &[RegistrantRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.school_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Registrant count for one origin school.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginSchoolCount {
    pub school_name: String,
    pub count: usize,
    /// Share of the listing, rounded to two decimals
    pub percentage: f64,
}

/// Count registrants per origin school, largest first.
pub fn summarize_origin_schools<'a, I>(records: I) -> Vec<OriginSchoolCount>
where
    I: IntoIterator<Item = &'a RegistrantRecord>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for record in records {
        let name = record
            .school_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_ORIGIN_SCHOOL);
        *counts.entry(name).or_default() += 1;
        total += 1;
    }

    let mut summary: Vec<OriginSchoolCount> = counts
        .into_iter()
        .map(|(name, count)| OriginSchoolCount {
            school_name: name.to_string(),
            count,
            percentage: (count as f64 * 10_000.0 / total as f64).round() / 100.0,
        })
        .collect();
    summary.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.school_name.cmp(&b.school_name))
    });
    summary
}
