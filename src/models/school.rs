//! School detail and admission quota structures.

use std::collections::HashMap;

use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use serde_json::Value;

/// Shown for quota cells with no upstream counterpart.
pub const NOT_AVAILABLE: &str = "N/A";

/// Capacity of one admission option, from the detail's `edges.options`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QuotaOption {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub option_type: Option<String>,
    #[serde(default)]
    pub initial_quota: Option<i64>,
    #[serde(default)]
    pub quota: Option<i64>,
}

/// Registration counts for one option, from the detail's `statistics`.
///
/// `option` holds the option's display name, not its type.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QuotaStatistic {
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default)]
    pub total_registration: Option<i64>,
    #[serde(default)]
    pub total_verified: Option<i64>,
    #[serde(default)]
    pub total_not_verified: Option<i64>,
    #[serde(default)]
    pub total_canceled: Option<i64>,
}

/// A count, or the explicit "not available" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuotaCell {
    Count(i64),
    #[default]
    NotAvailable,
}

impl From<Option<i64>> for QuotaCell {
    fn from(value: Option<i64>) -> Self {
        value.map_or(QuotaCell::NotAvailable, QuotaCell::Count)
    }
}

impl Serialize for QuotaCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QuotaCell::Count(n) => serializer.serialize_i64(*n),
            QuotaCell::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// One row of the combined quota table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaRow {
    pub option_type: String,
    pub label: String,
    pub initial_quota: QuotaCell,
    pub quota: QuotaCell,
    pub total_registration: QuotaCell,
    pub total_verified: QuotaCell,
    pub total_not_verified: QuotaCell,
    pub total_canceled: QuotaCell,
}

impl QuotaRow {
    fn new(option_type: String, label: String) -> Self {
        Self {
            option_type,
            label,
            initial_quota: QuotaCell::NotAvailable,
            quota: QuotaCell::NotAvailable,
            total_registration: QuotaCell::NotAvailable,
            total_verified: QuotaCell::NotAvailable,
            total_not_verified: QuotaCell::NotAvailable,
            total_canceled: QuotaCell::NotAvailable,
        }
    }
}

/// Merge option capacities and registration statistics into one table
/// keyed by option type, sorted by label.
///
/// A statistic is attached to the option whose name equals its `option`;
/// unmatched statistics get a row of their own keyed by that name.
pub fn combine_quota(options: &[QuotaOption], statistics: &[QuotaStatistic]) -> Vec<QuotaRow> {
    let mut rows: Vec<QuotaRow> = Vec::new();
    let mut by_type: HashMap<String, usize> = HashMap::new();

    for option in options {
        let label = option.name.clone().unwrap_or_default();
        let key = option.option_type.clone().unwrap_or_else(|| label.clone());
        let index = *by_type.entry(key.clone()).or_insert_with(|| {
            rows.push(QuotaRow::new(key, label.clone()));
            rows.len() - 1
        });
        let row = &mut rows[index];
        row.label = label;
        row.initial_quota = option.initial_quota.into();
        row.quota = option.quota.into();
    }

    for stat in statistics {
        let name = stat.option.clone().unwrap_or_default();
        let key = options
            .iter()
            .find(|o| o.name.as_deref() == Some(name.as_str()))
            .and_then(|o| o.option_type.clone().or_else(|| o.name.clone()))
            .unwrap_or_else(|| name.clone());
        let index = *by_type.entry(key.clone()).or_insert_with(|| {
            rows.push(QuotaRow::new(key, name));
            rows.len() - 1
        });
        let row = &mut rows[index];
        row.total_registration = stat.total_registration.into();
        row.total_verified = stat.total_verified.into();
        row.total_not_verified = stat.total_not_verified.into();
        row.total_canceled = stat.total_canceled.into();
    }

    rows.sort_by(|a, b| a.label.cmp(&b.label));
    rows
}

/// A school's detail as served by `/api/school-details`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolDetail {
    pub school_name: Option<String>,
    /// Raw upstream statistics
    pub statistics: Value,
    /// Raw upstream option capacities
    pub options: Value,
    pub quota: Vec<QuotaRow>,
}

impl SchoolDetail {
    /// Build from the `result` object of the detail endpoint.
    pub fn from_result(result: &Value) -> Self {
        let school_name = result
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let statistics = result.get("statistics").cloned().unwrap_or(Value::Null);
        let options = result
            .get("edges")
            .and_then(|edges| edges.get("options"))
            .cloned()
            .unwrap_or(Value::Null);

        let typed_options: Vec<QuotaOption> = lenient_list(&options);
        let typed_statistics: Vec<QuotaStatistic> = lenient_list(&statistics);
        let quota = combine_quota(&typed_options, &typed_statistics);

        Self {
            school_name,
            statistics,
            options,
            quota,
        }
    }
}

/// Deserialize each array element on its own, dropping the ones that don't fit.
fn lenient_list<T: for<'de> Deserialize<'de>>(value: &Value) -> Vec<T> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
