//! Route handlers.
//!
//! Missing parameters degrade to empty successful responses, except for
//! school details, which answers 400.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Html;
use serde::{Deserialize, Serialize};

use crate::models::{OptionType, RankedRegistrant, RegionMapping, SchoolDetail, SchoolDirectory};
use crate::server::AppState;
use crate::server::error::ApiError;
use crate::services::NameIndex;
use crate::services::ranking::{
    OriginSchoolCount, RegistrantFilter, rank, summarize_origin_schools, unique_origin_schools,
};
use crate::utils::{escape_html, non_empty};

const DASHBOARD_TEMPLATE: &str = include_str!("../../assets/index.html");

#[derive(Debug, Default, Deserialize)]
pub struct SchoolsQuery {
    pub cadisdik_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SchoolDetailsQuery {
    pub npsn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DataQuery {
    pub npsn: Option<String>,
    pub option_type: Option<String>,
    pub search: Option<String>,
    pub min_distance: Option<String>,
    pub max_distance: Option<String>,
    pub origin_school_name: Option<String>,
    pub cadisdik_id: Option<String>,
}

impl DataQuery {
    pub fn filter(&self) -> RegistrantFilter {
        RegistrantFilter {
            search_text: self.search.clone().filter(|s| !s.is_empty()),
            min_distance: parse_distance(self.min_distance.as_deref()),
            max_distance: parse_distance(self.max_distance.as_deref()),
            origin_school_name: non_empty(self.origin_school_name.as_deref()).map(str::to_string),
        }
    }
}

/// Number from a query value; blank or non-numeric input means "no bound".
fn parse_distance(value: Option<&str>) -> Option<f64> {
    non_empty(value)?
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub filtered_data: Vec<RankedRegistrant>,
    pub unique_origin_schools: Vec<String>,
    pub origin_school_summary: Vec<OriginSchoolCount>,
}

/// `GET /`
pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let regions = state.lookups.load_region_mapping().await;
    Html(render_dashboard(&regions))
}

/// Fill the dashboard template with option-type and region choices.
pub fn render_dashboard(regions: &RegionMapping) -> String {
    let option_types: String = OptionType::ALL
        .iter()
        .map(|t| format!("<option value=\"{0}\">{0}</option>", t.key()))
        .collect();
    let region_options: String = regions
        .iter()
        .map(|r| {
            format!(
                "<option value=\"{}\">{}</option>",
                escape_html(&r.id),
                escape_html(&r.name)
            )
        })
        .collect();

    DASHBOARD_TEMPLATE
        .replace("{{option_types}}", &option_types)
        .replace("{{regions}}", &region_options)
}

/// `GET /api/cadisdik`
pub async fn regions(State(state): State<AppState>) -> Json<RegionMapping> {
    let mapping = state.lookups.load_region_mapping().await;
    Json(mapping.as_ref().clone())
}

/// `GET /api/schools?cadisdik_id=`
pub async fn schools(
    State(state): State<AppState>,
    Query(params): Query<SchoolsQuery>,
) -> Json<SchoolDirectory> {
    let directory = state
        .lookups
        .load_schools_by_region(params.cadisdik_id.as_deref())
        .await;
    Json(directory.as_ref().clone())
}

/// `GET /api/school-details?npsn=`
pub async fn school_details(
    State(state): State<AppState>,
    Query(params): Query<SchoolDetailsQuery>,
) -> Result<Json<SchoolDetail>, ApiError> {
    let Some(npsn) = non_empty(params.npsn.as_deref()) else {
        return Err(ApiError::bad_request("Parameter npsn is required"));
    };

    match state.lookups.load_school_detail(npsn).await {
        Some(detail) => Ok(Json(detail.as_ref().clone())),
        None => Err(ApiError::not_found(format!(
            "School details for NPSN {npsn} not found"
        ))),
    }
}

/// `GET /api/data?npsn=&option_type=&search=&min_distance=&max_distance=&origin_school_name=&cadisdik_id=`
pub async fn data(
    State(state): State<AppState>,
    Query(params): Query<DataQuery>,
) -> Json<DataResponse> {
    let records = state
        .lookups
        .load_registrants(params.npsn.as_deref(), params.option_type.as_deref())
        .await;

    let filter = params.filter();
    let ranked = rank(&records, &filter, state.strategy);
    log_data_request(state.lookups.names(), &params, records.len(), ranked.len());

    Json(DataResponse {
        unique_origin_schools: unique_origin_schools(&records),
        origin_school_summary: summarize_origin_schools(ranked.iter().map(|r| &r.record)),
        filtered_data: ranked,
    })
}

fn log_data_request(names: &NameIndex, params: &DataQuery, total: usize, shown: usize) {
    let Some(npsn) = non_empty(params.npsn.as_deref()) else {
        log::debug!("[Data] Request without npsn, returning empty result");
        return;
    };
    let region = non_empty(params.cadisdik_id.as_deref())
        .map(|id| format!(" in {}", names.region_label(id)))
        .unwrap_or_default();
    log::info!(
        "[Data] {}{} {}: {} of {} registrants after filters",
        names.school_label(npsn),
        region,
        params.option_type.as_deref().unwrap_or("-"),
        shown,
        total
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_invalid_distances_are_ignored() {
        assert_eq!(parse_distance(Some("")), None);
        assert_eq!(parse_distance(Some("abc")), None);
        assert_eq!(parse_distance(Some("NaN")), None);
        assert_eq!(parse_distance(Some(" 7.5 ")), Some(7.5));
    }

    #[test]
    fn filter_from_query() {
        let query = DataQuery {
            search: Some("".into()),
            min_distance: Some("5".into()),
            origin_school_name: Some("ALL_SCHOOLS".into()),
            ..Default::default()
        };
        let filter = query.filter();
        assert_eq!(filter.search_text, None);
        assert_eq!(filter.min_distance, Some(5.0));
        assert_eq!(filter.max_distance, None);
        assert_eq!(filter.origin_school_name.as_deref(), Some("ALL_SCHOOLS"));
    }

    #[test]
    fn search_text_is_not_trimmed() {
        let query = DataQuery {
            search: Some("budi ".into()),
            ..Default::default()
        };
        assert_eq!(query.filter().search_text.as_deref(), Some("budi "));
    }

    #[test]
    fn dashboard_lists_choices_escaped() {
        let regions = RegionMapping::from_cities(vec![("1".to_string(), vec!["KOTA <A>"])]);
        let html = render_dashboard(&regions);
        assert!(html.contains("<option value=\"KETM\">KETM</option>"));
        assert!(html.contains("<option value=\"1\">KOTA &lt;A&gt;</option>"));
        assert!(!html.contains("{{regions}}"));
    }
}
