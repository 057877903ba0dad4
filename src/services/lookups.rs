// src/services/lookups.rs

//! Cached lookups against the registration API.
//!
//! Each loader derives a cache key from its inputs, serves a live cache entry
//! when there is one, and otherwise fetches from upstream and caches the
//! result. Missing inputs short-circuit to empty results without touching
//! upstream.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cache::CacheStore;
use crate::error::{AppError, Result};
use crate::models::{
    Config, OptionType, RegionMapping, RegistrantRecord, SchoolDetail, SchoolDirectory,
};
use crate::services::names::NameIndex;
use crate::services::pagination::{PageFetcher, PageOutcome, PageRequest};
use crate::utils::http::{Upstream, query};
use crate::utils::{join_segment, non_empty};

/// Cache key of the region mapping.
pub const REGION_MAPPING_KEY: &str = "cadisdik_mapping";

/// Upstream filter values for the school listing.
const SCHOOL_LEVEL: &str = "sma";
const SCHOOL_STATUS: &str = "negeri";

/// Payloads held by the shared cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Registrants(Arc<Vec<RegistrantRecord>>),
    Regions(Arc<RegionMapping>),
    Schools(Arc<SchoolDirectory>),
    SchoolDetail(Arc<SchoolDetail>),
}

pub fn registrants_key(npsn: &str, option_type: OptionType) -> String {
    format!("spmb_data_{}_{}", npsn, option_type.key().to_lowercase())
}

pub fn schools_key(region_id: &str) -> String {
    format!("schools_cadisdik_{region_id}")
}

pub fn school_detail_key(npsn: &str) -> String {
    format!("school_detail_{npsn}")
}

/// Loaders for regions, schools, registrants, and school details.
pub struct Lookups {
    config: Arc<Config>,
    upstream: Arc<dyn Upstream>,
    fetcher: PageFetcher,
    cache: CacheStore<CachedValue>,
    fallback_regions: RegionMapping,
    names: NameIndex,
}

impl Lookups {
    pub fn new(
        config: Arc<Config>,
        upstream: Arc<dyn Upstream>,
        fallback_regions: RegionMapping,
    ) -> Self {
        let delay = Duration::from_millis(config.upstream.page_delay_ms);
        Self {
            fetcher: PageFetcher::new(Arc::clone(&upstream), delay),
            config,
            upstream,
            cache: CacheStore::new(),
            fallback_regions,
            names: NameIndex::new(),
        }
    }

    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    pub fn cache(&self) -> &CacheStore<CachedValue> {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Region id to display name. Falls back to the static table when the
    /// region endpoint fails; the fallback is not cached.
    pub async fn load_region_mapping(&self) -> Arc<RegionMapping> {
        let ttl = Duration::from_secs(self.config.cache.regions_ttl_secs);
        let fill = async {
            match self.fetch_regions().await {
                Ok(mapping) => {
                    log::info!("[Cache] Region mapping fetched ({} regions)", mapping.len());
                    Some(CachedValue::Regions(Arc::new(mapping)))
                }
                Err(e) => {
                    log::warn!("[API Error] Region lookup failed, using fallback table: {e}");
                    None
                }
            }
        };

        let mapping = match self.cache.get_or_fill(REGION_MAPPING_KEY, ttl, fill).await {
            Some(CachedValue::Regions(mapping)) => mapping,
            _ => Arc::new(self.fallback_regions.clone()),
        };
        self.names.record_regions(&mapping);
        mapping
    }

    async fn fetch_regions(&self) -> Result<RegionMapping> {
        let params = query([("limit", self.config.upstream.region_limit.to_string())]);
        let body = self
            .upstream
            .get_json(&self.config.upstream.region_url, &params)
            .await?;
        let mapping = parse_regions(body)?;
        if mapping.is_empty() {
            return Err(AppError::envelope("region listing is empty"));
        }
        Ok(mapping)
    }

    /// School id to name for one region; empty without a region id.
    pub async fn load_schools_by_region(&self, region_id: Option<&str>) -> Arc<SchoolDirectory> {
        let Some(region_id) = non_empty(region_id) else {
            return Arc::new(SchoolDirectory::new());
        };

        let ttl = Duration::from_secs(self.config.cache.schools_ttl_secs);
        let request = PageRequest {
            endpoint: self.config.upstream.school_url.clone(),
            params: query([
                ("pagination", "true".to_string()),
                ("filters[0][key]", "level".to_string()),
                ("filters[0][value]", SCHOOL_LEVEL.to_string()),
                ("filters[1][key]", "status".to_string()),
                ("filters[1][value]", SCHOOL_STATUS.to_string()),
                ("filters[2][key]", "cadisdik".to_string()),
                ("filters[2][value]", region_id.to_string()),
            ]),
            page_size: self.config.upstream.school_page_size,
            label: format!("schools of {}", self.names.region_label(region_id)),
        };

        let fill = async {
            let outcome = self.fetcher.fetch_all(&request).await;
            if fetch_failed_outright(&outcome) {
                return None;
            }
            let directory = build_school_directory(&outcome.items);
            Some(CachedValue::Schools(Arc::new(directory)))
        };

        match self.cache.get_or_fill(&schools_key(region_id), ttl, fill).await {
            Some(CachedValue::Schools(directory)) => {
                self.names.record_schools(&directory);
                directory
            }
            _ => Arc::new(SchoolDirectory::new()),
        }
    }

    /// Registrants of one school under one option type; empty when either
    /// input is missing.
    pub async fn load_registrants(
        &self,
        school_id: Option<&str>,
        option_type: Option<&str>,
    ) -> Arc<Vec<RegistrantRecord>> {
        let (Some(npsn), Some(option_type)) = (non_empty(school_id), non_empty(option_type)) else {
            return Arc::new(Vec::new());
        };
        let option_type = OptionType::from_query(option_type);
        let key = registrants_key(npsn, option_type);

        let ttl = Duration::from_secs(self.config.cache.registrants_ttl_secs);
        let request = PageRequest {
            endpoint: self.config.upstream.registration_url.clone(),
            params: query([
                ("orderby", "distance_1"),
                ("order", "asc"),
                ("pagination", "true"),
                ("columns[0][key]", "name"),
                ("columns[0][searchable]", "false"),
                ("columns[1][key]", "registration_number"),
                ("columns[1][searchable]", "true"),
                ("npsn", npsn),
                ("filters[1][key]", "option_type"),
                ("filters[1][value]", option_type.api_value()),
                ("major_id", ""),
            ]),
            page_size: self.config.upstream.page_size,
            label: format!(
                "registrants of {} ({} / {})",
                self.names.school_label(npsn),
                option_type,
                option_type.api_value()
            ),
        };

        let fill = async {
            log::info!("[Cache] {key} not cached or expired, fetching from API");
            let outcome = self.fetcher.fetch_all(&request).await;
            if fetch_failed_outright(&outcome) {
                return None;
            }
            let records = decode_registrants(outcome.items);
            Some(CachedValue::Registrants(Arc::new(records)))
        };

        match self.cache.get_or_fill(&key, ttl, fill).await {
            Some(CachedValue::Registrants(records)) => records,
            _ => Arc::new(Vec::new()),
        }
    }

    /// Detail and quota of one school; `None` when upstream has nothing usable.
    pub async fn load_school_detail(&self, school_id: &str) -> Option<Arc<SchoolDetail>> {
        let npsn = non_empty(Some(school_id))?;
        let ttl = Duration::from_secs(self.config.cache.school_detail_ttl_secs);

        let fill = async {
            match self.fetch_school_detail(npsn).await {
                Ok(detail) => Some(CachedValue::SchoolDetail(Arc::new(detail))),
                Err(e) => {
                    log::error!(
                        "[API Error] School detail for {} failed: {e}",
                        self.names.school_label(npsn)
                    );
                    None
                }
            }
        };

        match self.cache.get_or_fill(&school_detail_key(npsn), ttl, fill).await {
            Some(CachedValue::SchoolDetail(detail)) => {
                if let Some(name) = &detail.school_name {
                    self.names.record_school(npsn, name);
                }
                Some(detail)
            }
            _ => None,
        }
    }

    async fn fetch_school_detail(&self, npsn: &str) -> Result<SchoolDetail> {
        let url = join_segment(&self.config.upstream.school_url, npsn)?;
        let body = self
            .upstream
            .get_json(&url, &query([("populate", "options")]))
            .await?;
        match body.get("result") {
            Some(result @ Value::Object(_)) => Ok(SchoolDetail::from_result(result)),
            _ => Err(AppError::envelope("missing `result` object")),
        }
    }
}

/// A walk that failed before any page came back is not worth caching.
fn fetch_failed_outright(outcome: &PageOutcome) -> bool {
    outcome.failure.is_some() && outcome.pages_fetched == 0
}

/// Parse `{ result: [ { cadisdik, city: [...] }, ... ] }`.
pub fn parse_regions(body: Value) -> Result<RegionMapping> {
    let Some(Value::Array(entries)) = body.get("result") else {
        return Err(AppError::envelope("missing `result` array"));
    };

    let pairs = entries.iter().filter_map(|entry| {
        let id = scalar_text(entry.get("cadisdik")?)?;
        let cities: Vec<String> = entry
            .get("city")
            .and_then(Value::as_array)
            .map(|cities| {
                cities
                    .iter()
                    .filter_map(|city| match city {
                        Value::String(name) => Some(name.clone()),
                        Value::Object(_) => city.get("name").and_then(scalar_text),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some((id, cities))
    });

    Ok(RegionMapping::from_cities(pairs))
}

/// Reduce school listing items to id → name, skipping incomplete items.
pub fn build_school_directory(items: &[Value]) -> SchoolDirectory {
    items
        .iter()
        .filter_map(|item| {
            let id = item
                .get("npsn")
                .or_else(|| item.get("id"))
                .and_then(scalar_text)?;
            let name = item.get("name").and_then(scalar_text)?;
            Some((id, name))
        })
        .collect()
}

/// Decode listing items, dropping the ones that aren't registrants.
pub fn decode_registrants(items: Vec<Value>) -> Vec<RegistrantRecord> {
    let total = items.len();
    let records: Vec<RegistrantRecord> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if records.len() < total {
        log::warn!(
            "Dropped {} malformed registrant item(s) of {}",
            total - records.len(),
            total
        );
    }
    records
}

/// Non-empty string or number as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_region_listing() {
        let mapping = parse_regions(json!({
            "result": [
                { "cadisdik": 2, "city": ["KOTA BOGOR", "KOTA DEPOK"] },
                { "cadisdik": "1", "city": [{ "name": "KAB. BOGOR" }] },
                { "city": ["no id"] }
            ]
        }))
        .unwrap();
        let ids: Vec<_> = mapping.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(mapping.get("1"), Some("KAB. BOGOR"));
    }

    #[test]
    fn region_listing_without_result_is_malformed() {
        assert!(parse_regions(json!({ "message": "down" })).is_err());
    }

    #[test]
    fn school_directory_skips_incomplete_items() {
        let directory = build_school_directory(&[
            json!({ "npsn": "20227904", "name": "SMAN 1 CIKANCUNG" }),
            json!({ "npsn": 20206145, "name": "SMAN 1 CIPARAY" }),
            json!({ "npsn": "20227905" }),
            json!({ "name": "nameless" }),
        ]);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory["20206145"], "SMAN 1 CIPARAY");
    }

    #[test]
    fn cache_keys_are_deterministic() {
        assert_eq!(
            registrants_key("20227904", OptionType::from_query("domisili")),
            registrants_key("20227904", OptionType::from_query("DOMISILI"))
        );
        assert_eq!(
            registrants_key("20227904", OptionType::Disadvantaged),
            "spmb_data_20227904_ketm"
        );
        assert_ne!(schools_key("1"), schools_key("2"));
    }

    #[test]
    fn malformed_registrants_are_dropped() {
        let records = decode_registrants(vec![
            json!({ "name": "A", "registration_number": "1" }),
            json!("not an object"),
        ]);
        assert_eq!(records.len(), 1);
    }
}
