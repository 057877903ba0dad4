#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use spmb_proxy::error::{AppError, Result};
use spmb_proxy::models::{Config, FallbackRegions};
use spmb_proxy::server::{AppState, build_router};
use spmb_proxy::services::Lookups;
use spmb_proxy::utils::http::Upstream;

pub const REGISTRATION_URL: &str = "http://upstream.test/registration";
pub const SCHOOL_URL: &str = "http://upstream.test/school";
pub const REGION_URL: &str = "http://upstream.test/cadisdik";

#[derive(Clone)]
enum Reply {
    Json(Value),
    Status(u16),
}

/// Upstream stand-in answering from a table of `(url, page)` routes.
///
/// Requests without a `page` parameter match routes registered with `None`.
#[derive(Default)]
pub struct FakeUpstream {
    routes: Mutex<HashMap<(String, Option<String>), Reply>>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    latency: Duration,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each request takes `latency` (virtual time in paused tests).
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn respond(&self, url: &str, page: Option<u32>, body: Value) {
        self.route(url, page, Reply::Json(body));
    }

    pub fn fail(&self, url: &str, page: Option<u32>, status: u16) {
        self.route(url, page, Reply::Status(status));
    }

    fn route(&self, url: &str, page: Option<u32>, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .insert((url.to_string(), page.map(|p| p.to_string())), reply);
    }

    /// Number of requests made to `url`.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    /// Query of the `index`-th request to `url`.
    pub fn query_of(&self, url: &str, index: usize) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .nth(index)
            .map(|(_, q)| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), query.to_vec()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let page = query
            .iter()
            .find(|(k, _)| k == "page")
            .map(|(_, v)| v.clone());
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(&(url.to_string(), page))
            .cloned();
        match reply {
            Some(Reply::Json(body)) => Ok(body),
            Some(Reply::Status(status)) => Err(AppError::upstream(status, "scripted failure")),
            None => Err(AppError::upstream(404, format!("no route for {url}"))),
        }
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.upstream.registration_url = REGISTRATION_URL.to_string();
    config.upstream.school_url = SCHOOL_URL.to_string();
    config.upstream.region_url = REGION_URL.to_string();
    config.upstream.page_delay_ms = 300;
    config.cache.registrants_ttl_secs = 300;
    config
}

pub fn lookups(upstream: Arc<FakeUpstream>) -> Lookups {
    lookups_with(test_config(), upstream)
}

pub fn lookups_with(config: Config, upstream: Arc<FakeUpstream>) -> Lookups {
    let fallback = FallbackRegions::bundled().unwrap().into_mapping();
    Lookups::new(Arc::new(config), upstream, fallback)
}

pub fn app(upstream: Arc<FakeUpstream>) -> axum::Router {
    build_router(AppState::new(Arc::new(lookups(upstream))))
}

/// One page of the listing envelope.
pub fn listing_page(items: Vec<Value>, page_count: u32) -> Value {
    json!({
        "result": {
            "itemsList": items,
            "paginator": { "page_count": page_count }
        }
    })
}

pub fn registrant(name: &str, score: Option<f64>, distance: Option<f64>, origin: &str) -> Value {
    json!({
        "name": name,
        "registration_number": format!("REG-{name}"),
        "score": score,
        "distance_1": distance,
        "distance_2": null,
        "distance_3": null,
        "first_option_name": "SMAN 1 CIKANCUNG - DOMISILI",
        "second_option_name": null,
        "third_option_name": null,
        "school_name": origin
    })
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8")
}
