// src/services/pagination.rs

//! Paginated fetcher.
//!
//! Walks an upstream listing page by page until the reported page count is
//! reached, pausing between pages. A failing page ends the walk; whatever was
//! collected before it is returned.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::utils::http::{Query, Upstream};

/// One logical listing to walk.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub endpoint: String,
    /// Parameters sent with every page, after `page` and `limit`
    pub params: Query,
    pub page_size: u32,
    /// Short description used in log lines
    pub label: String,
}

/// Summary of a paginated walk.
#[derive(Debug, Default)]
pub struct PageOutcome {
    pub items: Vec<Value>,
    pub pages_fetched: u32,
    /// Last page count reported by upstream
    pub page_count: u32,
    /// Error that ended the walk early
    pub failure: Option<AppError>,
}

impl PageOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Items and paging info from one response envelope.
#[derive(Debug, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub page_count: Option<u32>,
}

impl Page {
    /// Parse `{ result: { itemsList: [...], paginator: { page_count } } }`.
    pub fn parse(body: Value) -> Result<Self> {
        let Value::Object(mut root) = body else {
            return Err(AppError::envelope("body is not a JSON object"));
        };
        let Some(Value::Object(mut result)) = root.remove("result") else {
            return Err(AppError::envelope("missing `result` object"));
        };

        let items = match result.remove("itemsList") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let page_count = result
            .get("paginator")
            .and_then(|p| p.get("page_count"))
            .and_then(|count| match count {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));

        Ok(Self { items, page_count })
    }
}

/// Sequential page walker with a fixed courtesy delay between pages.
#[derive(Clone)]
pub struct PageFetcher {
    upstream: Arc<dyn Upstream>,
    delay: Duration,
}

impl PageFetcher {
    pub fn new(upstream: Arc<dyn Upstream>, delay: Duration) -> Self {
        Self { upstream, delay }
    }

    /// Fetch every page of `request` and concatenate the items in page order.
    ///
    /// Never fails: an error on any page is logged and ends the walk.
    pub async fn fetch_all(&self, request: &PageRequest) -> PageOutcome {
        let mut outcome = PageOutcome::default();
        let mut page_num: u32 = 1;
        let mut total_pages: u32 = 1;

        log::info!("[API Fetch] Starting {}", request.label);

        while page_num <= total_pages {
            log::debug!(
                "[API Request] {} page {}/{}",
                request.label,
                page_num,
                total_pages
            );

            let mut query: Query = vec![
                ("page".to_string(), page_num.to_string()),
                ("limit".to_string(), request.page_size.to_string()),
            ];
            query.extend(request.params.iter().cloned());

            let page = match self.upstream.get_json(&request.endpoint, &query).await {
                Ok(body) => Page::parse(body),
                Err(e) => Err(e),
            };

            match page {
                Ok(page) => {
                    outcome.items.extend(page.items);
                    outcome.pages_fetched += 1;
                    total_pages = page.page_count.unwrap_or(page_num);
                    outcome.page_count = total_pages;
                }
                Err(e) => {
                    log::error!(
                        "[API Error] {} page {} ({}): {}",
                        request.label,
                        page_num,
                        request.endpoint,
                        e
                    );
                    outcome.failure = Some(e);
                    break;
                }
            }

            page_num += 1;
            if page_num <= total_pages {
                tokio::time::sleep(self.delay).await;
            }
        }

        log::info!(
            "[API Fetch] Finished {}: {} items from {} page(s){}",
            request.label,
            outcome.items.len(),
            outcome.pages_fetched,
            if outcome.is_complete() { "" } else { " (partial)" }
        );
        outcome
    }
}
