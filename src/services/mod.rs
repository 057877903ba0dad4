//! Service layer for the proxy.
//!
//! This module contains the business logic for:
//! - Walking paginated upstream listings (`PageFetcher`)
//! - Cached region, school, registrant, and school-detail lookups (`Lookups`)
//! - Filtering and ranking registrants (`ranking`)

pub mod lookups;
pub mod names;
pub mod pagination;
pub mod ranking;

pub use lookups::{CachedValue, Lookups};
pub use names::NameIndex;
pub use pagination::{Page, PageFetcher, PageOutcome, PageRequest};
pub use ranking::{RegistrantFilter, rank, summarize_origin_schools, unique_origin_schools};
