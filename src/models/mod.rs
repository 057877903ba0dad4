// src/models/mod.rs

//! Domain models for the proxy.
//!
//! This module contains the data structures shared by the fetch, cache,
//! ranking, and HTTP layers, organized by their primary purpose.

mod config;
mod region;
mod registrant;
mod school;

// Re-export all public types
pub use config::{
    CacheConfig, Config, LoggingConfig, RankingConfig, RankingStrategy, RegionsConfig,
    ServerConfig, UpstreamConfig,
};
pub use region::{FallbackRegion, FallbackRegions, Region, RegionMapping, SchoolDirectory};
pub use registrant::{OptionType, RankedRegistrant, RegistrantRecord};
pub use school::{
    NOT_AVAILABLE, QuotaCell, QuotaOption, QuotaRow, QuotaStatistic, SchoolDetail, combine_quota,
};
