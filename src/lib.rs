// src/lib.rs

//! SPMB Proxy Library
//!
//! Fetches paginated registrant, school, and region data from the West Java
//! school-admission API, caches it with a TTL, and serves filtered, ranked
//! listings to the dashboard.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;
