//! # Race Analytics
//!
//! Performance aggregation and comparative analytics for motorsport results.
//!
//! ## Architecture
//!
//! - **models**: Record tree, position and session rules, derived stats
//! - **calculate**: Single-entity aggregation, comparison filters, battles and result tables
//! - **compare**: Concurrent fetch orchestration and comparison results
//! - **fetch**: Entity data sources (HTTP with caching, JSON directory, in-memory)
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod compare;
pub mod config;
pub mod fetch;
pub mod models;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        return n.parse().ok().map(Duration::from_millis);
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}
