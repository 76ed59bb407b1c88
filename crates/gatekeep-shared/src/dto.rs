//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Query for `GET /api/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsQuery {
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_timeframe() -> String {
    "day".to_string()
}

/// Admission counters as reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionStatsResponse {
    pub admitted: u64,
    pub rejected: u64,
    pub tracked_identities: usize,
}

/// Cache counters as reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub computations: u64,
    pub coalesced: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub entries: usize,
}

/// Report served by `GET /api/metrics`, cached per timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub timeframe: String,
    pub generated_at: String,
    pub admission: AdmissionStatsResponse,
    pub cache: CacheStatsResponse,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}
