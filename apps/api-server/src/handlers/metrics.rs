//! Metrics report endpoint, served through the result cache.

use actix_web::{HttpResponse, web};
use std::time::Instant;

use gatekeep_core::BoxError;
use gatekeep_core::ports::{AdmissionStats, CacheStats, ComputeFuture};
use gatekeep_shared::dto::{
    AdmissionStatsResponse, CacheStatsResponse, MetricsQuery, MetricsReport,
};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Accepted timeframes. Restricting them bounds the number of cache keys.
const TIMEFRAMES: &[&str] = &["hour", "day", "week", "month"];

/// GET /api/metrics?timeframe=<hour|day|week|month>
pub async fn metrics_report(
    state: web::Data<AppState>,
    query: web::Query<MetricsQuery>,
) -> AppResult<HttpResponse> {
    let timeframe = query.into_inner().timeframe;
    if !TIMEFRAMES.contains(&timeframe.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unknown timeframe '{}', expected one of {}",
            timeframe,
            TIMEFRAMES.join(", ")
        )));
    }

    let key = format!("metrics_{}", timeframe);
    let now = Instant::now();
    let deadline = now + state.compute_timeout;

    let report = state
        .reports
        .get_or_compute(&key, now, build_report(&state, timeframe), Some(deadline))
        .await?;

    Ok(HttpResponse::Ok().json(report))
}

fn build_report(state: &AppState, timeframe: String) -> ComputeFuture<MetricsReport> {
    let admission = state.admission.clone();
    let reports = state.reports.clone();

    Box::pin(async move {
        tracing::debug!(timeframe = %timeframe, "Generating metrics report");
        Ok::<_, BoxError>(MetricsReport {
            timeframe,
            generated_at: chrono::Utc::now().to_rfc3339(),
            admission: admission_response(admission.stats()),
            cache: cache_response(reports.stats()),
        })
    })
}

fn admission_response(stats: AdmissionStats) -> AdmissionStatsResponse {
    AdmissionStatsResponse {
        admitted: stats.admitted,
        rejected: stats.rejected,
        tracked_identities: stats.tracked_identities,
    }
}

fn cache_response(stats: CacheStats) -> CacheStatsResponse {
    CacheStatsResponse {
        hits: stats.hits,
        misses: stats.misses,
        computations: stats.computations,
        coalesced: stats.coalesced,
        failures: stats.failures,
        timeouts: stats.timeouts,
        entries: stats.entries,
    }
}
