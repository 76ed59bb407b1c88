//! HTTP handlers and route configuration.

mod health;
mod metrics;

use actix_web::web;

use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

/// Configure all application routes.
///
/// Health checks stay outside the rate limiter.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.route("/api/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .wrap(RateLimitMiddleware::new(
                    state.admission.clone(),
                    state.identity.clone(),
                )
                .trust_forwarded_headers(state.trust_forwarded_headers))
                .route("/metrics", web::get().to(metrics::metrics_report)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use std::time::Duration;

    use crate::config::AppConfig;

    fn state(max_requests: u32) -> AppState {
        let mut config = AppConfig::default();
        config.rate_limit.max_requests = max_requests;
        config.rate_limit.window = Duration::from_secs(60);
        AppState::new(&config).unwrap()
    }

    fn get(uri: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(uri)
            .peer_addr("192.168.1.10:50000".parse().unwrap())
    }

    #[actix_web::test]
    async fn test_metrics_report_is_cached_per_timeframe() {
        let state = state(10);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(|cfg| configure_routes(cfg, &state)),
        )
        .await;

        let first: serde_json::Value =
            test::call_and_read_body_json(&app, get("/api/metrics?timeframe=day").to_request())
                .await;
        let second: serde_json::Value =
            test::call_and_read_body_json(&app, get("/api/metrics?timeframe=day").to_request())
                .await;
        let weekly: serde_json::Value =
            test::call_and_read_body_json(&app, get("/api/metrics?timeframe=week").to_request())
                .await;

        assert_eq!(first, second);
        assert_eq!(weekly["timeframe"], "week");

        let stats = state.reports.stats();
        assert_eq!(stats.computations, 2);
        assert_eq!(stats.hits, 1);
    }

    #[actix_web::test]
    async fn test_unknown_timeframe_is_rejected() {
        let state = state(10);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(|cfg| configure_routes(cfg, &state)),
        )
        .await;

        let res = test::call_service(&app, get("/api/metrics?timeframe=decade").to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.reports.stats().computations, 0);
    }

    #[actix_web::test]
    async fn test_health_is_not_rate_limited() {
        let state = state(1);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(|cfg| configure_routes(cfg, &state)),
        )
        .await;

        let res = test::call_service(&app, get("/api/metrics").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let res = test::call_service(&app, get("/api/metrics").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        for _ in 0..3 {
            let res = test::call_service(&app, get("/api/health").to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
