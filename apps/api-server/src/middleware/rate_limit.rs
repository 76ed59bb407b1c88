//! Rate limiting middleware.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
};
use gatekeep_shared::ErrorResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gatekeep_core::ports::{Admission, AdmissionControl, IdentityPolicy, RequestIdentity};

const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Authenticated principal, inserted into request extensions by whatever
/// authenticates the request. Must run before this middleware.
#[derive(Debug, Clone)]
pub struct Principal(pub String);

/// Rate limiting middleware factory.
///
/// The client address is the socket peer unless forwarded headers are
/// explicitly trusted; only enable that behind a proxy that overwrites them.
pub struct RateLimitMiddleware {
    admission: Arc<dyn AdmissionControl>,
    identity: Arc<dyn IdentityPolicy>,
    trust_forwarded_headers: bool,
}

impl RateLimitMiddleware {
    pub fn new(admission: Arc<dyn AdmissionControl>, identity: Arc<dyn IdentityPolicy>) -> Self {
        Self {
            admission,
            identity,
            trust_forwarded_headers: false,
        }
    }

    /// Take the client address from `Forwarded` / `X-Forwarded-For`.
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service,
            admission: self.admission.clone(),
            identity: self.identity.clone(),
            trust_forwarded_headers: self.trust_forwarded_headers,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: S,
    admission: Arc<dyn AdmissionControl>,
    identity: Arc<dyn IdentityPolicy>,
    trust_forwarded_headers: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let key = {
            let principal = req.extensions().get::<Principal>().map(|p| p.0.clone());
            let peer_addr = if self.trust_forwarded_headers {
                req.connection_info().realip_remote_addr().map(str::to_string)
            } else {
                req.peer_addr().map(|addr| addr.ip().to_string())
            };
            self.identity.identify(&RequestIdentity {
                peer_addr: peer_addr.as_deref(),
                principal: principal.as_deref(),
            })
        };

        match self.admission.check(&key, Instant::now()) {
            Admission::Rejected { retry_after } => {
                let retry_secs = whole_seconds(retry_after);

                let response = HttpResponse::TooManyRequests()
                    .insert_header((REMAINING_HEADER, "0"))
                    .insert_header((RETRY_AFTER, retry_secs.to_string()))
                    .json(ErrorResponse::too_many_requests(retry_secs));

                let (http_req, _payload) = req.into_parts();
                let srv_response = ServiceResponse::new(http_req, response);

                Box::pin(async move { Ok(srv_response.map_into_right_body()) })
            }
            Admission::Admitted { remaining } => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let mut res = fut.await?;
                    res.headers_mut().insert(
                        HeaderName::from_static(REMAINING_HEADER),
                        HeaderValue::from(remaining),
                    );
                    Ok(res.map_into_left_body())
                })
            }
        }
    }
}

/// Round up to whole seconds for `Retry-After`, never advertising zero.
fn whole_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;
    use actix_web::{App, http::StatusCode, web};
    use gatekeep_infra::{
        InMemoryRateLimiter, PeerAddressIdentity, PrincipalIdentity, RateLimitConfig,
    };

    fn limiter(max_requests: u32) -> Arc<dyn AdmissionControl> {
        Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        }))
    }

    fn from_peer(ip: &str) -> actix_test::TestRequest {
        actix_test::TestRequest::get()
            .uri("/")
            .peer_addr(format!("{ip}:40000").parse().unwrap())
    }

    #[actix_web::test]
    async fn test_rejects_once_window_is_full() {
        let app = actix_test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(2), Arc::new(PeerAddressIdentity)))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let res = actix_test::call_service(&app, from_peer("10.0.0.1").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(REMAINING_HEADER).unwrap(), "1");

        let res = actix_test::call_service(&app, from_peer("10.0.0.1").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = actix_test::call_service(&app, from_peer("10.0.0.1").to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get(REMAINING_HEADER).unwrap(), "0");
        assert!(res.headers().contains_key(RETRY_AFTER));

        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["status"], 429);

        let res = actix_test::call_service(&app, from_peer("10.0.0.2").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_principals_share_an_address_independently() {
        let app = actix_test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(1), Arc::new(PrincipalIdentity)))
                .wrap_fn(|req, srv| {
                    let user = req
                        .headers()
                        .get("x-test-user")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    if let Some(user) = user {
                        req.extensions_mut().insert(Principal(user));
                    }
                    srv.call(req)
                })
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        for user in ["alice", "bob"] {
            let req = from_peer("10.0.0.1")
                .insert_header(("x-test-user", user))
                .to_request();
            assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = from_peer("10.0.0.1")
            .insert_header(("x-test-user", "alice"))
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[actix_web::test]
    async fn test_spoofed_forwarded_for_is_ignored_by_default() {
        let app = actix_test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(1), Arc::new(PeerAddressIdentity)))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let mut admitted = 0;
        for i in 0..5 {
            let req = from_peer("10.0.0.1")
                .insert_header(("x-forwarded-for", format!("1.2.3.{i}")))
                .to_request();
            if actix_test::call_service(&app, req).await.status() == StatusCode::OK {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[actix_web::test]
    async fn test_forwarded_for_is_used_when_trusted() {
        let app = actix_test::init_service(
            App::new()
                .wrap(
                    RateLimitMiddleware::new(limiter(1), Arc::new(PeerAddressIdentity))
                        .trust_forwarded_headers(true),
                )
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        for client in ["1.2.3.4", "1.2.3.5"] {
            let req = from_peer("10.0.0.1")
                .insert_header(("x-forwarded-for", client))
                .to_request();
            assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = from_peer("10.0.0.1")
            .insert_header(("x-forwarded-for", "1.2.3.4"))
            .to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(whole_seconds(Duration::from_secs(3)), 3);
        assert_eq!(whole_seconds(Duration::ZERO), 1);
    }
}
