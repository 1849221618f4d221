use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::header::HeaderValue,
    response::Response,
};
use tower::util::{service_fn, BoxCloneSyncService};
use tower::Service;
use tracing::info;
use uuid::Uuid;

/// A type-erased, clone-able request handler. Everything that flows through
/// the middleware chain — route handlers, composed chains, the recovery
/// wrapper — is one of these, which is what lets them nest arbitrarily.
pub type BoxedHandler = BoxCloneSyncService<Request<Body>, Response, Infallible>;

/// A transform from handler to handler. `wrap` must not mutate `next`; it
/// returns a new handler that delegates to it (or deliberately doesn't, for
/// short-circuiting middleware such as auth rejections).
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// Composes `middleware` around `handler` so that the first element of the
/// list is the outermost wrapper: its pre-delegation logic runs first and its
/// post-delegation logic runs last. Built by iterating in reverse and
/// successively wrapping. An empty list returns `handler` unchanged.
pub fn compose(handler: BoxedHandler, middleware: &[Arc<dyn Middleware>]) -> BoxedHandler {
    let mut handler = handler;
    for m in middleware.iter().rev() {
        handler = m.wrap(handler);
    }
    handler
}

/// Logs the method and path of every request before delegating.
#[derive(Clone, Debug, Default)]
pub struct RequestLog;

impl Middleware for RequestLog {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxCloneSyncService::new(service_fn(move |req: Request<Body>| {
            let mut next = next.clone();
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            async move {
                info!(%method, %path, "request received");
                next.call(req).await
            }
        }))
    }
}

#[derive(Clone, Debug)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Propagates an `X-Correlation-Id` header: reuses the caller's value when
/// present, generates one otherwise, exposes it to handlers as a request
/// extension, and reflects it on the response.
#[derive(Clone, Debug, Default)]
pub struct CorrelationIdMiddleware;

impl Middleware for CorrelationIdMiddleware {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxCloneSyncService::new(service_fn(move |mut req: Request<Body>| {
            let mut next = next.clone();
            let correlation_id = req
                .headers()
                .get("X-Correlation-Id")
                .and_then(|v| v.to_str().ok())
                .map(|s| CorrelationId(s.to_string()))
                .unwrap_or_else(CorrelationId::new);

            req.extensions_mut().insert(correlation_id.clone());

            async move {
                let mut response = next.call(req).await?;
                response.headers_mut().insert(
                    "X-Correlation-Id",
                    HeaderValue::from_str(&correlation_id.0)
                        .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
                );
                Ok(response)
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    type MarkerLog = Arc<Mutex<Vec<String>>>;

    /// Appends `<name>-enter` before delegating and `<name>-exit` after.
    struct Marker {
        name: &'static str,
        log: MarkerLog,
    }

    impl Middleware for Marker {
        fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
            let name = self.name;
            let log = Arc::clone(&self.log);
            BoxCloneSyncService::new(service_fn(move |req: Request<Body>| {
                let mut next = next.clone();
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(format!("{name}-enter"));
                    let response = next.call(req).await;
                    log.lock().unwrap().push(format!("{name}-exit"));
                    response
                }
            }))
        }
    }

    /// Responds 401 without ever invoking the wrapped handler.
    struct Reject;

    impl Middleware for Reject {
        fn wrap(&self, _next: BoxedHandler) -> BoxedHandler {
            BoxCloneSyncService::new(service_fn(|_req: Request<Body>| async {
                let mut response = Response::new(Body::from("rejected"));
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                Ok(response)
            }))
        }
    }

    fn echo_handler(log: MarkerLog) -> BoxedHandler {
        BoxCloneSyncService::new(service_fn(move |req: Request<Body>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("echo".to_string());
                Ok(Response::new(req.into_body()))
            }
        }))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_compose_runs_first_middleware_outermost() {
        let log: MarkerLog = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Marker { name: "log-a", log: Arc::clone(&log) }),
            Arc::new(Marker { name: "log-b", log: Arc::clone(&log) }),
        ];

        let handler = compose(echo_handler(Arc::clone(&log)), &chain);
        let response = handler.oneshot(get_request("hello")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "hello");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["log-a-enter", "log-b-enter", "echo", "log-b-exit", "log-a-exit"]
        );
    }

    #[tokio::test]
    async fn test_compose_empty_chain_is_identity() {
        let log: MarkerLog = Arc::new(Mutex::new(Vec::new()));
        let handler = compose(echo_handler(Arc::clone(&log)), &[]);

        let response = handler.oneshot(get_request("untouched")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "untouched");
        assert_eq!(*log.lock().unwrap(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_middleware_and_handler() {
        let log: MarkerLog = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Marker { name: "outer", log: Arc::clone(&log) }),
            Arc::new(Reject),
            Arc::new(Marker { name: "inner", log: Arc::clone(&log) }),
        ];

        let handler = compose(echo_handler(Arc::clone(&log)), &chain);
        let response = handler.oneshot(get_request("")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*log.lock().unwrap(), vec!["outer-enter", "outer-exit"]);
    }

    #[tokio::test]
    async fn test_composed_handler_is_reusable() {
        let log: MarkerLog = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(Marker { name: "m", log: Arc::clone(&log) })];
        let handler = compose(echo_handler(Arc::clone(&log)), &chain);

        for _ in 0..2 {
            let response = handler.clone().oneshot(get_request("again")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(log.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_correlation_id_is_generated_and_reflected() {
        let log: MarkerLog = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(CorrelationIdMiddleware)];
        let handler = compose(echo_handler(log), &chain);

        let response = handler.oneshot(get_request("")).await.unwrap();

        assert!(response.headers().contains_key("X-Correlation-Id"));
    }

    #[tokio::test]
    async fn test_correlation_id_reuses_caller_value() {
        let log: MarkerLog = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(CorrelationIdMiddleware)];
        let handler = compose(echo_handler(log), &chain);

        let request = Request::builder()
            .method("GET")
            .uri("/")
            .header("X-Correlation-Id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = handler.oneshot(request).await.unwrap();

        assert_eq!(response.headers()["X-Correlation-Id"], "abc-123");
    }
}
