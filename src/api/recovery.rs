use std::any::Any;
use std::backtrace::Backtrace;
use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::Request,
    http::header::{HeaderValue, CONTENT_TYPE},
    http::StatusCode,
    response::Response,
};
use futures::FutureExt;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};
use tracing::error;

use super::middleware::{BoxedHandler, Middleware};

/// Destination for fault records emitted by the recovery boundary.
pub trait FaultLogger: Send + Sync {
    fn log(&self, record: &str);
}

/// Default fault logger, emitting through the `tracing` pipeline.
#[derive(Clone, Debug, Default)]
pub struct TracingFaultLogger;

impl FaultLogger for TracingFaultLogger {
    fn log(&self, record: &str) {
        error!(fault = record, "handler panicked");
    }
}

#[derive(Clone)]
struct RecoveryConfig {
    logger: Arc<dyn FaultLogger>,
    print_backtrace: bool,
}

impl RecoveryConfig {
    /// Logs the fault and produces the fixed recovered response. Called at
    /// most once per request, at the single recovery boundary.
    fn recover(&self, panic: Box<dyn Any + Send>) -> Response {
        self.logger.log(&panic_message(&panic));
        if self.print_backtrace {
            self.logger.log(&Backtrace::force_capture().to_string());
        }
        fault_response()
    }
}

/// Converts any panic raised by the wrapped service into a fixed 500
/// response instead of tearing down the connection task. Apply it to the
/// whole router via [`Layer`], or to a single route as a [`Middleware`]:
///
/// ```ignore
/// let app = create_router(repository, StatusCode::NOT_FOUND)
///     .layer(RecoveryLayer::new().with_backtrace(true));
/// ```
///
/// Setters apply in call order; a later `with_logger` replaces an earlier
/// one. The configuration is frozen once the layer is applied.
#[derive(Clone)]
pub struct RecoveryLayer {
    config: RecoveryConfig,
}

impl RecoveryLayer {
    pub fn new() -> Self {
        Self {
            config: RecoveryConfig {
                logger: Arc::new(TracingFaultLogger),
                print_backtrace: false,
            },
        }
    }

    /// Routes fault records to `logger` instead of the default tracing one.
    pub fn with_logger(mut self, logger: Arc<dyn FaultLogger>) -> Self {
        self.config.logger = logger;
        self
    }

    /// Additionally logs a backtrace captured at the recovery boundary.
    pub fn with_backtrace(mut self, enabled: bool) -> Self {
        self.config.print_backtrace = enabled;
        self
    }
}

impl Default for RecoveryLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = RecoveryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoveryService {
            inner,
            config: self.config.clone(),
        }
    }
}

impl Middleware for RecoveryLayer {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxCloneSyncService::new(self.layer(next))
    }
}

#[derive(Clone)]
pub struct RecoveryService<S> {
    inner: S,
    config: RecoveryConfig,
}

impl<S> Service<Request<Body>> for RecoveryService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = self.config.clone();
        Box::pin(async move {
            // A handler can panic while constructing its future as well as
            // while the future is polled; both land here.
            let future = match std::panic::catch_unwind(AssertUnwindSafe(|| inner.call(req))) {
                Ok(future) => future,
                Err(panic) => return Ok(config.recover(panic)),
            };
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(response) => response,
                Err(panic) => Ok(config.recover(panic)),
            }
        })
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn fault_response() -> Response {
    let mut response = Response::new(Body::from("Internal server error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
