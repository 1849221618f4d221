mod dto;
mod error;
mod handlers;
pub mod middleware;
pub mod recovery;
mod routes;

pub use error::AppError;
pub use middleware::{compose, BoxedHandler, CorrelationId, Middleware};
pub use recovery::{FaultLogger, RecoveryLayer, TracingFaultLogger};
pub use routes::{create_router, AppState};
