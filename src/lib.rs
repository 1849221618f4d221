pub mod api;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{
    compose, create_router, AppError, AppState, BoxedHandler, CorrelationId, FaultLogger,
    Middleware, RecoveryLayer, TracingFaultLogger,
};
pub use config::AppConfig;
pub use models::User;
pub use storage::{StorageError, UserRepository};
