//! HTTP handlers.

pub mod health;
pub mod metrics;
pub mod moderate;

pub use health::health_router;
pub use metrics::metrics_router;
pub use moderate::moderate_router;
