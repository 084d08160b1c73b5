//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod page;
mod routes;

pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use page::{index, render_index, share, update, BroadcastResponse, UpdateQuery, UpdateRequest};
pub use routes::api_routes;
