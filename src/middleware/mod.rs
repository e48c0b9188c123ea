//! # Middleware
//!
//! Generic tower layers implementing the per-request instrumentation, plus
//! the route-template and excluded-URL machinery they share. The layers work
//! on plain `http` request/response types, so any tower-compatible framework
//! can host them; a framework binding only has to surface its route template
//! (see [`route::RouteTemplate`]).

pub mod excluded;
pub mod metrics;
pub mod route;
pub mod tracing;

pub use excluded::ExcludedUrls;
pub use metrics::{MetricsLayer, MetricsService};
pub use route::{route_template, RouteTemplate};
pub use tracing::{TracingLayer, TracingService};
