//! Route-template resolution — the framework-adapter seam.
//!
//! The middleware labels metrics and names spans by the matched route
//! template (`/items/{id}`), never the concrete path, to keep cardinality
//! bounded. A framework binding communicates the template by inserting a
//! [`RouteTemplate`] extension into the request; for axum routers the
//! `MatchedPath` extension the router itself inserts is used as a fallback,
//! so no extra wiring is needed there.

use std::sync::Arc;

use axum::extract::MatchedPath;
use http::Request;

/// Matched route template of a request, inserted as a request extension by a
/// framework adapter.
#[derive(Clone, Debug)]
pub struct RouteTemplate(Arc<str>);

impl RouteTemplate {
    pub fn new(template: impl Into<Arc<str>>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolves the route template for a request, if any framework adapter
/// provided one.
pub fn route_template<B>(request: &Request<B>) -> Option<String> {
    if let Some(template) = request.extensions().get::<RouteTemplate>() {
        return Some(template.as_str().to_owned());
    }
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
}
