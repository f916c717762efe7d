//! HTTP surface: router builder, generic handlers and middleware.

pub mod error;
pub mod handlers;
mod middleware;
mod state;
pub mod views;

pub use error::{ApiError, SimpleMessage, service_response};
pub use middleware::{API_KEY_HEADER, REQUEST_ID_HEADER, RequestContext};
pub use state::ResourceState;
pub use views::{MIME_JSON, MIME_XML, View, ViewError};

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    response::IntoResponse,
    routing::get,
};
use tracing::debug;

use crate::application::crud::CrudService;
use crate::domain::Resource;

use self::state::ApiKeyState;

/// Collects resources and builds the axum [`Router`] serving them.
///
/// Each resource mounted at `base` gets `GET|POST base` and
/// `GET|PUT|DELETE base/{id}`; other verbs on those paths answer 405.
pub struct ApiRouter {
    view: View,
    api_key: Option<Arc<str>>,
    routes: Router,
}

impl ApiRouter {
    pub fn new(view: View) -> Self {
        Self {
            view,
            api_key: None,
            routes: Router::new(),
        }
    }

    /// Require a matching `X-API-KEY` header on every request.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(Arc::from);
        self
    }

    pub fn resource<R: Resource>(mut self, base: &str, service: Arc<CrudService<R>>) -> Self {
        let base = base.trim_end_matches('/');
        let item = format!("{base}/{{id}}");
        let state = ResourceState::new(service, self.view);

        debug!(
            target = "skue::http",
            collection = R::COLLECTION,
            base,
            "mounting resource routes"
        );

        let routes = Router::new()
            .route(
                base,
                get(handlers::list::<R>)
                    .post(handlers::create::<R>)
                    .fallback(handlers::not_allowed::<R>),
            )
            .route(
                &item,
                get(handlers::read::<R>)
                    .put(handlers::update::<R>)
                    .delete(handlers::delete::<R>)
                    .fallback(handlers::not_allowed::<R>),
            )
            .with_state(state);

        self.routes = self.routes.merge(routes);
        self
    }

    pub fn build(self) -> Router {
        let view = self.view;
        let mut router = self
            .routes
            .fallback(move || async move { ApiError::not_found(view).into_response() });

        if let Some(key) = self.api_key {
            router = router.layer(axum_middleware::from_fn_with_state(
                ApiKeyState { key, view },
                middleware::require_api_key,
            ));
        }

        router
            .layer(axum_middleware::from_fn(middleware::log_responses))
            .layer(axum_middleware::from_fn(middleware::set_request_context))
    }
}
