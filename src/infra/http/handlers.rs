//! Generic handlers mapping HTTP verbs onto [`CrudService`] calls.
//!
//! [`CrudService`]: crate::application::crud::CrudService

use axum::{
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::domain::Resource;

use super::error::{ApiError, MSG_DELETED, MSG_UPDATED, service_response};
use super::state::ResourceState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

pub async fn create<R: Resource>(
    State(state): State<ResourceState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let view = state.view;
    view.ensure_acceptable(&headers)
        .map_err(|err| ApiError::from_view(view, err))?;

    let resource: R = view
        .consume(&headers, &body)
        .map_err(|err| ApiError::from_view(view, err))?;

    let created = state
        .service
        .create(resource)
        .await
        .map_err(|err| ApiError::from_crud(view, err))?;

    Ok(view.produce(StatusCode::CREATED, &created))
}

pub async fn read<R: Resource>(
    State(state): State<ResourceState<R>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let view = state.view;
    view.ensure_acceptable(&headers)
        .map_err(|err| ApiError::from_view(view, err))?;

    let resource = state
        .service
        .read(&id)
        .await
        .map_err(|err| ApiError::from_crud(view, err))?;

    Ok(view.produce(StatusCode::OK, &resource))
}

pub async fn update<R: Resource>(
    State(state): State<ResourceState<R>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let view = state.view;
    view.ensure_acceptable(&headers)
        .map_err(|err| ApiError::from_view(view, err))?;

    let resource: R = view
        .consume(&headers, &body)
        .map_err(|err| ApiError::from_view(view, err))?;

    state
        .service
        .update(&id, resource)
        .await
        .map_err(|err| ApiError::from_crud(view, err))?;

    Ok(service_response(view, StatusCode::OK, MSG_UPDATED))
}

pub async fn delete<R: Resource>(
    State(state): State<ResourceState<R>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let view = state.view;
    view.ensure_acceptable(&headers)
        .map_err(|err| ApiError::from_view(view, err))?;

    state
        .service
        .delete(&id)
        .await
        .map_err(|err| ApiError::from_crud(view, err))?;

    Ok(service_response(view, StatusCode::OK, MSG_DELETED))
}

pub async fn list<R: Resource>(
    State(state): State<ResourceState<R>>,
    query: Result<Query<ListQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let view = state.view;
    view.ensure_acceptable(&headers)
        .map_err(|err| ApiError::from_view(view, err))?;

    let Query(query) = query.map_err(|err| {
        ApiError::new(
            "infra::http::handlers::list",
            view,
            StatusCode::BAD_REQUEST,
            format!("Invalid query: {}", err.body_text()),
        )
    })?;

    let resources = state
        .service
        .list(query.limit)
        .await
        .map_err(|err| ApiError::from_crud(view, err))?;

    Ok(view.produce(StatusCode::OK, &resources))
}

pub async fn not_allowed<R: Resource>(State(state): State<ResourceState<R>>) -> ApiError {
    ApiError::method_not_allowed(state.view)
}
