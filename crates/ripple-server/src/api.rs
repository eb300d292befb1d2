//! Channel REST API.
//!
//! CRUD surface for the channel directory: create/list channels and read or
//! append message history. Posting here writes history only; realtime
//! delivery goes through the WebSocket ingress.

use crate::app::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Request body for creating a channel.
#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    #[serde(default)]
    pub name: String,
}

/// Request body for appending a message.
#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// `GET /api/channels`
pub async fn list_channels(State(state): State<Arc<AppState>>) -> Response {
    Json(state.directory.list_channels().await).into_response()
}

/// `POST /api/channels`
pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateChannelRequest>,
) -> Response {
    if req.name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Channel name is required").into_response();
    }

    let channel = state.directory.create_channel(&req.name).await;
    debug!(channel = %channel.id, name = %channel.name, "Channel created");
    (StatusCode::CREATED, Json(channel)).into_response()
}

/// `GET /api/channels/:id`
pub async fn get_channel(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Response {
    match state.directory.get_channel(&channel_id).await {
        Some(channel) => Json(channel).into_response(),
        None => (StatusCode::NOT_FOUND, "Channel not found").into_response(),
    }
}

/// `GET /api/channels/:id/messages?page&limit`
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state
        .directory
        .messages(&channel_id, query.page, query.limit)
        .await
    {
        Some(page) => Json(page).into_response(),
        None => (StatusCode::NOT_FOUND, "Channel not found").into_response(),
    }
}

/// `POST /api/channels/:id/messages`
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    Json(req): Json<CreateMessageRequest>,
) -> Response {
    if req.content.is_empty() {
        return (StatusCode::BAD_REQUEST, "Message content is required").into_response();
    }
    if req.author.is_empty() {
        return (StatusCode::BAD_REQUEST, "Author is required").into_response();
    }

    match state
        .directory
        .append_message(&channel_id, &req.author, &req.content)
        .await
    {
        Some(message) => (StatusCode::CREATED, Json(message)).into_response(),
        None => (StatusCode::NOT_FOUND, "Channel not found").into_response(),
    }
}
