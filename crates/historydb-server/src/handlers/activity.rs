//! Activity endpoints

use axum::{
    extract::{FromRequest, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use std::collections::BTreeMap;

use super::{activity_key, now_secs, required, ApiError};
use crate::{models::*, AppState};

/// `GET /add_activity`
pub async fn add_activity(
    State(state): State<AppState>,
    Query(params): Query<AddActivityParams>,
) -> Result<Response, ApiError> {
    record_activity(&state, params).await
}

/// `POST /add_activity`: form body when one is sent, query string otherwise.
pub async fn add_activity_form(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let params = if is_form(request.headers()) {
        let Form(params) = Form::<AddActivityParams>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        params
    } else {
        let Query(params) = Query::<AddActivityParams>::try_from_uri(request.uri())
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        params
    };
    record_activity(&state, params).await
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

async fn record_activity(state: &AppState, params: AddActivityParams) -> Result<Response, ApiError> {
    let user = required(params.user.filter(|u| !u.is_empty()), "user")?;
    let data = required(params.data, "data")?;
    let time = params.timestamp.unwrap_or_else(now_secs);

    tracing::debug!(
        user = %user,
        time,
        size = data.len(),
        key = ?params.key,
        "Add user activity"
    );

    let outcome = state
        .provider
        .add_user_activity(&user, time, data, params.key.as_deref())
        .await;

    if let Err(e) = &outcome.log {
        tracing::warn!(user = %user, error = %e, "Failed to append user log");
    }
    if let Err(e) = &outcome.statistics {
        tracing::warn!(user = %user, error = %e, "Failed to update activity");
    }

    let status = if outcome.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = AddActivityResponse {
        log_written: outcome.log_written(),
        statistics_updated: outcome.statistics_updated(),
    };
    Ok((status, Json(body)).into_response())
}

/// `GET /get_active_users`
pub async fn get_active_users(
    State(state): State<AppState>,
    Query(params): Query<ActiveUsersParams>,
) -> Result<Json<BTreeMap<String, u32>>, ApiError> {
    let key = activity_key(params.key, params.timestamp)?;
    tracing::debug!(key = ?key, "Get active users");

    let users = state.provider.get_active_users(key).await?;
    Ok(Json(users))
}
