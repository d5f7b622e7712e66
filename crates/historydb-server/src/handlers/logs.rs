//! User log endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use super::{required, ApiError};
use crate::{models::*, AppState};

/// `GET /get_user_logs`
///
/// One string per day bucket in range, lossy UTF-8.
pub async fn get_user_logs(
    State(state): State<AppState>,
    Query(params): Query<UserLogsParams>,
) -> Result<Json<UserLogsResponse>, ApiError> {
    let user = required(params.user, "user")?;
    let begin = required(params.begin_time, "begin_time")?;
    let end = required(params.end_time, "end_time")?;
    tracing::debug!(user = %user, begin, end, "Get user logs");

    let logs = state
        .provider
        .get_user_logs(&user, begin, end)
        .await?
        .iter()
        .map(|bucket| String::from_utf8_lossy(bucket).into_owned())
        .collect();

    Ok(Json(UserLogsResponse { logs }))
}
