//! Repartition endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use historydb::RepartitionReport;

use super::{activity_key, required, ApiError};
use crate::{models::*, AppState};

/// `POST /repartition`
pub async fn repartition(
    State(state): State<AppState>,
    Query(params): Query<RepartitionParams>,
) -> Result<Json<RepartitionReport>, ApiError> {
    let key = activity_key(params.key, params.timestamp)?;
    let chunks = required(params.chunks, "chunks")?;

    let report = match params.new_key.as_deref() {
        Some(new_key) if !new_key.is_empty() => {
            state
                .provider
                .repartition_activity_to(key, new_key, chunks)
                .await?
        }
        _ => state.provider.repartition_activity(key, chunks).await?,
    };
    Ok(Json(report))
}
