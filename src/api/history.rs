//! History ledger endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        history::{HistoryQuery, PublicHistoryItem},
        HistoryEntry,
    },
};

use super::{students::LimitQuery, AuthenticatedUser};

/// History visible to the caller
///
/// Administrators see everything, teachers the students of their classes,
/// students only themselves.
#[utoipa::path(
    get,
    path = "/history",
    tag = "history",
    security(("bearer_auth" = [])),
    params(HistoryQuery),
    responses(
        (status = 200, description = "Newest first", body = Vec<HistoryEntry>)
    )
)]
pub async fn query_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let entries = state.services.history.query(&claims, &query).await?;
    Ok(Json(entries))
}

/// Anonymous feed of recent check-outs
#[utoipa::path(
    get,
    path = "/history/public",
    tag = "history",
    params(LimitQuery),
    responses(
        (status = 200, description = "Titles and timestamps only", body = Vec<PublicHistoryItem>)
    )
)]
pub async fn public_feed(
    State(state): State<crate::AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<PublicHistoryItem>>> {
    Ok(Json(state.services.history.public_feed(query.limit).await?))
}
