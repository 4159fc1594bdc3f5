use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::result::ResultResponse;

#[derive(Debug, Deserialize)]
struct ResultFilter {
    #[serde(default)]
    #[serde(alias = "userId")]
    user_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_results)).route("/:result_id", get(get_result))
}

async fn list_results(
    Query(page): Query<PageQuery>,
    Query(filter): Query<ResultFilter>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ResultResponse>>, ApiError> {
    // Students see their own history; admins may inspect any user or all.
    let user_filter = if user.role == UserRole::Admin {
        filter.user_id
    } else {
        Some(user.id.clone())
    };

    let items = repositories::results::list(
        state.db(),
        user_filter.as_deref(),
        page.skip,
        page.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    let total_count = repositories::results::count(state.db(), user_filter.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count results"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(ResultResponse::from_db).collect(),
        total_count,
        skip: page.skip,
        limit: page.limit,
    }))
}

async fn get_result(
    Path(result_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ResultResponse>, ApiError> {
    let result = repositories::results::find_by_id(state.db(), &result_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?;

    let Some(result) = result else {
        return Err(ApiError::NotFound("Result not found".to_string()));
    };

    if result.user_id != user.id && user.role != UserRole::Admin {
        return Err(ApiError::Forbidden("Result belongs to another user"));
    }

    Ok(Json(ResultResponse::from_db(result)))
}
