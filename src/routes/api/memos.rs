use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde_json::{Value, json};

use crate::{
    error::{AppError, Result},
    memo_models::{Memo, MemoFormData, MemoList, MemoQuery, MemoUpdateRequest},
    server::AppState,
};

pub fn create_memo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/memos",
            get(list_memos).post(create_memo).delete(clear_memos),
        )
        .route(
            "/memos/{capture}",
            get(get_memo).patch(update_memo).delete(delete_memo),
        )
}

async fn list_memos(
    State(state): State<AppState>,
    query: std::result::Result<Query<MemoQuery>, QueryRejection>,
) -> Result<Json<MemoList>> {
    // 不正なカテゴリ等は {error} 形式の 400 で返す
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let memos = state.memo_service.list(&query).await?;
    Ok(Json(MemoList { memos }))
}

async fn create_memo(
    State(state): State<AppState>,
    body: std::result::Result<Json<MemoFormData>, JsonRejection>,
) -> Result<(StatusCode, Json<Memo>)> {
    let Json(req) = body.map_err(json_rejection)?;
    let memo = state.memo_service.create(req).await?;
    Ok((StatusCode::CREATED, Json(memo)))
}

async fn get_memo(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Memo>> {
    let memo = state
        .memo_service
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Memo {} not found", id)))?;
    Ok(Json(memo))
}

async fn update_memo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<MemoUpdateRequest>, JsonRejection>,
) -> Result<Json<Memo>> {
    let Json(req) = body.map_err(json_rejection)?;
    let memo = state.memo_service.update(&id, req).await?;
    Ok(Json(memo))
}

async fn delete_memo(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    state.memo_service.delete(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Memo deletion completed: {id}")
    })))
}

async fn clear_memos(State(state): State<AppState>) -> Result<Json<Value>> {
    let deleted = state.memo_service.clear_all().await?;
    Ok(Json(json!({
        "status": "success",
        "deleted": deleted
    })))
}

/// axum の 422 テキストではなく {error} 形式の 400 にする
pub(super) fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}
