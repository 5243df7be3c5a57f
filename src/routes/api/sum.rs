use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::Json,
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::memos::json_rejection;
use crate::{error::Result, server::AppState};

pub fn create_sum_routes() -> Router<AppState> {
    Router::new().route("/summarize", post(summarize_memo))
}

#[derive(Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub success: bool,
}

async fn summarize_memo(
    State(state): State<AppState>,
    body: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>> {
    let Json(req) = body.map_err(json_rejection)?;
    let summary = state
        .summary_service
        .summarize(&req.title, &req.content)
        .await?;

    Ok(Json(SummarizeResponse {
        summary,
        success: true,
    }))
}
