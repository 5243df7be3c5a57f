use axum::Router;

use crate::server::AppState;

mod memos;
mod sum;

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .merge(memos::create_memo_routes())
        .merge(sum::create_sum_routes())
}
