//! Client side of the memo app: the HTTP gateway to the API, the reactive
//! [`MemoStore`](store::MemoStore) and the view models the UI renders.

pub mod detail;
pub mod gateway;
pub mod http;
pub mod list;
pub mod store;

use thiserror::Error;

pub use detail::{DetailView, EscapeOutcome, SummaryRequest, SummaryState, ViewMode};
pub use gateway::{MemoGateway, SummaryGateway};
pub use http::HttpMemoClient;
pub use list::{ListRow, build_rows};
pub use store::{MemoStats, MemoStore, compute_stats, filter_memos};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; no request was sent.
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Validation(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}
