use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::client::ClientError;
use crate::memo_models::{Memo, MemoFormData, MemoQuery};

/// Remote memo operations used by [`MemoStore`](crate::client::MemoStore).
#[async_trait]
pub trait MemoGateway: Send + Sync {
    async fn list(&self, query: Option<&MemoQuery>) -> Result<Vec<Memo>, ClientError>;
    async fn get(&self, id: &str) -> Result<Option<Memo>, ClientError>;
    async fn create(&self, form: &MemoFormData) -> Result<Memo, ClientError>;
    async fn update(
        &self,
        id: &str,
        form: &MemoFormData,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Memo, ClientError>;
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
    async fn clear_all(&self) -> Result<(), ClientError>;
}

#[async_trait]
pub trait SummaryGateway: Send + Sync {
    async fn summarize(&self, title: &str, content: &str) -> Result<String, ClientError>;
}
