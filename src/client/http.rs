use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::client::{ClientError, MemoGateway, SummaryGateway};
use crate::memo_models::{Memo, MemoFormData, MemoList, MemoQuery, MemoUpdateRequest};

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct SummarizeBody<'a> {
    title: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SummarizeReply {
    summary: String,
}

/// HTTP client for the memo API (`/api/memos`, `/api/summarize`).
#[derive(Clone)]
pub struct HttpMemoClient {
    base_url: String,
    http: Client,
}

impl HttpMemoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// 2xx 以外は `{error}` ボディを読んで `ClientError::Api` にする
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.text().await {
            Ok(text) => serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text),
            Err(e) => e.to_string(),
        };
        error!(%status, %message, "Memo API request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MemoGateway for HttpMemoClient {
    async fn list(&self, query: Option<&MemoQuery>) -> Result<Vec<Memo>, ClientError> {
        let mut request = self.http.get(self.url("/memos"));
        if let Some(query) = query {
            request = request.query(&[("category", query.category.to_string())]);
            if let Some(term) = query.search_query.as_deref() {
                request = request.query(&[("searchQuery", term)]);
            }
        }

        let response = Self::check(request.send().await?).await?;
        let list: MemoList = response.json().await?;
        debug!(count = list.memos.len(), "Fetched memos");
        Ok(list.memos)
    }

    async fn get(&self, id: &str) -> Result<Option<Memo>, ClientError> {
        let response = self.http.get(self.url(&format!("/memos/{}", id))).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn create(&self, form: &MemoFormData) -> Result<Memo, ClientError> {
        let response = self.http.post(self.url("/memos")).json(form).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn update(
        &self,
        id: &str,
        form: &MemoFormData,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Memo, ClientError> {
        let body = MemoUpdateRequest {
            form: form.clone(),
            expected_updated_at,
        };
        let response = self
            .http
            .patch(self.url(&format!("/memos/{}", id)))
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/memos/{}", id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), ClientError> {
        let response = self.http.delete(self.url("/memos")).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl SummaryGateway for HttpMemoClient {
    async fn summarize(&self, title: &str, content: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/summarize"))
            .json(&SummarizeBody { title, content })
            .send()
            .await?;
        let response = Self::check(response).await?;
        let reply: SummarizeReply = response.json().await?;
        Ok(reply.summary)
    }
}
