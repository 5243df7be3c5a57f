use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GeminiConfig;
use crate::error::{AppError, Result};

/// 生成パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// テキスト生成 API の抽象。`Ok(None)` はモデルがテキストを返さなかったことを表す
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<Option<String>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// 最初の候補のテキストを連結して返す
    fn first_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    endpoint: String,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }

    fn build_request_body<'a>(
        prompt: &'a str,
        options: GenerationOptions,
    ) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: options.max_output_tokens,
                temperature: options.temperature,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<Option<String>> {
        // APIキーの確認
        if self.api_key.trim().is_empty() {
            return Err(AppError::Configuration("GEMINI_API_KEY is not set".to_string()));
        }

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling Gemini generateContent");
        let response = self
            .http
            .post(self.url())
            .json(&Self::build_request_body(prompt, options))
            .send()
            .await
            .map_err(|e| {
                // URL にキーが含まれるので外す
                let e = e.without_url();
                error!(error = %e, "Gemini request failed");
                AppError::Upstream(format!("Failed to send request: {}", e))
            })?;

        // ステータスコードチェック
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "Gemini API returned an error");
            return Err(AppError::Upstream(format!(
                "Gemini API error: status={}, body={}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "Failed to parse Gemini response");
            AppError::Upstream(format!("Failed to parse response: {}", e))
        })?;

        Ok(parsed.first_text())
    }
}
