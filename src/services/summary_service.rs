use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::{AppError, Result},
    services::gemini_client::{GenerationOptions, TextGenerator},
};

pub const SUMMARY_OPTIONS: GenerationOptions = GenerationOptions {
    max_output_tokens: 500,
    temperature: 0.7,
};

pub struct SummaryService {
    generator: Arc<dyn TextGenerator>,
}

impl SummaryService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// メモのタイトルと本文から要約を生成する。リトライはしない
    pub async fn summarize(&self, title: &str, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("Memo content is empty".to_string()));
        }

        let prompt = build_prompt(title, content);
        let summary = self
            .generator
            .generate(&prompt, SUMMARY_OPTIONS)
            .await?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        match summary {
            Some(summary) => {
                info!(summary_len = summary.len(), "Summary generated");
                Ok(summary)
            }
            None => {
                warn!("Model returned no summary text");
                Err(AppError::EmptyResult)
            }
        }
    }
}

// プロンプト
fn build_prompt(title: &str, content: &str) -> String {
    format!(
        "Summarize the following memo concisely. Condense its key content and main points into 3-5 sentences.\n\n\
         Title: {}\n\n\
         Content:\n{}\n\n\
         Summary:",
        title, content
    )
}
