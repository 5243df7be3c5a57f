pub mod gemini_client;
mod memo_service;
mod summary_service;

pub use gemini_client::{GeminiClient, GenerationOptions, TextGenerator};
pub use memo_service::MemoService;
pub use summary_service::{SUMMARY_OPTIONS, SummaryService};
