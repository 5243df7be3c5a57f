//! Personal memo service: a JSON API over a Postgres `memos` table with
//! Gemini-backed summaries, plus the client-side state store and view models
//! that drive the memo UI.

pub mod client;
pub mod config;
pub mod error;
pub mod memo_models;
pub mod repositories;
pub mod routes;
pub mod server;
pub mod services;
