//! Gemini outbound adapter.
//!
//! This module provides a thin HTTP implementation of the `ModelClient`
//! port for complete and streamed generations.

mod dto;
mod http_client;
mod sse;

pub use http_client::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiHttpClient};
