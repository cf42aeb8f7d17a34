//! Short acknowledgement reply for a classified report.
//!
//! Generation is delegated to a local Ollama model. Callers go through
//! [`reply_or_fallback`], which never fails: any error or blank output yields
//! the canned acknowledgement instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Priority, OTHER_LABEL};
use crate::config::ReplyConfig;

/// Sent when generation is unavailable or fails.
pub const FALLBACK_REPLY: &str =
    "Hệ thống đã ghi nhận sự cố, bộ phận kỹ thuật sẽ xử lý trong thời gian sớm nhất.";

/// Replies longer than this many characters are cut and suffixed with "…".
pub const MAX_REPLY_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Cannot connect to Ollama at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Ollama returned error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Response parsing failed: {0}")]
    ResponseParsing(String),

    #[error("Empty reply")]
    Empty,
}

pub trait ReplyGenerator: Send + Sync {
    fn generate_reply(
        &self,
        description: &str,
        category: &str,
        priority: Priority,
    ) -> Result<String, ReplyError>;
}

/// Prompt for the dormitory-staff persona.
pub fn build_prompt(description: &str, category: &str, priority: Priority) -> String {
    format!(
        "Bạn là nhân viên quản lý ký túc xá.\n\
         Viết phản hồi ngắn gọn (1–2 câu) cho phản ánh dưới đây:\n\n\
         Nội dung: {description}\n\
         Loại sự cố: {category}\n\
         Mức độ ưu tiên: {priority}\n\n\
         Yêu cầu:\n\
         - Giọng điệu thân thiện, lịch sự, có trách nhiệm.\n\
         - Không dùng emoji hoặc ký tên."
    )
}

/// Generated reply, trimmed and capped, or [`FALLBACK_REPLY`].
/// A missing category is passed to the generator as "khác".
pub fn reply_or_fallback(
    generator: Option<&dyn ReplyGenerator>,
    description: &str,
    category: Option<&str>,
    priority: Priority,
) -> String {
    let Some(generator) = generator else {
        return FALLBACK_REPLY.to_string();
    };
    let category = category.unwrap_or(OTHER_LABEL);

    match generator.generate_reply(description, category, priority) {
        Ok(text) if !text.trim().is_empty() => truncate_reply(text.trim()),
        Ok(_) => {
            tracing::warn!(error = %ReplyError::Empty, "Reply generation degraded to fallback");
            FALLBACK_REPLY.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Reply generation degraded to fallback");
            FALLBACK_REPLY.to_string()
        }
    }
}

/// Cut to [`MAX_REPLY_CHARS`] characters (not bytes) and append "…".
pub fn truncate_reply(text: &str) -> String {
    if text.chars().count() <= MAX_REPLY_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_REPLY_CHARS).collect();
    format!("{}…", cut.trim_end())
}

// ═══════════════════════════════════════════════════════════
// Ollama
// ═══════════════════════════════════════════════════════════

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaReplyGenerator {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaReplyGenerator {
    pub fn new(config: &ReplyConfig) -> Result<Self, ReplyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReplyError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }
}

impl ReplyGenerator for OllamaReplyGenerator {
    fn generate_reply(
        &self,
        description: &str,
        category: &str,
        priority: Priority,
    ) -> Result<String, ReplyError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = build_prompt(description, category, priority);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ReplyError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                ReplyError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                ReplyError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReplyError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ReplyError::ResponseParsing(e.to_string()))?;

        tracing::debug!(model = %self.model, chars = parsed.response.chars().count(), "Reply generated");
        Ok(parsed.response)
    }
}

/// Mock generator for testing: returns a configured response.
pub struct MockReplyGenerator {
    response: Result<String, String>,
}

impl MockReplyGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

impl ReplyGenerator for MockReplyGenerator {
    fn generate_reply(
        &self,
        _description: &str,
        _category: &str,
        _priority: Priority,
    ) -> Result<String, ReplyError> {
        self.response.clone().map_err(ReplyError::HttpClient)
    }
}
