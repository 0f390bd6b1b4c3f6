//! Gemini `generateContent` provider.

use async_trait::async_trait;
use reqwest::Client;
use relay_common::{Content, GenerationConfig};
use serde::{Deserialize, Serialize};

use super::{ChatProvider, ChatSession};
use crate::error::{Error, Result};

const ROLES: [&str; 4] = ["user", "model", "function", "system"];

/// Finish reasons for which the reply text is withheld.
const BLOCKED_FINISH_REASONS: [&str; 3] = ["RECITATION", "SAFETY", "LANGUAGE"];

/// Gemini provider.
///
/// Talks to the Generative Language REST API. One `generateContent` call is
/// made per message; the session history is sent along with it.
pub struct GeminiProvider {
    http_client: Client,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ============================================================================
// ChatProvider implementation
// ============================================================================

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    async fn send_message(&self, session: &ChatSession<'_>, message: &str) -> Result<String> {
        validate_history(session.history)?;

        let mut contents = session.history.to_vec();
        contents.push(Content::user(message));

        let request = GenerateContentRequest {
            contents,
            generation_config: session.generation_config,
        };

        let url = self.url(session.model);

        tracing::debug!(
            "Sending generateContent request: {} history_len={}",
            url,
            session.history.len()
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", session.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| unreadable_error_body(status, e))?;
            return Err(Error::Upstream(describe_error(status, &body)));
        }

        let response: GenerateContentResponse = response.json().await?;
        response_text(response)
    }
}

/// Reject histories the Generative Language API would refuse.
fn validate_history(history: &[Content]) -> Result<()> {
    for (i, content) in history.iter().enumerate() {
        let role = content.role.as_deref().unwrap_or_default();
        if i == 0 && role != "user" {
            return Err(Error::BadRequest(format!(
                "first content should be with role 'user', got '{}'",
                role
            )));
        }
        if !ROLES.contains(&role) {
            return Err(Error::BadRequest(format!(
                "role '{}' is not one of {:?}",
                role, ROLES
            )));
        }
        if content.parts.is_empty() {
            return Err(Error::BadRequest(format!(
                "content at index {} has no parts",
                i
            )));
        }
    }
    Ok(())
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(kind) => format!("[{} {}] {}", status.as_u16(), kind, envelope.error.message),
            None => format!("[{}] {}", status.as_u16(), envelope.error.message),
        },
        Err(_) => format!("[{}] {}", status.as_u16(), body),
    }
}

fn unreadable_error_body(
    status: reqwest::StatusCode,
    err: impl std::fmt::Display,
) -> Error {
    Error::Upstream(format!(
        "[{}] failed to read error body: {}",
        status.as_u16(),
        err
    ))
}

/// Concatenated text of the first candidate.
fn response_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::Upstream(format!(
                "response was blocked due to {}",
                reason
            )));
        }
        return Ok(String::new());
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return Err(Error::Upstream(format!(
                "candidate was blocked due to {}",
                reason
            )));
        }
    }

    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_url_normalization() {
        let provider = GeminiProvider::new("http://localhost:9000/");
        assert_eq!(
            provider.url("gemini-1.5-pro"),
            "http://localhost:9000/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi "},{"text":"there"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(response_text(response).unwrap(), "Hi there");
    }

    #[test]
    fn test_response_text_blocked_prompt() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        let err = response_text(response).unwrap_err();
        assert!(err.to_string().contains("response was blocked due to SAFETY"));
    }

    #[test]
    fn test_response_text_blocked_candidate() {
        let response = parse(r#"{"candidates":[{"finishReason":"RECITATION"}]}"#);
        let err = response_text(response).unwrap_err();
        assert!(err.to_string().contains("candidate was blocked due to RECITATION"));
    }

    #[test]
    fn test_response_text_language_is_blocked() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"bonjour"}]},"finishReason":"LANGUAGE"}]}"#,
        );
        let err = response_text(response).unwrap_err();
        assert!(err.to_string().contains("candidate was blocked due to LANGUAGE"));
    }

    #[test]
    fn test_response_text_other_finish_reasons_keep_text() {
        for reason in ["BLOCKLIST", "PROHIBITED_CONTENT", "SPII", "OTHER"] {
            let json = format!(
                r#"{{"candidates":[{{"content":{{"parts":[{{"text":"kept"}}]}},"finishReason":"{}"}}]}}"#,
                reason
            );
            assert_eq!(response_text(parse(&json)).unwrap(), "kept", "{}", reason);
        }
        let no_content = parse(r#"{"candidates":[{"finishReason":"PROHIBITED_CONTENT"}]}"#);
        assert_eq!(response_text(no_content).unwrap(), "");
    }

    #[test]
    fn test_unreadable_error_body_keeps_cause() {
        let err = unreadable_error_body(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "connection reset",
        );
        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(
            err.to_string(),
            "Provider request failed: [503] failed to read error body: connection reset"
        );
    }

    #[test]
    fn test_response_text_max_tokens_keeps_text() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"truncated"}]},"finishReason":"MAX_TOKENS"}]}"#,
        );
        assert_eq!(response_text(response).unwrap(), "truncated");
    }

    #[test]
    fn test_response_text_no_candidates() {
        assert_eq!(response_text(parse("{}")).unwrap(), "");
    }

    #[test]
    fn test_validate_history() {
        assert!(validate_history(&[]).is_ok());
        assert!(validate_history(&[Content::user("a"), Content::model("b")]).is_ok());

        let err = validate_history(&[Content::model("b")]).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        let err = validate_history(&[Content::user("a"), Content::new("bot", "b")]).unwrap_err();
        assert!(err.to_string().contains("'bot'"));

        let empty = Content {
            role: Some("user".to_string()),
            parts: vec![],
        };
        assert!(validate_history(&[empty]).is_err());
    }

    #[test]
    fn test_describe_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            describe_error(reqwest::StatusCode::BAD_REQUEST, body),
            "[400 INVALID_ARGUMENT] API key not valid."
        );
        assert_eq!(
            describe_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down"),
            "[502] upstream down"
        );
    }
}
