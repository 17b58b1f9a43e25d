use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::{ConflictInfo, Resolution, ResolutionMethod};
use crate::services::resolver::reconstruct;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

impl LlmRole {
    fn as_str(&self) -> &'static str {
        match self {
            LlmRole::System => "system",
            LlmRole::User => "user",
            LlmRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: LlmRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmComplexity {
    Trivial,
    Standard,
    Complex,
}

/// Injected at engine construction. The engine never inspects token counts,
/// rate limits, or model identity behind this trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage], complexity: LlmComplexity) -> Result<String>;
}

const SYSTEM_PROMPT: &str = "You resolve git merge conflicts. Preserve all content from both \
versions. Maintain the original formatting. Add incoming content at its natural location. \
Output only the merged region, nothing else.";

fn build_prompt(conflict: &ConflictInfo, refinements: &[String]) -> Vec<ChatMessage> {
    let region = &conflict.regions[0];
    let mut user = format!(
        "File: {}\n\n{}\n\nVERSION A (current):\n{}\n\nVERSION B (incoming):\n{}\n\n{}",
        conflict.file_path,
        region.context_before.join("\n"),
        region.ours.join("\n"),
        region.theirs.join("\n"),
        region.context_after.join("\n"),
    );

    if !refinements.is_empty() {
        user.push_str("\n\nAdditional instructions:\n");
        for (i, refinement) in refinements.iter().enumerate() {
            user.push_str(&format!("{}. {}\n", i + 1, refinement));
        }
    }

    vec![
        ChatMessage {
            role: LlmRole::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: LlmRole::User,
            content: user,
        },
    ]
}

/// Strips a single surrounding markdown code fence, if present.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_lang = rest.splitn(2, '\n').nth(1).unwrap_or(rest);
        without_lang.strip_suffix("```").unwrap_or(without_lang).trim().to_string()
    } else {
        trimmed.to_string()
    }
}

pub async fn resolve_semantic(
    client: &dyn LlmClient,
    conflict: &ConflictInfo,
    refinements: &[String],
) -> Resolution {
    if conflict.regions.len() != 1 {
        return Resolution::failure(ResolutionMethod::Semantic, "too complex for semantic resolution");
    }
    let region = &conflict.regions[0];
    let messages = build_prompt(conflict, refinements);

    let response = match client.generate(&messages, LlmComplexity::Standard).await {
        Ok(text) => text,
        Err(e) => return Resolution::failure(ResolutionMethod::Semantic, e.to_string()),
    };

    let cleaned = strip_code_fence(&response);
    if cleaned.is_empty() {
        return Resolution::failure(ResolutionMethod::Semantic, "llm returned an empty response");
    }

    let merged_lines: Vec<String> = cleaned.lines().map(|l| l.to_string()).collect();
    let content = reconstruct(conflict, region, &merged_lines);
    Resolution::success(ResolutionMethod::Semantic, content)
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

/// Default, swappable `LlmClient`. Not wired in by default — tests and the
/// facade's default construction use a fake instead.
pub struct AnthropicLlmClient {
    api_key: String,
    model: String,
}

impl AnthropicLlmClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        AnthropicLlmClient {
            api_key: api_key.into(),
            model: "claude-3-5-sonnet-latest".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl LlmClient for AnthropicLlmClient {
    async fn generate(&self, messages: &[ChatMessage], _complexity: LlmComplexity) -> Result<String> {
        let system = messages
            .iter()
            .find(|m| m.role == LlmRole::System)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let turns: Vec<AnthropicMessage> = messages
            .iter()
            .filter(|m| m.role != LlmRole::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 2000,
            system,
            messages: turns,
        };

        let client = reqwest::Client::new();
        let response = client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::LlmError {
                cause: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(EngineError::LlmError {
                cause: format!("anthropic api error ({status}): {body}"),
            });
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| EngineError::LlmError {
            cause: format!("failed to parse response: {e}"),
        })?;

        parsed
            .content
            .first()
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(EngineError::LlmEmpty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeClient {
        response: String,
    }

    #[async_trait]
    impl LlmClient for FakeClient {
        async fn generate(&self, _messages: &[ChatMessage], _complexity: LlmComplexity) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn generate(&self, _messages: &[ChatMessage], _complexity: LlmComplexity) -> Result<String> {
            Err(EngineError::LlmUnavailable)
        }
    }

    fn conflict_with(ours: Vec<&str>, theirs: Vec<&str>) -> ConflictInfo {
        use crate::models::ConflictRegion;
        let raw = format!(
            "<<<<<<< HEAD\n{}\n=======\n{}\n>>>>>>> branch\n",
            ours.join("\n"),
            theirs.join("\n")
        );
        ConflictInfo {
            file_path: "FILE.md".to_string(),
            base_content: None,
            ours_content: None,
            theirs_content: None,
            raw_content: raw,
            regions: vec![ConflictRegion {
                start_line: 0,
                ours: ours.into_iter().map(|s| s.to_string()).collect(),
                theirs: theirs.into_iter().map(|s| s.to_string()).collect(),
                context_before: vec![],
                context_after: vec![],
            }],
        }
    }

    #[test]
    fn test_strip_code_fence_removes_fence() {
        let text = "```\nmerged content\n```";
        assert_eq!(strip_code_fence(text), "merged content");
    }

    #[test]
    fn test_strip_code_fence_noop_without_fence() {
        let text = "merged content";
        assert_eq!(strip_code_fence(text), "merged content");
    }

    #[tokio::test]
    async fn test_resolve_semantic_success() {
        let client = FakeClient {
            response: "Beta\nGamma".to_string(),
        };
        let conflict = conflict_with(vec!["Beta"], vec!["Gamma"]);
        let resolution = resolve_semantic(&client, &conflict, &[]).await;
        assert!(resolution.ok);
        assert_eq!(resolution.merged_content.unwrap(), "Beta\nGamma\n");
    }

    #[tokio::test]
    async fn test_resolve_semantic_empty_response_fails() {
        let client = FakeClient {
            response: String::new(),
        };
        let conflict = conflict_with(vec!["Beta"], vec!["Gamma"]);
        let resolution = resolve_semantic(&client, &conflict, &[]).await;
        assert!(!resolution.ok);
    }

    #[tokio::test]
    async fn test_resolve_semantic_propagates_client_error() {
        let conflict = conflict_with(vec!["Beta"], vec!["Gamma"]);
        let resolution = resolve_semantic(&FailingClient, &conflict, &[]).await;
        assert!(!resolution.ok);
        assert_eq!(resolution.explanation.as_deref(), Some("llm client unavailable"));
    }

    #[tokio::test]
    async fn test_resolve_semantic_multi_region_refused() {
        let mut conflict = conflict_with(vec!["a"], vec!["b"]);
        conflict.regions.push(conflict.regions[0].clone());
        let client = FakeClient {
            response: "x".to_string(),
        };
        let resolution = resolve_semantic(&client, &conflict, &[]).await;
        assert!(!resolution.ok);
    }
}
