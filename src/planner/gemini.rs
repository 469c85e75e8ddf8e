use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{ChapterRequest, PlanResult, Planner, TokenUsage};
use crate::consts::DEFAULT_TEXT_MODEL;
use crate::error::{ApiError, truncate_body};
use crate::prompts::illustrate::build_illustrate_prompt;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const SERVICE: &str = "Gemini";

/// A planner that asks a Gemini model to place illustration markers.
pub struct GeminiPlanner {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiPlanner {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}:generateContent", self.model)
    }

    fn build_request(request: &ChapterRequest) -> ApiRequest {
        let prompt = build_illustrate_prompt(&request.chapter_name, &request.book_name);
        ApiRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart { text: prompt },
                    RequestPart {
                        text: request.content.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: json!({
                    "type": "OBJECT",
                    "properties": { "content": { "type": "STRING" } },
                    "required": ["content"],
                }),
            },
        }
    }

    fn parse_response(resp: ApiResponse) -> Result<PlanResult> {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            bail!(ApiError::UnexpectedResponse(format!(
                "Gemini blocked the chapter: {reason}"
            )));
        }

        let usage = resp.usage_metadata.map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        });

        let text: String = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            bail!(ApiError::UnexpectedResponse(
                "Gemini returned an empty response".into()
            ));
        }

        let content = parse_content(&text)?;
        Ok(PlanResult { content, usage })
    }
}

#[async_trait]
impl Planner for GeminiPlanner {
    async fn plan(&self, request: &ChapterRequest) -> Result<PlanResult> {
        let body = Self::build_request(request);

        debug!(
            model = %self.model,
            chapter = %request.chapter_name,
            chars = request.content.len(),
            "asking Gemini for illustration points"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                service: SERVICE,
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!(ApiError::Status {
                service: SERVICE,
                status: status.as_u16(),
                message: truncate_body(&text),
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .context("failed to decode Gemini response")?;

        Self::parse_response(api_resp)
    }
}

/// Pull the `content` field out of the model's JSON answer.
fn parse_content(text: &str) -> Result<String> {
    let json_str = extract_json(text);
    let answer: Answer = serde_json::from_str(json_str).map_err(|e| {
        ApiError::UnexpectedResponse(format!(
            "failed to parse Gemini answer as JSON: {e}\nraw: {}",
            truncate_body(text)
        ))
    })?;
    Ok(answer.content)
}

/// Extract JSON from text that may be wrapped in markdown code fences.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(after) = trimmed.strip_prefix("```json")
        && let Some(json) = after.strip_suffix("```")
    {
        return json.trim();
    }
    if let Some(after) = trimmed.strip_prefix("```")
        && let Some(json) = after.strip_suffix("```")
    {
        return json.trim();
    }

    trimmed
}

// --- API types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
struct Answer {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> ApiResponse {
        serde_json::from_value(json).unwrap()
    }

    fn chapter() -> ChapterRequest {
        ChapterRequest {
            book_name: "moby.epub".to_string(),
            chapter_name: "OEBPS/ch01.xhtml".to_string(),
            content: "<p>Call me Ishmael.</p>".to_string(),
        }
    }

    #[test]
    fn request_carries_prompt_then_chapter() {
        let body = serde_json::to_value(GeminiPlanner::build_request(&chapter())).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("moby.epub"));
        assert_eq!(parts[1]["text"], "<p>Call me Ishmael.</p>");
    }

    #[test]
    fn request_asks_for_json_schema() {
        let body = serde_json::to_value(GeminiPlanner::build_request(&chapter())).unwrap();
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(
            config["responseSchema"]["properties"]["content"]["type"],
            "STRING"
        );
    }

    #[test]
    fn parse_content_and_usage() {
        let inner = json!({ "content": "<p>x</p><!-- illustration: a whale -->" }).to_string();
        let resp = response(json!({
            "candidates": [{ "content": { "parts": [{ "text": inner }] } }],
            "usageMetadata": { "promptTokenCount": 120, "candidatesTokenCount": 30 }
        }));
        let plan = GeminiPlanner::parse_response(resp).unwrap();
        assert!(plan.content.contains("illustration: a whale"));
        assert_eq!(
            plan.usage,
            Some(TokenUsage {
                input_tokens: 120,
                output_tokens: 30
            })
        );
    }

    #[test]
    fn parse_joins_split_parts() {
        let resp = response(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "{\"content\": " },
                { "text": "\"joined\"}" }
            ] } }]
        }));
        let plan = GeminiPlanner::parse_response(resp).unwrap();
        assert_eq!(plan.content, "joined");
        assert!(plan.usage.is_none());
    }

    #[test]
    fn parse_blocked_prompt_fails() {
        let resp = response(json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "SAFETY" }
        }));
        let err = GeminiPlanner::parse_response(resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn parse_empty_fails() {
        let resp = response(json!({ "candidates": [] }));
        assert!(GeminiPlanner::parse_response(resp).is_err());
    }

    #[test]
    fn parse_content_fenced() {
        let text = "```json\n{\"content\": \"hello\"}\n```";
        assert_eq!(parse_content(text).unwrap(), "hello");
    }

    #[test]
    fn parse_content_rejects_non_json() {
        assert!(parse_content("Sure! Here is your chapter").is_err());
    }

    #[test]
    fn extract_json_plain() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn extract_json_with_plain_fence() {
        let input = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(input), r#"{"a": 1}"#);
    }

    #[test]
    fn extract_json_no_closing_fence_returns_as_is() {
        let input = "```json\n{\"a\": 1}";
        assert_eq!(extract_json(input), input.trim());
    }

    #[test]
    fn endpoint_uses_model() {
        let planner = GeminiPlanner::new("key".into(), Some("gemini-2.5-flash".into()));
        assert_eq!(
            planner.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
