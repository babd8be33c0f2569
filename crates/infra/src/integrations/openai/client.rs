//! Session summaries through the Chat Completions API.

use std::fmt::Write as _;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use skilltrail_core::enrichment::SessionSummarizer;
use skilltrail_domain::{
    GeneratedSessionSummary, LlmConfig, Result, SessionSummaryContext, SkillTrailError,
};
use tracing::{debug, info, instrument};

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, JsonSchema, OpenAIError,
    ResponseFormat,
};
use crate::http::HttpClient;

const MAX_TOKENS: u32 = 600;
const TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = "You summarize one work session of a software developer from \
    captured evidence. Write one or two factual sentences about what was done. Only mention \
    skills supported by the evidence. Choose category technical for hands-on coding, learning \
    for reading or research, exploration when both happen, other otherwise.";

/// Text-generation collaborator backed by OpenAI.
pub struct OpenAISessionSummarizer {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
}

impl OpenAISessionSummarizer {
    pub fn new(api_key: impl Into<String>, http_client: HttpClient) -> Self {
        let defaults = LlmConfig::default();
        Self {
            http_client,
            api_key: api_key.into(),
            model: defaults.model,
            api_url: defaults.api_url,
        }
    }

    /// Build from the `llm` section. A missing key yields an unconfigured
    /// summarizer that the enricher will skip.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let http_client = HttpClient::for_llm(config)?;
        Ok(Self::new(config.api_key.clone().unwrap_or_default(), http_client)
            .with_model(config.model.clone())
            .with_api_url(config.api_url.clone()))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    #[instrument(skip(self, context), fields(session_id = context.session_id))]
    pub async fn summarize(
        &self,
        context: &SessionSummaryContext,
    ) -> std::result::Result<GeneratedSessionSummary, OpenAIError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user", content: build_prompt(context) },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchema {
                    name: "session_summary",
                    schema: summary_schema(),
                    strict: true,
                },
            },
        };

        let request = self
            .http_client
            .request(Method::POST, &self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload);
        let response = self.http_client.send(request).await.map_err(OpenAIError::Http)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                401 | 403 => OpenAIError::Authentication(status),
                429 => OpenAIError::RateLimited,
                _ => OpenAIError::Api { status, message },
            });
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| OpenAIError::InvalidResponse(format!("unreadable body: {err}")))?;
        if let Some(usage) = &body.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "summary token usage"
            );
        }

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OpenAIError::InvalidResponse("response contained no content".into()))?;
        let summary: GeneratedSessionSummary = serde_json::from_str(&content)
            .map_err(|err| OpenAIError::InvalidResponse(format!("summary JSON: {err}")))?;

        info!(
            category = %summary.category,
            skills = summary.skills.len(),
            "session summary generated"
        );
        Ok(summary)
    }
}

#[async_trait]
impl SessionSummarizer for OpenAISessionSummarizer {
    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn generate_session_summary(
        &self,
        context: &SessionSummaryContext,
    ) -> Result<GeneratedSessionSummary> {
        self.summarize(context).await.map_err(SkillTrailError::from)
    }
}

fn summary_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "category": {
                "type": "string",
                "enum": ["technical", "learning", "exploration", "other"]
            },
            "skills": { "type": "array", "items": { "type": "string" } },
            "tags": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["summary", "category", "skills", "tags"],
        "additionalProperties": false
    })
}

/// Render the capped context as a plain-text prompt.
fn build_prompt(context: &SessionSummaryContext) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Session {} on {} ({}), mostly in {}.",
        context.session_id, context.date, context.time_range, context.primary_app
    );

    if !context.apps.is_empty() {
        prompt.push_str("\nApplications:\n");
        for app in &context.apps {
            let _ = writeln!(prompt, "- {} ({} min)", app.app_name, app.duration_ms / 60_000);
        }
    }

    if !context.diffs.is_empty() {
        prompt.push_str("\nCode changes:\n");
        for diff in &context.diffs {
            let _ = write!(
                prompt,
                "- {} [{}] +{} -{}",
                diff.file_name, diff.language, diff.lines_added, diff.lines_deleted
            );
            if let Some(insight) = &diff.insight {
                let _ = write!(prompt, ": {insight}");
            }
            prompt.push('\n');
        }
    }

    if !context.browser.is_empty() {
        prompt.push_str("\nPages visited:\n");
        for page in &context.browser {
            let _ = writeln!(prompt, "- {} | {}", page.domain, page.title);
        }
    }

    if !context.skills.is_empty() {
        let _ = writeln!(prompt, "\nDetected skills: {}", context.skills.join(", "));
    }

    if !context.memories.is_empty() {
        prompt.push_str("\nRelated earlier work:\n");
        for memory in &context.memories {
            let _ = writeln!(prompt, "- ({}) {}", memory.snippet_type, memory.content);
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use skilltrail_domain::{AppUsage, BrowserDigest, DiffDigest};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const COMPLETIONS_PATH: &str = "/v1/chat/completions";

    fn summarizer(server: &MockServer) -> OpenAISessionSummarizer {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .max_attempts(1)
            .build()
            .expect("http client");
        OpenAISessionSummarizer::new("test-key", http_client)
            .with_api_url(format!("{}{}", server.uri(), COMPLETIONS_PATH))
    }

    fn context() -> SessionSummaryContext {
        SessionSummaryContext {
            session_id: 7,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            time_range: "09:00-09:40".into(),
            primary_app: "code.exe".into(),
            apps: vec![AppUsage { app_name: "code.exe".into(), duration_ms: 35 * 60_000 }],
            diffs: vec![DiffDigest {
                file_name: "ingest.rs".into(),
                language: "rust".into(),
                lines_added: 40,
                lines_deleted: 3,
                insight: Some("batched inserts".into()),
            }],
            browser: vec![BrowserDigest { domain: "docs.rs".into(), title: "tokio".into() }],
            skills: vec!["Rust".into()],
            memories: vec![],
        }
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": content } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30 }
        }))
    }

    #[tokio::test]
    async fn parses_structured_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "response_format": { "type": "json_schema", "json_schema": { "strict": true } }
            })))
            .respond_with(completion(
                r#"{"summary":"Batched ingestion inserts","category":"technical",
                    "skills":["Rust"],"tags":["ingest"]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let summary = summarizer(&server).generate_session_summary(&context()).await.unwrap();

        assert_eq!(summary.summary, "Batched ingestion inserts");
        assert_eq!(summary.category, "technical");
        assert_eq!(summary.tags, vec!["ingest"]);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = summarizer(&server).summarize(&context()).await.unwrap_err();

        assert!(matches!(err, OpenAIError::Authentication(401)));
        assert!(matches!(SkillTrailError::from(err), SkillTrailError::Config(_)));
    }

    #[tokio::test]
    async fn rate_limit_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = summarizer(&server).summarize(&context()).await.unwrap_err();

        assert!(matches!(err, OpenAIError::RateLimited));
    }

    #[tokio::test]
    async fn non_json_content_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(completion("not json")).mount(&server).await;

        let err = summarizer(&server).summarize(&context()).await.unwrap_err();

        assert!(matches!(err, OpenAIError::InvalidResponse(_)));
    }

    #[test]
    fn blank_key_is_unconfigured() {
        let config = LlmConfig { api_key: Some("  ".into()), ..LlmConfig::default() };
        let summarizer = OpenAISessionSummarizer::from_config(&config).unwrap();
        assert!(!summarizer.is_configured());
    }

    #[test]
    fn prompt_lists_capped_evidence() {
        let prompt = build_prompt(&context());

        assert!(prompt.contains("mostly in code.exe"));
        assert!(prompt.contains("- code.exe (35 min)"));
        assert!(prompt.contains("- ingest.rs [rust] +40 -3: batched inserts"));
        assert!(prompt.contains("- docs.rs | tokio"));
        assert!(!prompt.contains("Related earlier work"));
    }
}
