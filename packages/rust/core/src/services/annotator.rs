//! Page annotation through an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use sourcepack_shared::{Result, SourcePackError};

use super::{PageAnnotation, PageAnnotator};

const SERVICE: &str = "annotation";

const SYSTEM_PROMPT: &str = "You write metadata for documentation pages. \
Reply with a JSON object of the form {\"title\": string, \"description\": string} and nothing else.";

/// Chat-completions backed [`PageAnnotator`].
#[derive(Debug, Clone)]
pub struct ChatAnnotator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct AnnotationPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ChatAnnotator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::with_client(
            sourcepack_shared::http::build_client()?,
            base_url,
            api_key,
            model,
        ))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

/// User prompt for one page.
fn annotation_prompt(url: &str, excerpt: &str) -> String {
    format!(
        "Page URL: {url}\n\n\
         Write a title of 3 to 8 words and a description of exactly 9 to 10 words \
         summarizing what this page covers.\n\n\
         Page content:\n{excerpt}"
    )
}

/// Parse the model's reply, tolerating a fenced code block around the JSON.
fn parse_annotation(content: &str) -> Result<PageAnnotation> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let payload: AnnotationPayload = serde_json::from_str(json)
        .map_err(|e| SourcePackError::service(SERVICE, format!("malformed annotation: {e}")))?;

    let clean = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(PageAnnotation {
        title: clean(payload.title),
        description: clean(payload.description),
    })
}

#[async_trait]
impl PageAnnotator for ChatAnnotator {
    #[instrument(skip_all, fields(url = url, model = %self.model))]
    async fn annotate(&self, url: &str, excerpt: &str) -> Result<PageAnnotation> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let prompt = annotation_prompt(url, excerpt);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourcePackError::service(SERVICE, format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourcePackError::service(
                SERVICE,
                format!("{endpoint} returned HTTP {}", status.as_u16()),
            ));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SourcePackError::service(SERVICE, format!("invalid response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SourcePackError::service(SERVICE, "no response content"))?;

        debug!(chars = content.len(), "annotation received");
        parse_annotation(&content)
    }
}
