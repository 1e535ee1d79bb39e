use super::{Citation, Generation, Generator, TransportError};
use crate::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gemini `generateContent` client with the Google Search grounding tool always on
pub struct GeminiClient {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiMessage>,
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct GeminiMessage {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(std::time::Duration::from_secs(config.request_timeout_secs));
        }
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            api_base: config.gemini_api_base.trim_end_matches('/').to_string(),
            client: builder.build().expect("HTTP client"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Call Gemini with search grounding. One user turn, no history.
    pub async fn call(&self, prompt: &str) -> Result<Generation, TransportError> {
        if !self.is_configured() {
            return Err(TransportError::NotConfigured);
        }

        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model);

        let req = GeminiRequest {
            contents: vec![GeminiMessage {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: Some(prompt.to_string()) }],
            }],
            tools: vec![Tool { google_search: GoogleSearch {} }],
        };

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            return Err(TransportError::Status { status, body });
        }

        let data: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| TransportError::Envelope(e.to_string()))?;

        if let Some(usage) = &data.usage_metadata {
            debug!(
                "Gemini[{}]: {} tokens in, {} tokens out",
                self.model, usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(extract(data))
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Generation, TransportError> {
        self.call(prompt).await
    }
}

/// Text and citations of the first candidate. Missing text is an empty
/// string; chunks without a uri are dropped.
fn extract(data: GeminiResponse) -> Generation {
    let Some(first) = data.candidates.and_then(|c| c.into_iter().next()) else {
        return Generation::default();
    };

    let text = first
        .content
        .and_then(|c| c.parts)
        .map(|parts| parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    let citations = first
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| {
            let web = chunk.web?;
            let uri = web.uri.filter(|u| !u.trim().is_empty())?;
            Some(Citation { uri, title: web.title.unwrap_or_default() })
        })
        .collect();

    Generation { text, citations }
}
