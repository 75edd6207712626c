use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use zeno_core::{CompletionBackend, CompletionRequest};

use crate::auth::AuthState;
use crate::config::LlmSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
    Offline,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAI),
            "offline" | "local" | "none" => Ok(Provider::Offline),
            other => bail!("unknown llm provider: {other} (expected gemini, openai, or offline)"),
        }
    }
}

/// Build the configured backend. `None` means run with the local scheduler only.
pub fn backend_from_config(llm: &LlmSection, auth: &AuthState) -> Result<Option<Arc<dyn CompletionBackend>>> {
    match Provider::parse(&llm.provider)? {
        Provider::Offline => Ok(None),
        Provider::Gemini => {
            let key = auth
                .gemini_key()
                .ok_or_else(|| anyhow!("missing Gemini key; run: zeno auth paste-gemini-key (or set GEMINI_API_KEY)"))?;
            Ok(Some(Arc::new(GeminiBackend::new(llm, key))))
        }
        Provider::OpenAI => {
            let key = auth
                .openai_key()
                .ok_or_else(|| anyhow!("missing OpenAI key; run: zeno auth paste-openai-key (or set OPENAI_API_KEY)"))?;
            Ok(Some(Arc::new(OpenAiBackend::new(llm, key))))
        }
    }
}

pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(llm: &LlmSection, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

pub fn gemini_request_body(request: &CompletionRequest, temperature: f32) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": {
            "temperature": temperature,
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        }
    })
}

/// Concatenate the text parts of the first candidate.
pub fn gemini_response_text(body: &Value) -> Result<String> {
    #[derive(Deserialize)]
    struct Resp {
        #[serde(default)]
        candidates: Vec<Candidate>,
    }

    #[derive(Deserialize)]
    struct Candidate {
        content: Option<Content>,
    }

    #[derive(Deserialize)]
    struct Content {
        #[serde(default)]
        parts: Vec<Part>,
    }

    #[derive(Deserialize)]
    struct Part {
        text: Option<String>,
    }

    let resp: Resp = serde_json::from_value(body.clone()).context("parse gemini response")?;
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("gemini returned no candidates"))?;

    let mut s = String::new();
    for p in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(t) = p.text {
            s.push_str(&t);
        }
    }
    Ok(s.trim().to_string())
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request_body(request, self.temperature))
            .send()
            .await
            .context("gemini request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("gemini error: {status} {txt}");
        }

        let body: Value = resp.json().await.context("read gemini response")?;
        gemini_response_text(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Any OpenAI-compatible chat completions endpoint.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(llm: &LlmSection, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            api_key,
        }
    }
}

pub fn openai_request_body(request: &CompletionRequest, model: &str, temperature: f32) -> Value {
    let system = format!(
        "Reply with a bare JSON array only, no prose, matching this schema: {}",
        request.response_schema
    );
    json!({
        "model": model,
        "temperature": temperature,
        "messages": [
            { "role": "system", "content": system },
            { "role": "user", "content": request.prompt },
        ],
    })
}

pub fn openai_response_text(body: &Value) -> Result<String> {
    #[derive(Deserialize)]
    struct Resp {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
    }

    let out: Resp = serde_json::from_value(body.clone()).context("parse openai response")?;
    let content = out
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();
    Ok(content.trim().to_string())
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&openai_request_body(request, &self.model, self.temperature))
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let body: Value = resp.json().await.context("read openai response")?;
        openai_response_text(&body)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
