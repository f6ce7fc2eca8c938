#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::Lines;
use tokio_util::io::StreamReader;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Author;
use crate::domain::models::Backend;
use crate::domain::models::BackendPrompt;
use crate::domain::models::ChatError;
use crate::domain::models::FragmentStream;
use crate::domain::models::GenerationConfig;
use crate::domain::models::SafetySetting;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Model {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<Model>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn new(role: &str, text: &str) -> Content {
        return Content {
            role: role.to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// Pulls the human readable message out of an API error body, falling back
/// to the raw body.
fn api_error_message(body: &str) -> String {
    if let Ok(res) = serde_json::from_str::<ApiErrorResponse>(body) {
        if !res.error.message.is_empty() {
            return res.error.message;
        }
    }

    return body.trim().to_string();
}

/// Decodes a single line of a `streamGenerateContent?alt=sse` body. Returns
/// `None` for lines that carry no text such as blank separators, keep-alive
/// comments, other SSE fields, or a final chunk with only a finish reason.
fn parse_stream_line(line: &str) -> Result<Option<String>, ChatError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let payload = match line.strip_prefix("data:") {
        Some(payload) => payload.trim(),
        None => return Ok(None),
    };
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let res: GenerateContentResponse = serde_json::from_str(payload).map_err(|err| {
        return ChatError::StreamInterrupted(format!("undecodable chunk from Gemini: {err}"));
    })?;

    if let Some(err) = res.error {
        return Err(ChatError::StreamInterrupted(format!(
            "Gemini returned {}: {}",
            err.code, err.message
        )));
    }

    if let Some(reason) = res.prompt_feedback.and_then(|feedback| return feedback.block_reason) {
        return Err(ChatError::RequestFailed(format!(
            "prompt was blocked by Gemini ({reason})"
        )));
    }

    let candidate = match res.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => return Ok(None),
    };

    let text = candidate
        .content
        .map(|content| {
            return content
                .parts
                .into_iter()
                .map(|part| return part.text)
                .collect::<String>();
        })
        .unwrap_or_default();

    if text.is_empty() {
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ChatError::StreamInterrupted(
                "reply was stopped by Gemini's safety filters (SAFETY)".to_string(),
            ));
        }
        return Ok(None);
    }

    return Ok(Some(text));
}

async fn next_fragment<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
) -> Result<Option<String>, ChatError> {
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| return ChatError::StreamInterrupted(err.to_string()))?
    {
        if let Some(text) = parse_stream_line(&line)? {
            return Ok(Some(text));
        }
    }

    return Ok(None);
}

/// The bare model name used in endpoint paths. `/model` accepts names with
/// or without the `models/` prefix the API lists them under.
fn model_name(model: &str) -> String {
    return model.trim().trim_start_matches("models/").to_string();
}

pub struct Gemini {
    url: String,
    token: String,
    timeout: String,
    generation: GenerationConfig,
    safety: Vec<SafetySetting>,
    system_prompt: String,
}

impl Gemini {
    pub fn from_config() -> Result<Gemini> {
        return Ok(Gemini {
            url: Config::get(ConfigKey::GeminiURL)
                .trim_end_matches('/')
                .to_string(),
            token: Config::get(ConfigKey::GeminiToken),
            timeout: Config::get(ConfigKey::BackendHealthCheckTimeout),
            generation: GenerationConfig::from_config()?,
            safety: SafetySetting::from_config()?,
            system_prompt: Config::get(ConfigKey::SystemPrompt),
        });
    }

    fn completion_request(&self, prompt: &BackendPrompt) -> CompletionRequest {
        let contents = prompt
            .turns()
            .iter()
            .map(|(author, text)| {
                let mut role = "user";
                if author == &Author::Model {
                    role = "model";
                }
                return Content::new(role, text);
            })
            .collect();

        let mut system_instruction = None;
        if !self.system_prompt.trim().is_empty() {
            system_instruction = Some(Content::new("", &self.system_prompt));
        }

        return CompletionRequest {
            contents,
            system_instruction,
            generation_config: self.generation.clone(),
            safety_settings: self.safety.clone(),
        };
    }
}

#[async_trait]
impl Backend for Gemini {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.token.is_empty() {
            bail!("Gemini token is not defined");
        }

        let url = format!(
            "{url}/v1beta/models/{model}?key={key}",
            url = self.url,
            model = model_name(&Config::get(ConfigKey::Model)),
            key = self.token
        );

        let res = reqwest::Client::new()
            .get(&url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        if res.is_err() {
            tracing::error!(error = ?res.unwrap_err(), "Gemini is not reachable");
            bail!("Gemini is not reachable");
        }

        let status = res.unwrap().status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "Gemini health check failed");
            bail!("Gemini health check failed with status {status}");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn list_models(&self) -> Result<Vec<String>> {
        let res = reqwest::Client::new()
            .get(format!(
                "{url}/v1beta/models?key={key}",
                url = self.url,
                key = self.token
            ))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = api_error_message(&res.text().await.unwrap_or_default());
            tracing::error!(status = status, "Failed to list Gemini models");
            bail!("Failed to list Gemini models, {status}: {message}");
        }

        let mut models: Vec<String> = res
            .json::<ModelListResponse>()
            .await?
            .models
            .iter()
            .filter(|model| {
                return model
                    .supported_generation_methods
                    .contains(&"generateContent".to_string());
            })
            .map(|model| {
                return model.name.trim_start_matches("models/").to_string();
            })
            .collect();

        models.sort();

        return Ok(models);
    }

    #[allow(clippy::implicit_return)]
    async fn stream_completion(&self, prompt: &BackendPrompt) -> Result<FragmentStream, ChatError> {
        let req = self.completion_request(prompt);
        tracing::debug!(
            exchange_id = prompt.exchange_id.as_str(),
            turns = req.contents.len(),
            "Sending completion request"
        );

        let res = reqwest::Client::new()
            .post(format!(
                "{url}/v1beta/models/{model}:streamGenerateContent?alt=sse&key={key}",
                url = self.url,
                model = model_name(&Config::get(ConfigKey::Model)),
                key = self.token,
            ))
            .json(&req)
            .send()
            .await
            .map_err(|err| return ChatError::RequestFailed(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = api_error_message(&res.text().await.unwrap_or_default());
            tracing::error!(
                status = status,
                message = message.as_str(),
                "Failed to make completion request to Gemini"
            );
            return Err(ChatError::RequestFailed(format!(
                "Gemini returned {status}: {message}"
            )));
        }

        let stream = res.bytes_stream().map_err(convert_err);
        let lines = StreamReader::new(stream).lines();

        let fragments = futures::stream::try_unfold(lines, |mut lines| {
            return async move {
                return next_fragment(&mut lines)
                    .await
                    .map(|fragment| return fragment.map(|text| return (text, lines)));
            };
        });

        return Ok(Box::pin(fragments));
    }
}
