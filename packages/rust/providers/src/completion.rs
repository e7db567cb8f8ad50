//! Streaming chat completion backends.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, retry};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use docqa_shared::{CompletionSection, DocQaError, GenerationParams, Result, resolve_api_key};

/// One streamed increment of a completion.
///
/// Reasoning models emit their chain of thought in `reasoning` ahead of (or
/// interleaved with) the answer text in `content`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionDelta {
    pub reasoning: Option<String>,
    pub content: Option<String>,
}

impl CompletionDelta {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            reasoning: None,
            content: Some(text.into()),
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: Some(text.into()),
            content: None,
        }
    }
}

/// A single-turn prompt plus sampling parameters.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

/// Fragments in arrival order. An `Err` item ends the stream.
pub type CompletionStream = BoxStream<'static, Result<CompletionDelta>>;

/// Generates text for a prompt as a lazy stream of fragments.
pub trait CompletionModel: Send + Sync {
    /// Start a completion. Nothing is sent until the stream is first polled.
    ///
    /// Cancelling `cancel` ends the stream with [`DocQaError::Cancelled`].
    fn stream(&self, request: CompletionRequest, cancel: CancellationToken) -> CompletionStream;

    /// Model identifier for tracing.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible SSE client
// ---------------------------------------------------------------------------

/// Client for OpenAI-compatible `/chat/completions` endpoints with `stream: true`.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DocQaError::Completion(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build from the `[completion]` config section, reading the key from its env var.
    pub fn from_config(section: &CompletionSection) -> Result<Self> {
        let api_key = resolve_api_key(&section.api_key_env)?;
        Self::new(
            api_key,
            &section.base_url,
            section.model.clone(),
            Duration::from_secs(section.timeout_secs),
        )
    }
}

impl CompletionModel for OpenAiCompletionClient {
    fn stream(&self, request: CompletionRequest, cancel: CancellationToken) -> CompletionStream {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            max_tokens: request.params.max_tokens,
            stream: true,
        };
        let builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);

        Box::pin(async_stream::stream! {
            let mut source = match EventSource::new(builder) {
                Ok(source) => source,
                Err(e) => {
                    yield Err(DocQaError::Completion(format!("request could not be built: {e}")));
                    return;
                }
            };
            source.set_retry_policy(Box::new(retry::Never));

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    event = source.next() => Some(event),
                };
                let Some(event) = next else {
                    source.close();
                    yield Err(DocQaError::Cancelled);
                    break;
                };

                match event {
                    None | Some(Err(reqwest_eventsource::Error::StreamEnded)) => break,
                    Some(Ok(Event::Open)) => debug!("completion stream opened"),
                    Some(Ok(Event::Message(message))) => {
                        if message.data.trim() == "[DONE]" {
                            source.close();
                            break;
                        }
                        match parse_chunk(&message.data) {
                            Ok(Some(delta)) => yield Ok(delta),
                            Ok(None) => {}
                            Err(e) => {
                                source.close();
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        source.close();
                        yield Err(stream_error(e).await);
                        break;
                    }
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Extract the delta of the first choice, or `None` for keep-alive and
/// role-only chunks.
fn parse_chunk(data: &str) -> Result<Option<CompletionDelta>> {
    let chunk: ChatChunk = serde_json::from_str(data)
        .map_err(|e| DocQaError::Completion(format!("malformed stream chunk: {e}")))?;

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };
    let delta = CompletionDelta {
        reasoning: choice.delta.reasoning_content.filter(|s| !s.is_empty()),
        content: choice.delta.content.filter(|s| !s.is_empty()),
    };
    if delta.reasoning.is_none() && delta.content.is_none() {
        return Ok(None);
    }
    Ok(Some(delta))
}

async fn stream_error(error: reqwest_eventsource::Error) -> DocQaError {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            warn!(%status, "completion request rejected");
            DocQaError::Completion(format!("HTTP {status}: {body}"))
        }
        other => DocQaError::Completion(other.to_string()),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Deserialize, Default)]
struct ChatDelta {
    content: Option<String>,
    #[serde(alias = "reasoning")]
    reasoning_content: Option<String>,
}
