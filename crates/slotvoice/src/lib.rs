//! Slot-machine win/lose commentary generated by a hosted chat-completion model.
//!
//! `slotvoice` turns a player's play history into a short line of spoken
//! commentary for a voice/chat slot game. The pipeline for one spin is:
//!
//! ```text
//! PlaySession ──compose──▶ ComposedPrompt ──Completer──▶ raw text ──format──▶ response
//!                                                                   │
//!                                                   ExchangeStore ◀─┘ (best effort)
//! ```
//!
//! - [`prompt::compose`] picks one of five canned instructions with a seeded,
//!   portable PRNG ([`seed::SeedRandom`]) and assembles the message list.
//! - [`format::format_response`] post-processes the completion for playback.
//! - [`service::SlotService`] wires the two together with an injected
//!   [`Completer`] and an optional [`store::ExchangeStore`].
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use slotvoice::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SlotError> {
//!     let config = SlotConfig::from_env();
//!     let client = CompletionClient::new(config.endpoint()?, config.api_key.clone())
//!         .map_err(SlotError::Config)?;
//!
//!     let service = SlotService::new(Arc::new(client)).with_max_tokens(config.max_tokens);
//!
//!     let session = PlaySession::partial(Outcome::Win, "Spin again?")
//!         .with_user_id("player-1")
//!         .with_timestamp(1_700_000_000_000)
//!         .with_counts(12, 2, 0);
//!
//!     let reply = service.generate(session).await?;
//!     println!("{}", reply.response);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | [`PlaySession`](session::PlaySession), [`Mode`](session::Mode), [`Outcome`](session::Outcome) |
//! | [`seed`] | `seedrandom`-compatible ARC4 generator and index selection |
//! | [`prompt`] | Template lists, prior-speech cleanup, message assembly |
//! | [`format`] | FULL-mode wrapper stripping and reel/pause prefix |
//! | [`store`] | [`ExchangeStore`](store::ExchangeStore) trait, filesystem and in-memory stores |
//! | [`service`] | [`SlotService`](service::SlotService) request pipeline |
//! | [`config`] | Environment-driven [`SlotConfig`](config::SlotConfig) |

pub mod config;
pub mod error;
pub mod format;
pub mod prelude;
pub mod prompt;
pub mod seed;
pub mod service;
pub mod session;
pub mod store;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

/// Token budget for a single commentary completion.
pub const DEFAULT_MAX_TOKENS: u32 = 100;

/// Azure OpenAI REST API version used when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body (OpenAI wire format). Unused optional fields
/// are omitted from serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    /// Model name. Omitted for Azure deployments, where the URL selects it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message sent to the completion API.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role-tagged message fragment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`CompletionClient::chat()`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Parse a response body into a [`ChatCompletion`], surfacing API-level errors.
fn parse_chat_response(text: &str) -> Result<ChatCompletion, String> {
    let parsed: RawChatResponse =
        serde_json::from_str(text).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(format!("completion API error: {}", err.message));
    }

    if let Some(ref usage) = parsed.usage {
        debug!(
            "Token usage: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        );
    }

    match parsed.choices.and_then(|c| c.into_iter().next()) {
        Some(c) => {
            debug!(
                "LLM output: {} chars",
                c.message.content.as_ref().map_or(0, |s| s.len())
            );
            Ok(ChatCompletion {
                content: c.message.content,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            })
        }
        None => {
            debug!("LLM output: empty (no choices)");
            Ok(ChatCompletion {
                content: None,
                usage: parsed.usage,
                finish_reason: None,
            })
        }
    }
}

// ── Completer seam ─────────────────────────────────────────────────

/// Boxed future returned by [`Completer::complete`].
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

/// Anything that can turn an ordered message list into one text completion.
///
/// [`CompletionClient`] is the production implementation; tests plug in
/// stubs. Uses a boxed future so the trait stays dyn-compatible.
pub trait Completer: Send + Sync {
    fn complete<'a>(&'a self, messages: &'a [Message], max_tokens: u32) -> CompletionFuture<'a>;
}

// ── Client ─────────────────────────────────────────────────────────

/// Where chat-completion requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEndpoint {
    /// An Azure OpenAI deployment. Authenticates with the `api-key` header.
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
    /// Any OpenAI-compatible `/chat/completions` URL. Authenticates with a
    /// bearer token and names the model in the request body.
    OpenAi { url: String, model: String },
}

impl CompletionEndpoint {
    /// Full request URL.
    pub fn url(&self) -> String {
        match self {
            CompletionEndpoint::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
            CompletionEndpoint::OpenAi { url, .. } => url.clone(),
        }
    }

    /// Model name to put in the request body, if the endpoint needs one.
    pub fn model(&self) -> Option<String> {
        match self {
            CompletionEndpoint::Azure { .. } => None,
            CompletionEndpoint::OpenAi { model, .. } => Some(model.clone()),
        }
    }
}

/// Async HTTP client for an OpenAI-style chat completions API.
///
/// Construct once at startup and share it; `reqwest::Client` pools
/// connections internally.
pub struct CompletionClient {
    pub(crate) client: reqwest::Client,
    pub(crate) endpoint: CompletionEndpoint,
    pub(crate) api_key: String,
}

impl CompletionClient {
    /// Create a new client for the given endpoint and key.
    pub fn new(endpoint: CompletionEndpoint, api_key: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("slotvoice/0.4")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &CompletionEndpoint {
        &self.endpoint
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}",
            body.model.as_deref().unwrap_or("(deployment)"),
            body.messages.len(),
            body.max_tokens,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let request = self.client.post(self.endpoint.url()).json(body);
        let request = match self.endpoint {
            CompletionEndpoint::Azure { .. } => request.header("api-key", &self.api_key),
            CompletionEndpoint::OpenAi { .. } => {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            }
        };

        let resp = request
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("completion API HTTP {status}: {text}"));
        }

        parse_chat_response(&text)
    }
}

impl Completer for CompletionClient {
    fn complete<'a>(&'a self, messages: &'a [Message], max_tokens: u32) -> CompletionFuture<'a> {
        Box::pin(async move {
            let body = ChatRequest {
                model: self.endpoint.model(),
                messages: messages.to_vec(),
                max_tokens,
                ..Default::default()
            };
            let completion = self.chat(&body).await?;
            completion
                .content
                .ok_or_else(|| "Empty LLM response".to_string())
        })
    }
}
