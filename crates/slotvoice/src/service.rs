//! The per-request pipeline: compose → complete → format → record.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::error::SlotError;
use crate::format::format_response;
use crate::prompt::compose;
use crate::session::{Outcome, PlaySession};
use crate::store::{ExchangeRecord, ExchangeStore, record_exchange};
use crate::{Completer, DEFAULT_MAX_TOKENS, Message};

/// Exactly what was sent to the completion API, for debugging and replay.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

/// Result of one successful generate call.
#[derive(Clone, Debug)]
pub struct SlotReply {
    /// Final text for the game client.
    pub response: String,
    /// The instruction template that was used.
    pub prompt: String,
    pub template_index: usize,
    pub outcome: Outcome,
    pub details: RequestDetails,
    /// Store key of the logged exchange, when logging is enabled and succeeded.
    pub stored_key: Option<String>,
}

/// Commentary generator with explicitly owned collaborators.
///
/// The completer and store are built once at process start and shared by
/// reference across requests; the service itself holds no mutable state.
pub struct SlotService {
    completer: Arc<dyn Completer>,
    store: Option<Arc<dyn ExchangeStore>>,
    max_tokens: u32,
}

impl SlotService {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self {
            completer,
            store: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Log every exchange to `store` (best effort).
    pub fn with_store(mut self, store: Arc<dyn ExchangeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Generate commentary for one spin.
    ///
    /// Fails with [`SlotError::MissingParameters`] before any external call
    /// when the session is incomplete, or with [`SlotError::Upstream`] when
    /// the completion call fails. Store failures are logged and ignored.
    ///
    /// An unset or zero timestamp is replaced by the current time before
    /// composing, and the logged record carries that same value.
    pub async fn generate(&self, session: PlaySession) -> Result<SlotReply, SlotError> {
        let session = session.with_resolved_timestamp();
        let composed = compose(&session)?;

        let raw = self
            .completer
            .complete(&composed.messages, self.max_tokens)
            .await
            .map_err(|e| {
                error!("Completion failed: {e}");
                SlotError::Upstream(e)
            })?;

        let reels = session.reels_display.as_deref().unwrap_or_default();
        let response = format_response(session.mode, &raw, reels);

        info!(
            mode = ?session.mode,
            outcome = %composed.outcome,
            template = composed.template_index,
            "Generated slot commentary"
        );

        let stored_key = match &self.store {
            Some(store) => {
                let record = ExchangeRecord::new(
                    &session,
                    composed.outcome,
                    composed.instruction.as_str(),
                    response.as_str(),
                );
                record_exchange(store.as_ref(), &record).await
            }
            None => None,
        };

        Ok(SlotReply {
            response,
            prompt: composed.instruction,
            template_index: composed.template_index,
            outcome: composed.outcome,
            details: RequestDetails {
                messages: composed.messages,
                max_tokens: self.max_tokens,
            },
            stored_key,
        })
    }
}
