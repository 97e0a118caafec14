//! Process-wide configuration read from the environment.
//!
//! [`SlotConfig`] collects the settings every entry point needs and turns
//! them into collaborators via [`endpoint`](SlotConfig::endpoint) and
//! [`build_service`](SlotConfig::build_service).
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `ACCESS_KEY` | Shared secret callers must pass as `key` |
//! | `OPENAI_URL` | Azure resource endpoint, or a full chat-completions URL |
//! | `OPENAI_KEY` | API key for the completion endpoint |
//! | `OPENAI_DEPLOYMENT_ID` | Azure deployment; selects the Azure URL scheme |
//! | `OPENAI_API_VERSION` | Azure API version (default `2024-02-01`) |
//! | `OPENAI_MODEL` | Model name for non-Azure endpoints |
//! | `SLOTVOICE_MAX_TOKENS` | Completion token budget (default 100) |
//! | `SLOTVOICE_STORE_DIR` | Exchange log directory; logging is off when unset |

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::error::SlotError;
use crate::service::SlotService;
use crate::store::FsStore;
use crate::{CompletionClient, CompletionEndpoint, DEFAULT_AZURE_API_VERSION, DEFAULT_MAX_TOKENS};

/// Settings shared by the server and the CLIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConfig {
    /// Shared secret. `None` rejects every request.
    pub access_key: Option<String>,
    /// Azure endpoint or OpenAI-compatible chat-completions URL.
    pub openai_url: Option<String>,
    /// API key for the completion endpoint.
    pub api_key: String,
    /// Azure deployment ID.
    pub deployment: Option<String>,
    /// Azure API version. Default: `2024-02-01`.
    pub api_version: String,
    /// Model name for non-Azure endpoints.
    pub model: Option<String>,
    /// Token budget per completion. Default: `100`.
    pub max_tokens: u32,
    /// Root directory for the exchange log.
    pub store_dir: Option<PathBuf>,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            openai_url: None,
            api_key: String::new(),
            deployment: None,
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            store_dir: None,
        }
    }
}

impl SlotConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_tokens = match get("SLOTVOICE_MAX_TOKENS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(
                        "Ignoring invalid SLOTVOICE_MAX_TOKENS={raw:?}; using {}",
                        defaults.max_tokens
                    );
                    defaults.max_tokens
                }
            },
            None => defaults.max_tokens,
        };

        Self {
            access_key: get("ACCESS_KEY"),
            openai_url: get("OPENAI_URL"),
            api_key: get("OPENAI_KEY").unwrap_or_default(),
            deployment: get("OPENAI_DEPLOYMENT_ID"),
            api_version: get("OPENAI_API_VERSION").unwrap_or(defaults.api_version),
            model: get("OPENAI_MODEL"),
            max_tokens,
            store_dir: get("SLOTVOICE_STORE_DIR").map(PathBuf::from),
        }
    }

    /// The completion endpoint described by this config.
    ///
    /// A deployment ID selects the Azure URL scheme; otherwise `OPENAI_URL`
    /// is used as-is with `OPENAI_MODEL`.
    pub fn endpoint(&self) -> Result<CompletionEndpoint, SlotError> {
        let url = self
            .openai_url
            .clone()
            .ok_or_else(|| SlotError::Config("OPENAI_URL is not set".into()))?;

        match (&self.deployment, &self.model) {
            (Some(deployment), _) => Ok(CompletionEndpoint::Azure {
                endpoint: url,
                deployment: deployment.clone(),
                api_version: self.api_version.clone(),
            }),
            (None, Some(model)) => Ok(CompletionEndpoint::OpenAi {
                url,
                model: model.clone(),
            }),
            (None, None) => Err(SlotError::Config(
                "set OPENAI_DEPLOYMENT_ID (Azure) or OPENAI_MODEL".into(),
            )),
        }
    }

    /// Build a [`SlotService`] with the configured client, token budget and
    /// (when a store directory is set) filesystem exchange log.
    pub fn build_service(&self) -> Result<SlotService, SlotError> {
        let client = CompletionClient::new(self.endpoint()?, self.api_key.clone())
            .map_err(SlotError::Config)?;
        let mut service = SlotService::new(Arc::new(client)).with_max_tokens(self.max_tokens);

        if let Some(dir) = &self.store_dir {
            let store = FsStore::new(dir).map_err(|e| {
                SlotError::Storage(format!("cannot open store at {}: {e}", dir.display()))
            })?;
            service = service.with_store(Arc::new(store));
        }

        Ok(service)
    }
}
