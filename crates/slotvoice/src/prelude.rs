//! Convenience re-exports for common `slotvoice` types.
//!
//! ```ignore
//! use slotvoice::prelude::*;
//! ```
//!
//! Store implementations, template lists and the PRNG stay in their modules.

pub use crate::{
    Completer, CompletionClient, CompletionEndpoint, CompletionFuture, Message, MessageRole,
};

pub use crate::config::SlotConfig;
pub use crate::error::SlotError;
pub use crate::format::format_response;
pub use crate::prompt::{ComposedPrompt, compose};
pub use crate::service::{RequestDetails, SlotReply, SlotService};
pub use crate::session::{Mode, Outcome, PlaySession};
pub use crate::store::{ExchangeRecord, ExchangeStore};
