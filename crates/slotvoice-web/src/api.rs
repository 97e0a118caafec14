//! Endpoint handlers for the two commentary routes.
//!
//! Both routes take their input as query parameters and answer with JSON.
//! The shared secret is checked before anything else is parsed; parameter
//! validation happens before any call to the completion API.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use slotvoice::error::SlotError;
use slotvoice::service::{RequestDetails, SlotService};
use slotvoice::session::{Mode, Outcome, PlaySession};
use tracing::{debug, error, info, warn};

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SlotService>,
    /// Expected value of the `key` parameter. `None` rejects every request.
    pub access_key: Option<Arc<str>>,
}

impl AppState {
    fn authorized(&self, key: Option<&String>) -> bool {
        match (&self.access_key, key) {
            (Some(expected), Some(given)) => expected.as_ref() == given.as_str(),
            _ => false,
        }
    }
}

type Params = HashMap<String, String>;

/// Successful response body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub elapsed_ms: u64,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<RequestDetails>,
}

/// A failed request, carrying the time spent before it failed.
pub struct ApiError {
    error: SlotError,
    elapsed_ms: u64,
}

impl ApiError {
    fn new(error: SlotError, start: Instant) -> Self {
        Self {
            error,
            elapsed_ms: elapsed_ms(start),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.error {
            SlotError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            ref e if e.is_client_error() => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid parameters", "elapsedMs": self.elapsed_ms })),
            )
                .into_response(),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error", "elapsedMs": self.elapsed_ms })),
            )
                .into_response(),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// GET /api/generateresponse — FULL-mode commentary.
///
/// Parameters: `key`, `userId?`, `timestamp?`, `games`, `wins`, `losses`,
/// `reels`, `payout`, `bankroll`, `getDetails?`.
pub async fn generate_response(
    State(app): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<GenerateResponse>, ApiError> {
    respond(&app, &params, Mode::Full).await
}

/// GET /api/slotsresponse — PARTIAL-mode commentary.
///
/// Parameters: `key`, `userId?`, `timestamp?`, `games`, `wins`, `losses`,
/// `status` (`win` | `lose`), `speech`, `getDetails?`.
pub async fn slots_response(
    State(app): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<GenerateResponse>, ApiError> {
    respond(&app, &params, Mode::Partial).await
}

async fn respond(
    app: &AppState,
    params: &Params,
    mode: Mode,
) -> Result<Json<GenerateResponse>, ApiError> {
    let start = Instant::now();

    if !app.authorized(params.get("key")) {
        warn!(?mode, "Rejected request with missing or wrong key");
        return Err(ApiError::new(SlotError::Unauthorized, start));
    }

    let session = parse_session(params, mode).map_err(|e| {
        info!(?mode, "Invalid parameters: {e}");
        ApiError::new(e, start)
    })?;
    let want_details = params.get("getDetails").is_some_and(|v| !v.is_empty());

    match app.service.generate(session).await {
        Ok(reply) => {
            let elapsed = elapsed_ms(start);
            info!(?mode, elapsed_ms = elapsed, "Served commentary");
            Ok(Json(GenerateResponse {
                elapsed_ms: elapsed,
                response: reply.response,
                details: want_details.then_some(reply.details),
            }))
        }
        Err(e) => {
            if !e.is_client_error() {
                error!(?mode, "Request failed: {e}");
            }
            Err(ApiError::new(e, start))
        }
    }
}

/// Build a session from query parameters, rejecting missing or malformed
/// values.
pub fn parse_session(params: &Params, mode: Mode) -> Result<PlaySession, SlotError> {
    let mut session = PlaySession {
        mode,
        user_id: params.get("userId").filter(|v| !v.is_empty()).cloned(),
        timestamp: lenient_timestamp(params),
        games_played: required(params, "games")?,
        win_streak: required(params, "wins")?,
        lose_streak: required(params, "losses")?,
        ..Default::default()
    };

    match mode {
        Mode::Full => {
            session.reels_display = Some(required_text(params, "reels")?);
            session.payout = Some(required(params, "payout")?);
            session.bankroll = Some(required(params, "bankroll")?);
        }
        Mode::Partial => {
            session.outcome = Some(required::<Outcome>(params, "status")?);
            session.prior_speech = Some(required_text(params, "speech")?);
        }
    }

    Ok(session)
}

/// The optional seed timestamp. Missing, zero or unparsable values are
/// left unset; the service then seeds from the current time.
fn lenient_timestamp(params: &Params) -> Option<i64> {
    let raw = params.get("timestamp")?.trim();
    match raw.parse::<i64>() {
        Ok(0) => None,
        Ok(ts) => Some(ts),
        Err(_) => {
            debug!("Ignoring unparsable timestamp {raw:?}");
            None
        }
    }
}

fn required<T: FromStr>(params: &Params, name: &str) -> Result<T, SlotError> {
    optional(params, name)?
        .ok_or_else(|| SlotError::InvalidParameters(format!("{name} is required")))
}

fn optional<T: FromStr>(params: &Params, name: &str) -> Result<Option<T>, SlotError> {
    match params.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| SlotError::InvalidParameters(format!("{name} is not valid: {raw:?}"))),
    }
}

fn required_text(params: &Params, name: &str) -> Result<String, SlotError> {
    params
        .get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| SlotError::InvalidParameters(format!("{name} is required")))
}
