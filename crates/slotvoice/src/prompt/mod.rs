//! Prompt composition: deterministic template choice plus message assembly.
//!
//! [`compose`] is a pure function of the [`PlaySession`] (and, only when the
//! session carries no timestamp, the wall clock). Message order is fixed:
//!
//! 1. system — chosen template, word budget substituted
//! 2. system — won/lost this spin
//! 3. system — games played
//! 4. system — streak statement
//! 5. system ×3 — FULL only: payout, bankroll, markup instruction
//! 6. assistant — cleaned prior speech, when present and non-empty

pub mod speech;
pub mod templates;

use serde::Serialize;

use crate::Message;
use crate::error::SlotError;
use crate::seed::{pick_index, seed_key};
use crate::session::{Mode, Outcome, PlaySession};

/// Markup convention the FULL-mode completion must follow.
pub const MARKUP_INSTRUCTION: &str = "Format the response as speech markup wrapped in a single <speak> element. Use <pause:Nms> tags, for example <pause:300ms>, for pauses between phrases. Do not repeat the reel symbols.";

/// The output of [`compose`], consumed by one completion call.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComposedPrompt {
    /// Index of the chosen template within its list.
    pub template_index: usize,
    /// The chosen template with the word budget substituted.
    pub instruction: String,
    /// Outcome the messages describe.
    pub outcome: Outcome,
    pub messages: Vec<Message>,
}

/// Required fields that are absent for the session's mode.
pub fn missing_parameters(session: &PlaySession) -> Vec<&'static str> {
    let mut missing = Vec::new();
    match session.mode {
        Mode::Full => {
            if session.reels_display.is_none() {
                missing.push("reelsDisplay");
            }
            if session.payout.is_none() {
                missing.push("payout");
            }
            if session.bankroll.is_none() {
                missing.push("bankroll");
            }
        }
        Mode::Partial => {
            if session.outcome.is_none() {
                missing.push("outcome");
            }
        }
    }
    missing
}

/// Build the instruction and message list for a session.
///
/// Fails only with [`SlotError::MissingParameters`].
pub fn compose(session: &PlaySession) -> Result<ComposedPrompt, SlotError> {
    let missing = missing_parameters(session);
    if !missing.is_empty() {
        return Err(SlotError::MissingParameters(missing));
    }
    let outcome = session
        .resolved_outcome()
        .ok_or(SlotError::MissingParameters(vec!["outcome"]))?;

    let list = templates::templates_for(session.mode, outcome);
    let seed = seed_key(session.user_id.as_deref(), session.effective_timestamp());
    let template_index = pick_index(&seed, list.len()).unwrap_or(0);
    let instruction = templates::render(list[template_index], templates::word_budget(session.mode));

    let mut messages = vec![
        Message::system(&instruction),
        Message::system(outcome_statement(outcome)),
        Message::system(games_statement(session.games_played)),
        Message::system(streak_statement(
            outcome,
            session.win_streak,
            session.lose_streak,
        )),
    ];

    if session.mode == Mode::Full {
        // Both are present: checked by missing_parameters above.
        let payout = session.payout.unwrap_or_default();
        let bankroll = session.bankroll.unwrap_or_default();
        messages.push(Message::system(payout_statement(payout)));
        messages.push(Message::system(bankroll_statement(bankroll)));
        messages.push(Message::system(MARKUP_INSTRUCTION));
    }

    if let Some(prior) = session.prior_speech.as_deref() {
        let cleaned = speech::clean_prior_speech(prior);
        if !cleaned.is_empty() {
            messages.push(Message::assistant_text(cleaned));
        }
    }

    Ok(ComposedPrompt {
        template_index,
        instruction,
        outcome,
        messages,
    })
}

fn outcome_statement(outcome: Outcome) -> String {
    match outcome {
        Outcome::Win => "The player won this spin.".to_string(),
        Outcome::Lose => "The player lost this spin.".to_string(),
    }
}

fn games_statement(games_played: u32) -> String {
    format!(
        "The player has played {games_played} {} this session.",
        plural(games_played, "game", "games")
    )
}

/// Streak wording for the spin being narrated.
///
/// The caller's counters do not yet include this spin, so an extended streak
/// is reported as `+1`, while a broken streak reports the old count as is.
pub fn streak_statement(outcome: Outcome, win_streak: u32, lose_streak: u32) -> String {
    match outcome {
        Outcome::Win if lose_streak > 0 => format!(
            "The player broke a losing streak of {lose_streak} {}.",
            plural(lose_streak, "game", "games")
        ),
        Outcome::Win => {
            let n = win_streak + 1;
            format!(
                "The player is on a winning streak of {n} {}.",
                plural(n, "game", "games")
            )
        }
        Outcome::Lose if win_streak > 0 => format!(
            "The player broke a winning streak of {win_streak} {}.",
            plural(win_streak, "game", "games")
        ),
        Outcome::Lose => {
            let n = lose_streak + 1;
            format!(
                "The player is on a losing streak of {n} {}.",
                plural(n, "game", "games")
            )
        }
    }
}

fn payout_statement(payout: i64) -> String {
    let amount = payout.unsigned_abs();
    let coins = plural(amount, "coin", "coins");
    if payout > 0 {
        format!("The player won {amount} {coins} on this spin.")
    } else {
        format!("The player lost {amount} {coins} on this spin.")
    }
}

fn bankroll_statement(bankroll: i64) -> String {
    format!(
        "The player has {bankroll} {} remaining.",
        plural(bankroll.unsigned_abs(), "coin", "coins")
    )
}

fn plural<N: Into<u64>>(n: N, one: &'static str, many: &'static str) -> &'static str {
    if n.into() == 1 { one } else { many }
}
