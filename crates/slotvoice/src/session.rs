//! Play-history input for one spin.

use serde::{Deserialize, Deserializer, Serialize};

/// Which kind of commentary is requested.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Full playback string: reels, payout framing, and markup.
    Full,
    /// Narrate a known win/lose outcome, using the previous utterance as context.
    #[default]
    Partial,
}

/// Result of the spin being narrated.
///
/// Serializes lowercase; deserializes case-insensitively like [`FromStr`](std::str::FromStr).
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
}

impl Outcome {
    /// A strictly positive payout is a win; zero or negative is a loss.
    pub fn from_payout(payout: i64) -> Self {
        if payout > 0 { Outcome::Win } else { Outcome::Lose }
    }

    pub fn won(self) -> bool {
        self == Outcome::Win
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Lose => "lose",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "win" => Ok(Outcome::Win),
            "lose" => Ok(Outcome::Lose),
            other => Err(format!("unknown outcome '{other}' (expected win or lose)")),
        }
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Caller-supplied play history for the current spin.
///
/// Field names serialize in camelCase. The older client's field names
/// (`games`, `wins`, `losses`, `reels`, `speech`, `status`) are accepted on
/// input so stored exchanges from either era deserialize.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaySession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Epoch milliseconds. Together with `user_id` this seeds template choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, alias = "games")]
    pub games_played: u32,
    #[serde(default, alias = "wins")]
    pub win_streak: u32,
    #[serde(default, alias = "losses")]
    pub lose_streak: u32,
    #[serde(default)]
    pub mode: Mode,

    // FULL mode
    #[serde(default, alias = "reels", skip_serializing_if = "Option::is_none")]
    pub reels_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bankroll: Option<i64>,

    // PARTIAL mode
    #[serde(default, alias = "speech", skip_serializing_if = "Option::is_none")]
    pub prior_speech: Option<String>,
    #[serde(default, alias = "status", skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl PlaySession {
    /// A FULL-mode session for the given reel display, payout and bankroll.
    pub fn full(reels_display: impl Into<String>, payout: i64, bankroll: i64) -> Self {
        Self {
            mode: Mode::Full,
            reels_display: Some(reels_display.into()),
            payout: Some(payout),
            bankroll: Some(bankroll),
            ..Default::default()
        }
    }

    /// A PARTIAL-mode session for a known outcome and the previous utterance.
    pub fn partial(outcome: Outcome, prior_speech: impl Into<String>) -> Self {
        Self {
            mode: Mode::Partial,
            outcome: Some(outcome),
            prior_speech: Some(prior_speech.into()),
            ..Default::default()
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set games played, current win streak and current lose streak.
    pub fn with_counts(mut self, games_played: u32, win_streak: u32, lose_streak: u32) -> Self {
        self.games_played = games_played;
        self.win_streak = win_streak;
        self.lose_streak = lose_streak;
        self
    }

    pub fn with_prior_speech(mut self, prior_speech: impl Into<String>) -> Self {
        self.prior_speech = Some(prior_speech.into());
        self
    }

    /// The spin's outcome: the explicit `outcome` in PARTIAL mode, the sign
    /// of `payout` in FULL mode.
    pub fn resolved_outcome(&self) -> Option<Outcome> {
        match self.mode {
            Mode::Partial => self.outcome,
            Mode::Full => self.payout.map(Outcome::from_payout),
        }
    }

    /// Pin the seed timestamp: an unset or zero value becomes the current
    /// time, so composing and logging see the same seed.
    pub fn with_resolved_timestamp(mut self) -> Self {
        self.timestamp = Some(self.effective_timestamp());
        self
    }

    /// The seed timestamp, falling back to the current time when unset or zero.
    pub fn effective_timestamp(&self) -> i64 {
        match self.timestamp {
            Some(ts) if ts != 0 => ts,
            _ => chrono::Utc::now().timestamp_millis(),
        }
    }
}
