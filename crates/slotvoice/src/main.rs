//! Generate one line of slot commentary from the command line.
//!
//! Reads endpoint settings from the environment (and `.env`), see
//! [`slotvoice::config`].
//!
//! # Examples
//!
//! ```sh
//! # FULL mode: reels, payout and bankroll
//! slotvoice full --reels "🍒🍒🍒" --payout 40 --bankroll 140 --games 3 --wins 1
//!
//! # PARTIAL mode: known outcome plus the previous utterance
//! slotvoice partial --status lose --speech "Round and round. Feeling lucky?"
//!
//! # Show the composed prompt without calling the API
//! slotvoice --dry-run --user-id u1 --timestamp 1000 partial --status win
//! ```

use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use slotvoice::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Generate one line of slot-machine commentary.
#[derive(Parser)]
#[command(name = "slotvoice", version)]
struct Cli {
    #[command(flatten)]
    history: History,

    /// Print the composed prompt as JSON and exit without calling the API
    #[arg(long, global = true)]
    dry_run: bool,

    /// Also print the messages and token budget sent to the API
    #[arg(long, global = true)]
    details: bool,

    /// Override the completion token budget
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    #[command(subcommand)]
    mode: ModeCommand,
}

/// Play history shared by both modes.
#[derive(Args)]
struct History {
    /// Player identifier (seeds the template choice)
    #[arg(long, global = true)]
    user_id: Option<String>,

    /// Epoch milliseconds of the spin; defaults to now
    #[arg(long, global = true)]
    timestamp: Option<i64>,

    /// Games played this session
    #[arg(long, global = true, default_value_t = 0)]
    games: u32,

    /// Current consecutive wins
    #[arg(long, global = true, default_value_t = 0)]
    wins: u32,

    /// Current consecutive losses
    #[arg(long, global = true, default_value_t = 0)]
    losses: u32,
}

#[derive(Subcommand)]
enum ModeCommand {
    /// Full playback string with reels, payout framing and markup
    Full {
        /// Reel symbols shown to the player
        #[arg(long)]
        reels: String,
        /// Coins won (positive) or lost (zero or negative) on this spin
        #[arg(long, allow_hyphen_values = true)]
        payout: i64,
        /// Coins remaining
        #[arg(long, allow_hyphen_values = true)]
        bankroll: i64,
    },
    /// Narrate a known outcome, continuing from the previous utterance
    Partial {
        /// `win` or `lose`
        #[arg(long)]
        status: Outcome,
        /// Previous utterance spoken to the player
        #[arg(long)]
        speech: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOutput<'a> {
    response: &'a str,
    details: &'a RequestDetails,
}

fn build_session(cli: &Cli) -> PlaySession {
    let session = match &cli.mode {
        ModeCommand::Full {
            reels,
            payout,
            bankroll,
        } => PlaySession::full(reels.as_str(), *payout, *bankroll),
        ModeCommand::Partial { status, speech } => PlaySession {
            mode: Mode::Partial,
            outcome: Some(*status),
            prior_speech: speech.clone(),
            ..Default::default()
        },
    };

    let history = &cli.history;
    let mut session = session.with_counts(history.games, history.wins, history.losses);
    session.user_id = history.user_id.clone();
    session.timestamp = history.timestamp;
    session.with_resolved_timestamp()
}

async fn run(cli: &Cli) -> Result<String, SlotError> {
    let session = build_session(cli);

    if cli.dry_run {
        let composed = compose(&session)?;
        return serde_json::to_string_pretty(&composed)
            .map_err(|e| SlotError::InvalidParameters(format!("cannot serialize prompt: {e}")));
    }

    let mut config = SlotConfig::from_env();
    if let Some(max_tokens) = cli.max_tokens {
        config.max_tokens = max_tokens;
    }
    let service = config.build_service()?;
    let reply = service.generate(session).await?;

    if cli.details {
        let output = CliOutput {
            response: &reply.response,
            details: &reply.details,
        };
        serde_json::to_string_pretty(&output)
            .map_err(|e| SlotError::InvalidParameters(format!("cannot serialize reply: {e}")))
    } else {
        Ok(reply.response)
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
