//! qazo - A Matrix bot reminding daily prayers and keeping count of missed ones.
//!
//! # Overview
//!
//! For each of the five daily prayers, qazo sends a reminder when the prayer
//! time begins, asks again while the prayer is still pending, and escalates
//! to a "read or missed?" question once the next prayer started. Prayers left
//! pending at the end of the day are marked missed and added to the user's
//! *qazo* ledger: the count of prayers to make up.
//!
//! # Features
//!
//! - **Prayer times**: computed offline for each user's location and timezone
//! - **Escalating reminders**: one live reminder per prayer, replaced as it escalates
//! - **Qazo ledger**: per prayer counts, adjustable by period, counts or date range
//! - **Inactivity pause**: users silent for 48 hours stop receiving reminders
//! - **Session persistence**: Matrix login and bot state survive restarts
//!
//! # Configuration
//!
//! See [`config`] for the YAML format. Any value can be overridden with a
//! `QAZO_` environment variable:
//!
//! ```bash
//! export QAZO_MATRIX__USER_ID="@qazo:matrix.org"
//! export QAZO_MATRIX__PASSWORD="your-password"
//! export QAZO_MATRIX__PASSPHRASE="your-passphrase"
//! ```
//!
//! # Usage
//!
//! ```bash
//! qazo --config config.yaml --data ./data
//! ```
//!
//! The data directory holds the Matrix session, the Matrix crypto store and
//! the qazo store.
//!
//! # Bot Commands
//!
//! - `!qazo help` - Display help information
//! - `!qazo read <prayer>` / `missed <prayer>` / `later <prayer>` - Answer a reminder
//! - `!qazo today` / `times` / `summary` - Show today's statuses, times or the qazo
//! - `!qazo add ...` / `remove ...` / `reset` - Adjust the qazo
//! - `!qazo location <lat> <lon>` / `city <name>` - Set the location
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod clock;
mod commands;
mod config;
mod geo;
mod matrix;
mod messaging;
mod prayers;
mod qazo;
mod reminders;
mod scheduler;
mod store;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: String,

    /// Directory of the Matrix session and the qazo store
    #[arg(short, long)]
    data: String,
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting qazo {}...", env!("CARGO_PKG_VERSION"));

    // Parse command line arguments
    let args = Args::parse();

    // Load configuration from YAML file with environment variable overrides
    let config: Config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    // Launch bot
    let bot = match Bot::new(config, args).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {}", e);
            return;
        }
    };
    bot.start().await;
}
