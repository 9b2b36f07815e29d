//! Markdown response formatters for bot commands.
//!
//! All responses are designed to be displayed in a Matrix room, next to the
//! reminders sent by the engine.

use chrono::NaiveDate;

use crate::{
    messaging::ActionKind,
    prayers::{DailyPrayerRecord, DailyPrayerTimes, Prayer, PrayerStatus},
    qazo::{AdjustmentError, Direction, LedgerDelta, QazoLedger},
    reminders::{ActionOutcome, format_summary},
    store::Location,
};

/// Formats the help message showing available bot commands.
pub fn format_help() -> String {
    let body = "Commands:\n\
        - `read <prayer>`: mark a prayer of today as read\n\
        - `missed <prayer>`: mark a prayer of today as missed, it is added to your qazo\n\
        - `later <prayer>`: ask again later\n\
        - `today`: show the status of today's prayers\n\
        - `times`: show today's prayer times\n\
        - `summary`: show your qazo\n\
        - `add period <2y 3m 5d>` / `remove period ...`: add or remove qazo for a period\n\
        - `add counts <fajr> <dhuhr> <asr> <maghrib> <isha>` / `remove counts ...`: add or remove qazo per prayer\n\
        - `add range <DD.MM.YYYY-DD.MM.YYYY> [prayers|all]` / `remove range ...`: add or remove qazo for a date range\n\
        - `reset`: set your qazo to zero\n\
        - `location <latitude> <longitude>`: set your location from coordinates\n\
        - `city <name>`: set your location to a known city\n\
        - `help`: show this help message\n\n\
        Prayers are `fajr`, `dhuhr`, `asr`, `maghrib` and `isha` (`bomdod`, `peshin`, `shom` and `xufton` work too).\n\
        > *qazo* reminds you of each prayer and keeps count of the ones you missed.";

    body.to_owned()
}

/// Formats a response for an unknown command.
pub fn format_unknown_command() -> String {
    "Unknown command. Type `!qazo help` for more information.".to_owned()
}

/// Formats an error response for a prayer action without a valid prayer.
pub fn format_invalid_action(action: ActionKind) -> String {
    format!(
        "Invalid {} command. Usage: `!qazo {} <fajr|dhuhr|asr|maghrib|isha>`",
        action.as_str(),
        action.as_str()
    )
}

/// Formats an error response for an invalid ledger adjustment.
pub fn format_invalid_adjustment(error: &AdjustmentError) -> String {
    format!(
        "{}\n\nUsage:\n\
        - `!qazo add period 2y 3m 5d`\n\
        - `!qazo add counts 10 4 4 2 7`\n\
        - `!qazo add range 01.01.2024-31.01.2024 fajr,isha`\n\n\
        Replace `add` by `remove` to remove qazo.",
        capitalize(&error.to_string())
    )
}

pub fn format_invalid_location() -> String {
    "Invalid location command. Usage: `!qazo location <latitude> <longitude>`, e.g. `!qazo location 41.3 69.24`"
        .to_owned()
}

pub fn format_invalid_city(cities: &[&str]) -> String {
    format!(
        "Invalid city command. Usage: `!qazo city <name>` with one of: {}",
        cities.join(", ")
    )
}

pub fn format_unknown_city(name: &str, cities: &[&str]) -> String {
    format!(
        "Unknown city **{}**. Known cities: {}",
        name,
        cities.join(", ")
    )
}

pub fn format_location_not_found(latitude: f64, longitude: f64) -> String {
    format!(
        "No known city near {latitude}, {longitude}. Use `!qazo city <name>` to pick one."
    )
}

pub fn format_location_set(location: &Location) -> String {
    format!(
        "📍 Location set to **{}**, {} ({}). Prayer times are recomputed from today.",
        location.city, location.country, location.timezone
    )
}

pub fn format_internal_error() -> String {
    "Something went wrong, please try again later.".to_owned()
}

/// Formats the statuses of the prayers of a day.
pub fn format_today(record: &DailyPrayerRecord, times: &DailyPrayerTimes) -> String {
    let lines = Prayer::ALL
        .iter()
        .map(|p| {
            let icon = match record.status(*p) {
                PrayerStatus::Pending => "⏳",
                PrayerStatus::Read => "✅",
                PrayerStatus::Missed => "❌",
            };
            format!(
                "- {} **{}** ({}): {}",
                icon,
                p.display_name(),
                times.time(*p).format("%H:%M"),
                record.status(*p)
            )
        })
        .collect::<Vec<String>>()
        .join("\n");

    format!("Prayers of {}:\n\n{}", format_date(record.date), lines)
}

pub fn format_times(times: &DailyPrayerTimes, location: &Location) -> String {
    let lines = Prayer::ALL
        .iter()
        .map(|p| format!("- {}: **{}**", p.display_name(), times.time(*p).format("%H:%M")))
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "Prayer times of {} in {}:\n\n{}",
        format_date(times.date),
        location.city,
        lines
    )
}

pub fn format_ledger(ledger: &QazoLedger) -> String {
    format_summary(&ledger.summary())
}

/// Formats the confirmation of a ledger adjustment, before the new totals.
pub fn format_adjustment(direction: Direction, delta: &LedgerDelta) -> String {
    let amounts = delta
        .iter()
        .map(|(p, v)| format!("{} {}", v.unsigned_abs(), p))
        .collect::<Vec<String>>()
        .join(", ");

    match direction {
        Direction::Add => format!("➕ Added {amounts} to your qazo."),
        Direction::Remove => format!("➖ Removed {amounts} from your qazo."),
    }
}

pub fn format_reset() -> String {
    "🗑️ Your qazo has been reset.".to_owned()
}

pub fn format_not_started(prayer: Prayer) -> String {
    format!("**{}** has not started yet.", prayer.display_name())
}

/// Formats the outcome of a read, missed or later action.
pub fn format_action_outcome(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Marked {
            prayer,
            status: PrayerStatus::Missed,
            ledger,
        } => {
            let total = ledger.as_ref().map(QazoLedger::total).unwrap_or_default();
            format!(
                "❌ **{}** marked as missed and added to your qazo. Total qazo: **{}**",
                prayer.display_name(),
                total
            )
        }
        ActionOutcome::Marked { prayer, .. } => {
            format!("✅ **{}** marked as read. May it be accepted!", prayer.display_name())
        }
        ActionOutcome::Deferred(prayer) => {
            format!("⏳ Got it, we will remind you of **{}** later.", prayer.display_name())
        }
        ActionOutcome::AlreadyResolved { prayer, status } => format!(
            "**{}** is already marked as {} today.",
            prayer.display_name(),
            status
        ),
    }
}

pub fn format_welcome_back() -> String {
    "👋 Welcome back, reminders are on again.".to_owned()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
