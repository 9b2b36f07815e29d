//! Markdown texts sent by the reminder cadences.

use crate::{
    prayers::Prayer,
    qazo::QazoSummary,
    reminders::Tier,
};

/// Formats the reminder of `prayer` at `tier`.
pub fn format_reminder(prayer: Prayer, tier: Tier) -> String {
    let name = prayer.display_name();
    match tier {
        Tier::Announce => format!("⏰ **{name}** time has begun.\n\nMark it once you have prayed."),
        Tier::Pending => format!("⏰ Did you pray **{name}** yet?\n\nWe will ask again every 10 minutes."),
        Tier::Missed => format!(
            "⚠️ The time of **{name}** is over and it is not marked as read.\n\nDid you read it or miss it?"
        ),
    }
}

/// Formats a ledger summary, one line per prayer.
pub fn format_summary(summary: &QazoSummary) -> String {
    let lines = summary
        .per_prayer
        .iter()
        .map(|(prayer, count)| format!("- {}: **{}**", prayer.display_name(), count))
        .collect::<Vec<String>>()
        .join("\n");

    format!("Qazo prayers: **{}**\n\n{}", summary.total, lines)
}

/// Formats the summary sent after the end of day sweep marked prayers as
/// missed.
pub fn format_end_of_day(marked: &[Prayer], summary: &QazoSummary) -> String {
    let marked = marked
        .iter()
        .map(|p| p.display_name())
        .collect::<Vec<&str>>()
        .join(", ");

    format!(
        "🌙 The day is over. Unmarked prayers were added to your qazo: {}\n\n{}",
        marked,
        format_summary(summary)
    )
}

pub fn format_blocked() -> String {
    "⚠️ You have been paused after 48 hours without any activity. Reminders are stopped.\n\n\
    Send any `!qazo` command to resume them."
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{qazo::QazoLedger, store::UserId};

    #[test]
    fn test_reminder_names_the_prayer() {
        for tier in Tier::ALL {
            assert!(format_reminder(Prayer::Fajr, tier).contains("Fajr (Bomdod)"));
        }
    }

    #[test]
    fn test_format_summary() {
        let mut ledger = QazoLedger::new(UserId(1));
        ledger.apply(Prayer::Isha, 3);

        let summary = format_summary(&ledger.summary());

        assert!(summary.starts_with("Qazo prayers: **3**"));
        assert!(summary.contains("- Isha (Xufton): **3**"));
        assert!(summary.contains("- Asr: **0**"));
    }

    #[test]
    fn test_format_end_of_day_lists_marked_prayers() {
        let ledger = QazoLedger::new(UserId(1));

        let message = format_end_of_day(&[Prayer::Asr, Prayer::Isha], &ledger.summary());

        assert!(message.contains("Asr, Isha (Xufton)"));
    }
}
