//! Parsing of the manual qazo adjustment inputs.
//!
//! Each flow turns user text into a [`LedgerDelta`]. Invalid input yields an
//! [`AdjustmentError`] whose message is shown to the user as a correction
//! prompt; it never reaches the ledger.

use chrono::NaiveDate;
use log::debug;

use crate::{
    prayers::{Prayer, UnknownPrayer},
    qazo::LedgerDelta,
};

/// Days counted for one year of missed prayers.
const DAYS_PER_YEAR: u64 = 365;
/// Days counted for one month of missed prayers.
const DAYS_PER_MONTH: u64 = 30;
/// Longest period accepted by the period and range flows.
const MAX_DAYS: u64 = 100 * DAYS_PER_YEAR;

/// Whether the adjustment adds debt or removes made up prayers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Add,
    Remove,
}

impl Direction {
    fn apply(self, delta: LedgerDelta) -> LedgerDelta {
        match self {
            Direction::Add => delta,
            Direction::Remove => delta.negated(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdjustmentError {
    #[error("'{0}' is not a period, write it like `2y 3m 10d`")]
    InvalidPeriod(String),
    #[error("the period must be at least one day")]
    EmptyPeriod,
    #[error("the period can not exceed 100 years")]
    PeriodTooLong,
    #[error("'{0}' is not a non negative number")]
    InvalidCount(String),
    #[error("expected 5 counts (fajr dhuhr asr maghrib isha), got {0}")]
    WrongCountArity(usize),
    #[error("'{0}' is not a date, write it like `DD.MM.YYYY`")]
    InvalidDate(String),
    #[error("'{0}' is not a date range, write it like `01.01.2024-31.01.2024`")]
    InvalidRange(String),
    #[error("the range ends before it starts")]
    RangeReversed,
    #[error(transparent)]
    UnknownPrayer(#[from] UnknownPrayer),
    #[error("nothing to apply")]
    NothingToApply,
}

/// Parses a period such as `2y 3m 10d`, `1 yil 6 oy` or `3 years 2 months`
/// into a number of days.
///
/// A year counts 365 days and a month 30 days.
pub fn parse_period(input: &str) -> Result<u64, AdjustmentError> {
    let invalid = || AdjustmentError::InvalidPeriod(input.trim().to_string());
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Err(invalid());
    }

    let mut days: u64 = 0;
    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        let Token::Number(amount) = token else {
            return Err(invalid());
        };
        let Some(Token::Word(unit)) = iter.next() else {
            return Err(invalid());
        };
        let unit_days = match unit.as_str() {
            "y" | "yr" | "year" | "years" | "yil" => DAYS_PER_YEAR,
            "m" | "mo" | "month" | "months" | "oy" => DAYS_PER_MONTH,
            "d" | "day" | "days" | "kun" => 1,
            _ => return Err(invalid()),
        };
        days = amount
            .checked_mul(unit_days)
            .and_then(|d| days.checked_add(d))
            .ok_or(AdjustmentError::PeriodTooLong)?;
    }

    if days == 0 {
        return Err(AdjustmentError::EmptyPeriod);
    }
    if days > MAX_DAYS {
        return Err(AdjustmentError::PeriodTooLong);
    }

    debug!("parsed period '{}' as {} days", input, days);
    Ok(days)
}

/// Delta of a period based estimate: one qazo per prayer per day.
pub fn period_delta(input: &str, direction: Direction) -> Result<LedgerDelta, AdjustmentError> {
    let days = parse_period(input)?;
    Ok(direction.apply(LedgerDelta::uniform(days as i64)))
}

/// Delta of five explicit counts given in prayer order.
pub fn counts_delta<S: AsRef<str>>(
    counts: &[S],
    direction: Direction,
) -> Result<LedgerDelta, AdjustmentError> {
    if counts.len() != Prayer::ALL.len() {
        return Err(AdjustmentError::WrongCountArity(counts.len()));
    }

    let mut values = [0i64; 5];
    for (slot, raw) in values.iter_mut().zip(counts) {
        let raw = raw.as_ref().trim();
        *slot = raw
            .parse::<u32>()
            .map_err(|_| AdjustmentError::InvalidCount(raw.to_string()))?
            .into();
    }

    let delta = LedgerDelta::from_counts(values);
    if delta.is_zero() {
        return Err(AdjustmentError::NothingToApply);
    }
    Ok(direction.apply(delta))
}

/// Parses `DD.MM.YYYY-DD.MM.YYYY` (spaces around the dash allowed) into an
/// inclusive date range.
pub fn parse_date_range(input: &str) -> Result<(NaiveDate, NaiveDate), AdjustmentError> {
    let Some((from, to)) = input.split_once('-') else {
        return Err(AdjustmentError::InvalidRange(input.trim().to_string()));
    };
    let from = parse_date(from)?;
    let to = parse_date(to)?;
    if to < from {
        return Err(AdjustmentError::RangeReversed);
    }
    Ok((from, to))
}

fn parse_date(input: &str) -> Result<NaiveDate, AdjustmentError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%d.%m.%Y")
        .map_err(|_| AdjustmentError::InvalidDate(input.to_string()))
}

/// Parses a prayer selection: `all`, or a list of prayer names. An empty
/// selection means every prayer.
pub fn parse_prayers<S: AsRef<str>>(names: &[S]) -> Result<Vec<Prayer>, AdjustmentError> {
    if names.is_empty() || names.iter().any(|n| n.as_ref().eq_ignore_ascii_case("all")) {
        return Ok(Prayer::ALL.to_vec());
    }

    let mut prayers = names
        .iter()
        .flat_map(|n| n.as_ref().split(','))
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.parse::<Prayer>())
        .collect::<Result<Vec<_>, _>>()?;
    prayers.sort();
    prayers.dedup();
    Ok(prayers)
}

/// Delta of a date range sweep: one qazo per selected prayer per day in the
/// inclusive range.
pub fn range_delta<S: AsRef<str>>(
    range: &str,
    prayers: &[S],
    direction: Direction,
) -> Result<LedgerDelta, AdjustmentError> {
    let (from, to) = parse_date_range(range)?;
    let days = (to - from).num_days() as u64 + 1;
    if days > MAX_DAYS {
        return Err(AdjustmentError::PeriodTooLong);
    }

    let mut delta = LedgerDelta::default();
    for prayer in parse_prayers(prayers)? {
        delta.add(prayer, days as i64);
    }
    Ok(direction.apply(delta))
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Number(u64),
    Word(String),
}

/// Splits `2y3m 10 kun` into numbers and lowercase words.
fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut number = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                number.push(d);
                chars.next();
            }
            // Absurdly long numbers saturate and are rejected later as too long
            tokens.push(Token::Number(number.parse().unwrap_or(u64::MAX)));
        } else if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&w) = chars.peek().filter(|w| w.is_alphabetic()) {
                word.extend(w.to_lowercase());
                chars.next();
            }
            tokens.push(Token::Word(word));
        } else if c.is_whitespace() || c == ',' {
            chars.next();
        } else {
            tokens.push(Token::Word(c.to_string()));
            chars.next();
        }
    }

    tokens
}
