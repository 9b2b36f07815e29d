//! Command parsing.
//!
//! Converts Matrix message text into structured [`Command`] enums. Argument
//! validation happens here, so a [`Command`] is always well formed: ledger
//! adjustments are already turned into a [`LedgerDelta`].

use command_parser::{Command as ParserCommand, Parser};
use log::debug;

use crate::{
    commands::markdown_response::{
        format_invalid_action, format_invalid_adjustment, format_invalid_city,
        format_invalid_location, format_unknown_command,
    },
    messaging::{ActionKind, PrayerAction},
    prayers::Prayer,
    qazo::{
        AdjustmentError, Direction, LedgerDelta,
        adjust::{counts_delta, period_delta, range_delta},
    },
};

/// Represents a parsed bot command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Display help information
    Help,
    /// Answer to a reminder: read, missed or later
    Action(PrayerAction),
    /// Statuses of today's prayers
    Today,
    /// Today's prayer times
    Times,
    /// Qazo summary
    Summary,
    /// Zero the qazo ledger
    Reset,
    /// Manual ledger adjustment
    ///
    /// # Fields
    ///
    /// * `Direction` - Whether qazo is added or removed
    /// * `LedgerDelta` - The signed change, already negated for removals
    Adjust(Direction, LedgerDelta),
    /// Set the location from coordinates
    ///
    /// # Fields
    ///
    /// * `f64` - Latitude
    /// * `f64` - Longitude
    Location(f64, f64),
    /// Set the location to a known city
    City(String),
}

/// Errors that can occur during command parsing.
#[derive(Debug)]
pub enum CommandParsingError {
    /// The message could not be parsed as a command
    UnableToParse,
    /// The command is not for this bot (wrong prefix)
    NotQazo,
    /// The command is not recognized
    Unknown,
    /// A read, missed or later command without a valid prayer
    InvalidAction(ActionKind),
    /// An add or remove command with invalid arguments
    InvalidAdjustment(AdjustmentError),
    /// The location command has invalid coordinates
    InvalidLocation,
    /// The city command has no name
    InvalidCity,
}

const BOT_NAME: &str = "qazo";

impl Command {
    /// Parses a message string into a Command.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The message is not a command format - [`CommandParsingError::UnableToParse`]
    /// - The command is for a different bot - [`CommandParsingError::NotQazo`]
    /// - The command is not recognized - [`CommandParsingError::Unknown`]
    /// - The arguments of a known command are invalid - the matching `Invalid*` variant
    pub fn parse(parser: &Parser, body: &str) -> Result<Self, CommandParsingError> {
        // For an unknown reason the parser ignores the last word, so we add a dummy word at the end
        let body = body.to_string() + " dummy";

        // This is normal to fails if the message is not a command
        let command = match parser.parse(&body) {
            Ok(cmd) => cmd,
            Err(_) => return Err(CommandParsingError::UnableToParse),
        };

        // Ignore commands that are not for the bot
        if command.name != BOT_NAME {
            return Err(CommandParsingError::NotQazo);
        }

        debug!("Parsing command: {:?}", command);

        // If no arguments, return help
        if command.arguments.is_empty() {
            return Ok(Command::Help);
        }

        match command.arguments[0].to_lowercase().as_str() {
            "help" => Ok(Command::Help),
            "read" => Self::parse_action(&command, ActionKind::Read),
            "missed" => Self::parse_action(&command, ActionKind::Missed),
            "later" => Self::parse_action(&command, ActionKind::Later),
            "today" => Ok(Command::Today),
            "times" => Ok(Command::Times),
            "summary" => Ok(Command::Summary),
            "reset" => Ok(Command::Reset),
            "add" => Self::parse_adjust(&command, Direction::Add),
            "remove" => Self::parse_adjust(&command, Direction::Remove),
            "location" => Self::parse_location(&command),
            "city" => Self::parse_city(&command),
            _ => Err(CommandParsingError::Unknown),
        }
    }

    fn parse_action(command: &ParserCommand, kind: ActionKind) -> Result<Self, CommandParsingError> {
        // 2 arguments: action and prayer
        let prayer = command
            .arguments
            .get(1)
            .and_then(|p| p.parse::<Prayer>().ok())
            .ok_or(CommandParsingError::InvalidAction(kind))?;

        Ok(Command::Action(PrayerAction::new(prayer, kind)))
    }

    fn parse_adjust(command: &ParserCommand, direction: Direction) -> Result<Self, CommandParsingError> {
        debug!("Parsing adjust command: {:?}", command);

        let args = &command.arguments[1..];
        let Some((kind, rest)) = args.split_first() else {
            return Err(CommandParsingError::InvalidAdjustment(
                AdjustmentError::NothingToApply,
            ));
        };

        let delta = match kind.to_lowercase().as_str() {
            "period" => period_delta(&rest.join(" "), direction),
            "counts" => counts_delta(rest, direction),
            "range" => match rest.split_first() {
                Some((range, prayers)) => range_delta(range, prayers, direction),
                None => Err(AdjustmentError::InvalidRange(String::new())),
            },
            _ => Err(AdjustmentError::NothingToApply),
        }
        .map_err(CommandParsingError::InvalidAdjustment)?;

        debug!("Parsed adjust command - {:?}: {}", direction, delta);
        Ok(Command::Adjust(direction, delta))
    }

    /// Accepts `<lat> <lon>` and `<lat>,<lon>`.
    fn parse_location(command: &ParserCommand) -> Result<Self, CommandParsingError> {
        let joined = command.arguments[1..].join(" ");
        let mut parts = joined
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty());

        let (Some(latitude), Some(longitude), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CommandParsingError::InvalidLocation);
        };
        let (Ok(latitude), Ok(longitude)) = (latitude.parse::<f64>(), longitude.parse::<f64>())
        else {
            return Err(CommandParsingError::InvalidLocation);
        };

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CommandParsingError::InvalidLocation);
        }
        Ok(Command::Location(latitude, longitude))
    }

    fn parse_city(command: &ParserCommand) -> Result<Self, CommandParsingError> {
        let name = command.arguments[1..].join(" ");
        if name.trim().is_empty() {
            return Err(CommandParsingError::InvalidCity);
        }
        Ok(Command::City(name.trim().to_string()))
    }
}

/// Formats a command error into a user-friendly message.
///
/// Returns `None` for errors that must not produce a response, such as
/// regular chat messages or commands for other bots.
pub fn format_command_error(error: CommandParsingError, cities: &[&str]) -> Option<String> {
    match error {
        CommandParsingError::Unknown => Some(format_unknown_command()),
        CommandParsingError::InvalidAction(kind) => Some(format_invalid_action(kind)),
        CommandParsingError::InvalidAdjustment(e) => Some(format_invalid_adjustment(&e)),
        CommandParsingError::InvalidLocation => Some(format_invalid_location()),
        CommandParsingError::InvalidCity => Some(format_invalid_city(cities)),
        CommandParsingError::UnableToParse | CommandParsingError::NotQazo => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_parser() -> Parser {
        Parser::new('!', '-')
    }

    #[test]
    fn test_parse_help_command() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!qazo help");
        assert!(matches!(result, Ok(Command::Help)));
    }

    #[test]
    fn test_parse_help_command_no_args() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!qazo");
        assert!(matches!(result, Ok(Command::Help)));
    }

    #[test]
    fn test_parse_action_commands() {
        let parser = create_parser();

        let result = Command::parse(&parser, "!qazo read fajr");
        assert_eq!(
            result.unwrap(),
            Command::Action(PrayerAction::new(Prayer::Fajr, ActionKind::Read))
        );

        let result = Command::parse(&parser, "!qazo missed xufton");
        assert_eq!(
            result.unwrap(),
            Command::Action(PrayerAction::new(Prayer::Isha, ActionKind::Missed))
        );

        let result = Command::parse(&parser, "!qazo later asr");
        assert_eq!(
            result.unwrap(),
            Command::Action(PrayerAction::new(Prayer::Asr, ActionKind::Later))
        );
    }

    #[test]
    fn test_parse_action_command_invalid_prayer() {
        let parser = create_parser();

        let result = Command::parse(&parser, "!qazo read breakfast");
        assert!(matches!(
            result,
            Err(CommandParsingError::InvalidAction(ActionKind::Read))
        ));

        let result = Command::parse(&parser, "!qazo missed");
        assert!(matches!(
            result,
            Err(CommandParsingError::InvalidAction(ActionKind::Missed))
        ));
    }

    #[test]
    fn test_parse_read_only_commands() {
        let parser = create_parser();
        assert!(matches!(Command::parse(&parser, "!qazo today"), Ok(Command::Today)));
        assert!(matches!(Command::parse(&parser, "!qazo times"), Ok(Command::Times)));
        assert!(matches!(Command::parse(&parser, "!qazo summary"), Ok(Command::Summary)));
        assert!(matches!(Command::parse(&parser, "!qazo reset"), Ok(Command::Reset)));
    }

    #[test]
    fn test_parse_add_period() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!qazo add period 1y 2m 3d");
        assert_eq!(
            result.unwrap(),
            Command::Adjust(Direction::Add, LedgerDelta::uniform(365 + 60 + 3))
        );
    }

    #[test]
    fn test_parse_remove_counts() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!qazo remove counts 1 0 2 0 3");
        assert_eq!(
            result.unwrap(),
            Command::Adjust(
                Direction::Remove,
                LedgerDelta::from_counts([-1, 0, -2, 0, -3])
            )
        );
    }

    #[test]
    fn test_parse_add_range() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!qazo add range 01.03.2025-03.03.2025 fajr isha");

        let mut expected = LedgerDelta::default();
        expected.add(Prayer::Fajr, 3);
        expected.add(Prayer::Isha, 3);
        assert_eq!(result.unwrap(), Command::Adjust(Direction::Add, expected));
    }

    #[test]
    fn test_parse_add_range_defaults_to_all_prayers() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!qazo add range 01.03.2025-02.03.2025");
        assert_eq!(
            result.unwrap(),
            Command::Adjust(Direction::Add, LedgerDelta::uniform(2))
        );
    }

    #[test]
    fn test_parse_adjust_invalid_input() {
        let parser = create_parser();

        let result = Command::parse(&parser, "!qazo add period soon");
        assert!(matches!(
            result,
            Err(CommandParsingError::InvalidAdjustment(AdjustmentError::InvalidPeriod(_)))
        ));

        let result = Command::parse(&parser, "!qazo add counts 1 2 3");
        assert!(matches!(
            result,
            Err(CommandParsingError::InvalidAdjustment(AdjustmentError::WrongCountArity(3)))
        ));

        let result = Command::parse(&parser, "!qazo remove range 05.03.2025-01.03.2025");
        assert!(matches!(
            result,
            Err(CommandParsingError::InvalidAdjustment(AdjustmentError::RangeReversed))
        ));

        let result = Command::parse(&parser, "!qazo add");
        assert!(matches!(result, Err(CommandParsingError::InvalidAdjustment(_))));
    }

    #[test]
    fn test_parse_location_command() {
        let parser = create_parser();

        let result = Command::parse(&parser, "!qazo location 41.3 69.24");
        assert_eq!(result.unwrap(), Command::Location(41.3, 69.24));

        let result = Command::parse(&parser, "!qazo location 41.3,69.24");
        assert_eq!(result.unwrap(), Command::Location(41.3, 69.24));
    }

    #[test]
    fn test_parse_location_command_invalid() {
        let parser = create_parser();

        let result = Command::parse(&parser, "!qazo location north");
        assert!(matches!(result, Err(CommandParsingError::InvalidLocation)));

        let result = Command::parse(&parser, "!qazo location 91 69");
        assert!(matches!(result, Err(CommandParsingError::InvalidLocation)));
    }

    #[test]
    fn test_parse_city_command() {
        let parser = create_parser();

        let result = Command::parse(&parser, "!qazo city Samarqand");
        assert_eq!(result.unwrap(), Command::City("Samarqand".to_string()));

        let result = Command::parse(&parser, "!qazo city");
        assert!(matches!(result, Err(CommandParsingError::InvalidCity)));
    }

    #[test]
    fn test_parse_unknown_command() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!qazo unknown");
        assert!(matches!(result, Err(CommandParsingError::Unknown)));
    }

    #[test]
    fn test_parse_not_qazo_command() {
        let parser = create_parser();
        let result = Command::parse(&parser, "!other_bot help");
        assert!(matches!(result, Err(CommandParsingError::NotQazo)));
    }

    #[test]
    fn test_parse_unable_to_parse() {
        let parser = create_parser();
        let result = Command::parse(&parser, "This is not a command");
        assert!(matches!(result, Err(CommandParsingError::UnableToParse)));
    }

    #[test]
    fn test_format_command_error() {
        let cities = ["Toshkent"];

        let result = format_command_error(CommandParsingError::Unknown, &cities);
        assert!(result.unwrap().contains("Unknown command"));

        let result = format_command_error(CommandParsingError::InvalidLocation, &cities);
        assert!(result.unwrap().contains("Invalid location"));

        let result = format_command_error(CommandParsingError::InvalidCity, &cities);
        assert!(result.unwrap().contains("Toshkent"));

        assert!(format_command_error(CommandParsingError::UnableToParse, &cities).is_none());
        assert!(format_command_error(CommandParsingError::NotQazo, &cities).is_none());
    }
}
