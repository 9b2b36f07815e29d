//! Command orchestration and execution.
//!
//! This module provides the [`Commander`] struct, which serves as the main entry point
//! for processing bot commands. It coordinates command parsing and execution, routing
//! commands to their appropriate handlers.
//!
//! # Flow
//!
//! ```text
//! Matrix Message → parse() → Command → execute() → CommandResult
//! ```

use command_parser::Parser;

use crate::{
    commands::{
        CommandContext, CommandParseError, CommandResult,
        actions::{
            handle_adjust, handle_city, handle_help, handle_location, handle_prayer, handle_reset,
            handle_summary, handle_times, handle_today,
        },
        command::{Command, format_command_error},
    },
    geo::CityResolver,
    store::Location,
};

/// Command orchestrator for parsing and executing bot commands.
pub struct Commander {
    /// Command parser for processing user commands
    parser: Parser,
    /// Known cities for the location commands
    cities: CityResolver,
}

impl Commander {
    /// Creates a new Commander instance with a configured command parser.
    ///
    /// The parser is configured to recognize commands starting with `!` as the command
    /// prefix and `-` as the option prefix.
    ///
    /// # Arguments
    ///
    /// * `radius_km` - Largest distance between coordinates and the city they resolve to
    pub fn new(radius_km: f64) -> Self {
        let parser = Parser::new('!', '-');
        Commander {
            parser,
            cities: CityResolver::new(radius_km),
        }
    }

    /// Parses a Matrix message body into a structured command.
    ///
    /// # Returns
    ///
    /// * `Ok(Command)` - Successfully parsed and validated command
    /// * `Err(CommandParseError::NotForBot)` - Message is not a command or for a different bot
    /// * `Err(CommandParseError::InvalidCommand)` - Command syntax is invalid
    pub fn parse(&self, body: &str) -> Result<Command, CommandParseError> {
        Command::parse(&self.parser, body).map_err(|error| {
            // Return silently if the command is not for the bot
            // Otherwise, send an error message
            match format_command_error(error, &self.cities.city_names()) {
                Some(message) => CommandParseError::InvalidCommand(message),
                None => CommandParseError::NotForBot,
            }
        })
    }

    /// Executes a parsed command and returns the result.
    ///
    /// # Command Handlers
    ///
    /// - [`Command::Help`] → [`handle_help`]
    /// - [`Command::Action`] → [`handle_prayer`]
    /// - [`Command::Today`] → [`handle_today`]
    /// - [`Command::Times`] → [`handle_times`]
    /// - [`Command::Summary`] → [`handle_summary`]
    /// - [`Command::Reset`] → [`handle_reset`]
    /// - [`Command::Adjust`] → [`handle_adjust`]
    /// - [`Command::Location`] → [`handle_location`]
    /// - [`Command::City`] → [`handle_city`]
    pub fn execute(&self, command: &Command, context: &CommandContext) -> CommandResult {
        match command {
            Command::Help => handle_help(),
            Command::Action(action) => handle_prayer(context, *action),
            Command::Today => handle_today(context),
            Command::Times => handle_times(context),
            Command::Summary => handle_summary(context),
            Command::Reset => handle_reset(),
            Command::Adjust(direction, delta) => handle_adjust(*direction, *delta),
            Command::Location(latitude, longitude) => {
                handle_location(&self.cities, *latitude, *longitude)
            }
            Command::City(name) => handle_city(&self.cities, name),
        }
    }

    /// Looks a city up by name, for the default location of new users.
    pub fn find_city(&self, name: &str) -> Option<Location> {
        self.cities.find(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::{CommandEffect, tests::create_test_context},
        messaging::{ActionKind, PrayerAction},
        prayers::{Prayer, times::tests::hm},
        qazo::{Direction, LedgerDelta},
    };

    fn create_commander() -> Commander {
        Commander::new(100.0)
    }

    #[test]
    fn test_parse_valid_help_command() {
        let commander = create_commander();
        let result = commander.parse("!qazo help");
        assert!(matches!(result, Ok(Command::Help)));
    }

    #[test]
    fn test_parse_not_for_bot() {
        let commander = create_commander();

        let result = commander.parse("Hello, world!");
        assert!(matches!(result, Err(CommandParseError::NotForBot)));

        let result = commander.parse("!other_bot help");
        assert!(matches!(result, Err(CommandParseError::NotForBot)));
    }

    #[test]
    fn test_parse_invalid_command() {
        let commander = create_commander();

        let result = commander.parse("!qazo dance");
        assert!(matches!(result, Err(CommandParseError::InvalidCommand(_))));

        match commander.parse("!qazo city") {
            Err(CommandParseError::InvalidCommand(message)) => {
                assert!(message.contains("Samarqand"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_execute_help() {
        let commander = create_commander();
        let context = create_test_context(hm(13, 0));

        let result = commander.execute(&Command::Help, &context);

        assert!(result.effect.is_none());
        assert!(result.response.contains("Commands:"));
    }

    #[test]
    fn test_execute_missed_press() {
        let commander = create_commander();
        let context = create_test_context(hm(12, 41));
        let command = commander.parse("!qazo missed fajr").unwrap();

        let result = commander.execute(&command, &context);

        assert_eq!(
            result.effect,
            Some(CommandEffect::Prayer(PrayerAction::new(
                Prayer::Fajr,
                ActionKind::Missed
            )))
        );
    }

    #[test]
    fn test_execute_adjust() {
        let commander = create_commander();
        let context = create_test_context(hm(13, 0));
        let command = commander.parse("!qazo add counts 1 1 1 1 1").unwrap();

        let result = commander.execute(&command, &context);

        assert_eq!(
            result.effect,
            Some(CommandEffect::Adjust(Direction::Add, LedgerDelta::uniform(1)))
        );
    }

    #[test]
    fn test_execute_city() {
        let commander = create_commander();
        let context = create_test_context(hm(13, 0));
        let command = commander.parse("!qazo city Samarkand").unwrap();

        let result = commander.execute(&command, &context);

        assert!(matches!(
            result.effect,
            Some(CommandEffect::Relocate(ref location)) if location.city == "Samarqand"
        ));
    }

    #[test]
    fn test_find_city() {
        let commander = create_commander();
        assert_eq!(commander.find_city("Tashkent").unwrap().city, "Toshkent");
        assert!(commander.find_city("Atlantis").is_none());
    }
}
