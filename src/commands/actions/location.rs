//! Location command handlers.
//!
//! Both commands resolve to one of the known cities. Coordinates keep their
//! exact value for the prayer time computation and take the city name and
//! timezone of the nearest city.

use log::debug;

use crate::{
    commands::{
        CommandEffect, CommandResult,
        markdown_response::{format_location_not_found, format_unknown_city},
    },
    geo::CityResolver,
    store::Location,
};

/// Moves the user to the city nearest to the coordinates.
pub fn handle_location(resolver: &CityResolver, latitude: f64, longitude: f64) -> CommandResult {
    debug!("handling location command: {}, {}", latitude, longitude);

    match resolver.resolve(latitude, longitude) {
        Some(city) => {
            let location = Location {
                latitude,
                longitude,
                ..city
            };
            CommandResult::with_effect(String::new(), CommandEffect::Relocate(location))
        }
        None => CommandResult::reply(format_location_not_found(latitude, longitude)),
    }
}

/// Moves the user to a known city picked by name.
pub fn handle_city(resolver: &CityResolver, name: &str) -> CommandResult {
    debug!("handling city command: {}", name);

    match resolver.find(name) {
        Some(location) => {
            CommandResult::with_effect(String::new(), CommandEffect::Relocate(location))
        }
        None => CommandResult::reply(format_unknown_city(name, &resolver.city_names())),
    }
}
