//! Resolution of coordinates and city names to a known [`Location`].

use chrono_tz::Tz;
use log::debug;

use crate::store::Location;

const EARTH_RADIUS_KM: f64 = 6371.0;
const COUNTRY: &str = "Uzbekistan";

struct City {
    name: &'static str,
    /// Other spellings accepted by [`CityResolver::find`]
    aliases: &'static [&'static str],
    latitude: f64,
    longitude: f64,
    timezone: Tz,
}

static CITIES: [City; 12] = [
    City {
        name: "Toshkent",
        aliases: &["tashkent"],
        latitude: 41.2995,
        longitude: 69.2401,
        timezone: chrono_tz::Asia::Tashkent,
    },
    City {
        name: "Samarqand",
        aliases: &["samarkand"],
        latitude: 39.6542,
        longitude: 66.9597,
        timezone: chrono_tz::Asia::Samarkand,
    },
    City {
        name: "Buxoro",
        aliases: &["bukhara"],
        latitude: 39.7681,
        longitude: 64.4555,
        timezone: chrono_tz::Asia::Samarkand,
    },
    City {
        name: "Farg'ona",
        aliases: &["fargona", "fergana"],
        latitude: 40.3842,
        longitude: 71.7845,
        timezone: chrono_tz::Asia::Tashkent,
    },
    City {
        name: "Andijon",
        aliases: &["andijan"],
        latitude: 40.7821,
        longitude: 72.3442,
        timezone: chrono_tz::Asia::Tashkent,
    },
    City {
        name: "Namangan",
        aliases: &[],
        latitude: 40.9983,
        longitude: 71.6726,
        timezone: chrono_tz::Asia::Tashkent,
    },
    City {
        name: "Qarshi",
        aliases: &["karshi"],
        latitude: 38.8606,
        longitude: 65.7896,
        timezone: chrono_tz::Asia::Samarkand,
    },
    City {
        name: "Nukus",
        aliases: &[],
        latitude: 42.4531,
        longitude: 59.6103,
        timezone: chrono_tz::Asia::Tashkent,
    },
    City {
        name: "Jizzax",
        aliases: &["jizzakh", "jizzah"],
        latitude: 40.1153,
        longitude: 67.8422,
        timezone: chrono_tz::Asia::Tashkent,
    },
    City {
        name: "Guliston",
        aliases: &["gulistan"],
        latitude: 39.4954,
        longitude: 67.3745,
        timezone: chrono_tz::Asia::Tashkent,
    },
    City {
        name: "Termiz",
        aliases: &["termez"],
        latitude: 37.2242,
        longitude: 67.2783,
        timezone: chrono_tz::Asia::Samarkand,
    },
    City {
        name: "Navoiy",
        aliases: &["navoi"],
        latitude: 40.0947,
        longitude: 65.3777,
        timezone: chrono_tz::Asia::Samarkand,
    },
];

impl City {
    fn location(&self) -> Location {
        Location {
            city: self.name.to_string(),
            country: COUNTRY.to_string(),
            timezone: self.timezone,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Great circle distance in kilometers between two coordinates.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Maps coordinates or names to one of the built-in cities.
pub struct CityResolver {
    radius_km: f64,
}

impl CityResolver {
    pub fn new(radius_km: f64) -> Self {
        CityResolver { radius_km }
    }

    /// Returns the nearest known city within the radius of the resolver.
    ///
    /// Users far from every known city get `None` and keep their location.
    pub fn resolve(&self, latitude: f64, longitude: f64) -> Option<Location> {
        let (city, distance) = CITIES
            .iter()
            .map(|c| (c, haversine_km(latitude, longitude, c.latitude, c.longitude)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))?;

        debug!(
            "nearest city of ({}, {}) is {} at {:.1} km",
            latitude, longitude, city.name, distance
        );
        (distance <= self.radius_km).then(|| city.location())
    }

    /// Looks a city up by name or alias, ignoring case.
    pub fn find(&self, name: &str) -> Option<Location> {
        let name = name.trim();
        CITIES.iter().find(|c| c.matches(name)).map(City::location)
    }

    /// Names of the known cities, for help messages.
    pub fn city_names(&self) -> Vec<&'static str> {
        CITIES.iter().map(|c| c.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Tashkent to Samarkand is roughly 270 km as the crow flies
        let distance = haversine_km(41.2995, 69.2401, 39.6542, 66.9597);
        assert!((260.0..280.0).contains(&distance), "{distance}");
    }

    #[test]
    fn test_resolve_nearest_city() {
        let resolver = CityResolver::new(100.0);

        let location = resolver.resolve(41.31, 69.28).unwrap();

        assert_eq!(location.city, "Toshkent");
        assert_eq!(location.country, "Uzbekistan");
        assert_eq!(location.timezone, chrono_tz::Asia::Tashkent);
    }

    #[test]
    fn test_resolve_uses_city_timezone() {
        let resolver = CityResolver::new(100.0);

        let location = resolver.resolve(39.77, 64.42).unwrap();

        assert_eq!(location.city, "Buxoro");
        assert_eq!(location.timezone, chrono_tz::Asia::Samarkand);
    }

    #[test]
    fn test_resolve_out_of_radius() {
        let resolver = CityResolver::new(100.0);
        // Paris
        assert!(resolver.resolve(48.8566, 2.3522).is_none());
    }

    #[test]
    fn test_find_by_name_and_alias() {
        let resolver = CityResolver::new(100.0);

        assert_eq!(resolver.find("samarqand").unwrap().city, "Samarqand");
        assert_eq!(resolver.find("Tashkent").unwrap().city, "Toshkent");
        assert_eq!(resolver.find(" FERGANA ").unwrap().city, "Farg'ona");
        assert!(resolver.find("Atlantis").is_none());
    }

    #[test]
    fn test_city_names() {
        let resolver = CityResolver::new(100.0);
        let names = resolver.city_names();
        assert_eq!(names.len(), 12);
        assert!(names.contains(&"Nukus"));
    }
}
