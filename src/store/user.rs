//! Users known to the bot.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Internal identifier of a user, stable across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a user prays: used only to compute prayer times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub timezone: Tz,
    pub latitude: f64,
    pub longitude: f64,
}

/// A person whose prayers are tracked.
///
/// Created on first contact and never deleted. `blocked` users are ignored
/// by every reminder cadence until they talk to the bot again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Matrix user id, e.g. `@alice:matrix.org`
    pub matrix_id: String,
    /// Room where the user talks to the bot and receives reminders
    pub room_id: String,
    pub location: Location,
    pub blocked: bool,
    pub last_activity: DateTime<Utc>,
}

impl User {
    pub fn timezone(&self) -> Tz {
        self.location.timezone
    }
}
