use std::fmt;

/// Escalation level of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// The prayer time has begun
    Announce,
    /// The prayer is current and still pending
    Pending,
    /// The window of the prayer is over and it is still pending
    Missed,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Announce, Tier::Pending, Tier::Missed];

    pub fn index(self) -> usize {
        match self {
            Tier::Announce => 0,
            Tier::Pending => 1,
            Tier::Missed => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Announce => "announce",
            Tier::Pending => "pending",
            Tier::Missed => "missed",
        };
        f.write_str(name)
    }
}
