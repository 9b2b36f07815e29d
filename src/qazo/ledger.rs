//! The per user qazo ledger and signed ledger deltas.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{prayers::Prayer, store::UserId};

/// Debt of missed prayers of one user.
///
/// Holds one counter per prayer plus the total. Every mutation goes through
/// [`QazoLedger::apply`] which keeps `total` equal to the sum of the
/// counters and clamps every counter at zero. A stored ledger whose total
/// does not match its counters is rejected on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLedger")]
pub struct QazoLedger {
    pub user_id: UserId,
    counts: [u64; 5],
    total: u64,
}

#[derive(Deserialize)]
struct RawLedger {
    user_id: UserId,
    counts: [u64; 5],
    total: u64,
}

impl TryFrom<RawLedger> for QazoLedger {
    type Error = String;

    fn try_from(raw: RawLedger) -> Result<Self, Self::Error> {
        let sum = raw.counts.iter().try_fold(0u64, |acc, c| acc.checked_add(*c));
        if sum != Some(raw.total) {
            return Err(format!(
                "qazo total {} of user {} does not match its counters {:?}",
                raw.total, raw.user_id, raw.counts
            ));
        }
        Ok(QazoLedger {
            user_id: raw.user_id,
            counts: raw.counts,
            total: raw.total,
        })
    }
}

impl QazoLedger {
    pub fn new(user_id: UserId) -> Self {
        QazoLedger {
            user_id,
            counts: [0; 5],
            total: 0,
        }
    }

    pub fn count(&self, prayer: Prayer) -> u64 {
        self.counts[prayer.index()]
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Adds `delta` to the counter of `prayer`, clamping at zero.
    ///
    /// Returns the change actually applied, which differs from `delta` only
    /// when a removal would have made the counter negative.
    pub fn apply(&mut self, prayer: Prayer, delta: i64) -> i64 {
        let counter = &mut self.counts[prayer.index()];
        let before = *counter;
        *counter = if delta >= 0 {
            before.saturating_add(delta.unsigned_abs())
        } else {
            before.saturating_sub(delta.unsigned_abs())
        };

        if *counter >= before {
            self.total = self.total.saturating_add(*counter - before);
        } else {
            self.total -= before - *counter;
        }

        *counter as i64 - before as i64
    }

    /// Applies every entry of `delta`.
    pub fn apply_delta(&mut self, delta: &LedgerDelta) {
        for (prayer, value) in delta.iter() {
            self.apply(prayer, value);
        }
    }

    /// Zeroes every counter and the total.
    pub fn reset(&mut self) {
        self.counts = [0; 5];
        self.total = 0;
    }

    pub fn summary(&self) -> QazoSummary {
        QazoSummary {
            total: self.total,
            per_prayer: Prayer::ALL.map(|p| (p, self.count(p))),
        }
    }
}

/// Read only view of a ledger, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QazoSummary {
    pub total: u64,
    pub per_prayer: [(Prayer, u64); 5],
}

/// Signed per prayer change to apply to a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerDelta([i64; 5]);

impl LedgerDelta {
    /// The same `amount` for each of the five prayers.
    pub fn uniform(amount: i64) -> Self {
        LedgerDelta([amount; 5])
    }

    pub fn single(prayer: Prayer, amount: i64) -> Self {
        let mut delta = LedgerDelta::default();
        delta.add(prayer, amount);
        delta
    }

    pub fn from_counts(counts: [i64; 5]) -> Self {
        LedgerDelta(counts)
    }

    pub fn add(&mut self, prayer: Prayer, amount: i64) {
        let slot = &mut self.0[prayer.index()];
        *slot = slot.saturating_add(amount);
    }

    pub fn get(&self, prayer: Prayer) -> i64 {
        self.0[prayer.index()]
    }

    /// The opposite delta, used by the removal flows.
    pub fn negated(self) -> Self {
        LedgerDelta(self.0.map(|v| v.saturating_neg()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0)
    }

    /// Non zero entries in prayer order.
    pub fn iter(&self) -> impl Iterator<Item = (Prayer, i64)> + '_ {
        Prayer::ALL
            .into_iter()
            .map(|p| (p, self.get(p)))
            .filter(|(_, v)| *v != 0)
    }
}

impl fmt::Display for LedgerDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .iter()
            .map(|(p, v)| format!("{p} {v:+}"))
            .collect::<Vec<_>>();
        f.write_str(&parts.join(", "))
    }
}
