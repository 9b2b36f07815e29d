//! Qazo (missed prayer) debt ledger and its manual adjustment flows.
//!
//! The ledger is mutated in exactly two ways: `+1` when a prayer transitions
//! to missed, and signed bulk deltas produced by the parsers of [`adjust`].
//! Both go through [`QazoLedger::apply`], which clamps at zero.

pub mod adjust;
mod ledger;

pub use crate::qazo::{
    adjust::{AdjustmentError, Direction},
    ledger::{LedgerDelta, QazoLedger, QazoSummary},
};
