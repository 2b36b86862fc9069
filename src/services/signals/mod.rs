//! Trading signals service module.
//!
//! Provides the technical indicator calculations and the two scoring
//! policies that classify an indicator snapshot into a trade signal.

pub mod indicators;
pub mod scanner;
pub mod strength;
pub mod tally;

pub use scanner::scan_signals;
pub use strength::StrengthPolicy;
pub use tally::TallyPolicy;

use crate::types::{IndicatorSnapshot, Signal};
use chrono::{DateTime, Utc};

/// A scoring policy over one snapshot.
///
/// Policies are independent: each has its own gating rule and thresholds and
/// its own classification type.
pub trait SignalPolicy: Send + Sync {
    type Class: Clone + Send + Sync;

    /// Unique identifier for this policy.
    fn id(&self) -> &str;

    /// Classify the snapshot, stamping the signal with `evaluated_at`.
    /// `None` means no signal is emitted.
    fn evaluate(
        &self,
        snapshot: &IndicatorSnapshot,
        evaluated_at: DateTime<Utc>,
    ) -> Option<Signal<Self::Class>>;
}
