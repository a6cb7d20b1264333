//! Reconciling source cardinality with destination shape

use crate::writer::DestinationPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when several values meet a destination that holds one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplicityPolicy {
    /// Write the first value, ignore the rest
    #[default]
    FirstValue,
    /// Write the last value
    LastValue,
    /// Write nothing
    Skip,
}

impl fmt::Display for MultiplicityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiplicityPolicy::FirstValue => write!(f, "first_value"),
            MultiplicityPolicy::LastValue => write!(f, "last_value"),
            MultiplicityPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Writes to perform for one mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePlan {
    /// One write per value, with repeat index = value position
    Each,
    /// A single non-repeated write of the value at this position
    One(usize),
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub plan: WritePlan,
    /// Several values met a non-repeatable destination
    pub mismatch: bool,
}

/// Decide how `count` resolved values are written to `destination`
pub fn reconcile(
    destination: &DestinationPath,
    source_multi: bool,
    count: usize,
    policy: MultiplicityPolicy,
) -> Reconciliation {
    if count == 0 {
        return Reconciliation { plan: WritePlan::Nothing, mismatch: false };
    }

    let repeatable =
        destination.has_repeat() || (destination.appends_implicitly() && source_multi);
    if repeatable {
        return Reconciliation { plan: WritePlan::Each, mismatch: false };
    }
    if count == 1 {
        return Reconciliation { plan: WritePlan::One(0), mismatch: false };
    }

    let plan = match policy {
        MultiplicityPolicy::FirstValue => WritePlan::One(0),
        MultiplicityPolicy::LastValue => WritePlan::One(count - 1),
        MultiplicityPolicy::Skip => WritePlan::Nothing,
    };
    Reconciliation { plan, mismatch: true }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest(path: &str) -> DestinationPath {
        DestinationPath::parse(path).unwrap()
    }

    #[test]
    fn test_explicit_repeat_writes_each() {
        for count in [1, 3] {
            let rec = reconcile(&dest("$.items[*].id"), true, count, MultiplicityPolicy::FirstValue);
            assert_eq!(rec.plan, WritePlan::Each);
            assert!(!rec.mismatch);
        }
    }

    #[test]
    fn test_element_paths_append_for_multi_sources() {
        let rec = reconcile(&dest("/R/Item"), true, 2, MultiplicityPolicy::Skip);
        assert_eq!(rec.plan, WritePlan::Each);

        let rec = reconcile(&dest("/R/Item"), false, 1, MultiplicityPolicy::Skip);
        assert_eq!(rec.plan, WritePlan::One(0));
    }

    #[test]
    fn test_mismatch_follows_policy() {
        let single = dest("$.id");
        let first = reconcile(&single, true, 3, MultiplicityPolicy::FirstValue);
        assert_eq!(first, Reconciliation { plan: WritePlan::One(0), mismatch: true });

        let last = reconcile(&single, true, 3, MultiplicityPolicy::LastValue);
        assert_eq!(last.plan, WritePlan::One(2));

        let skip = reconcile(&single, true, 3, MultiplicityPolicy::Skip);
        assert_eq!(skip.plan, WritePlan::Nothing);
        assert!(skip.mismatch);
    }

    #[test]
    fn test_zero_values_write_nothing() {
        let rec = reconcile(&dest("$.items[*]"), true, 0, MultiplicityPolicy::FirstValue);
        assert_eq!(rec, Reconciliation { plan: WritePlan::Nothing, mismatch: false });
    }
}
