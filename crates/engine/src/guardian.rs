//! Last-guardian protection for required capabilities.
//!
//! Some capability must never go empty: the system always keeps at least one
//! active super admin and at least one active currency. The verdict here is
//! pure; the ops layer evaluates it **inside** the same transaction as the
//! mutation it guards, so two concurrent removals cannot both observe a count
//! of two and proceed.

use serde::{Deserialize, Serialize};

/// Outcome of asking "may this holder be removed from the capability set?".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardianVerdict {
    /// The target does not hold the capability; the rule does not apply.
    NotApplicable,
    /// Other active holders remain; the removal may proceed.
    Allowed,
    /// The target is the last active holder; the removal is vetoed.
    Blocked,
}

impl GuardianVerdict {
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

/// Evaluates the rule for a proposed removal/demotion.
///
/// `active_holders` is the current count of active capability holders,
/// including the target when `target_is_holder` is true.
#[must_use]
pub fn check(active_holders: u64, target_is_holder: bool) -> GuardianVerdict {
    if !target_is_holder {
        return GuardianVerdict::NotApplicable;
    }
    if active_holders <= 1 {
        GuardianVerdict::Blocked
    } else {
        GuardianVerdict::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_holder_is_not_applicable() {
        assert_eq!(check(1, false), GuardianVerdict::NotApplicable);
        assert_eq!(check(0, false), GuardianVerdict::NotApplicable);
    }

    #[test]
    fn last_holder_is_blocked() {
        assert!(check(1, true).is_blocked());
    }

    #[test]
    fn removal_is_allowed_while_others_remain() {
        assert_eq!(check(2, true), GuardianVerdict::Allowed);
        assert_eq!(check(5, true), GuardianVerdict::Allowed);
    }
}
