//! Per-driver host applicability

use crate::driver::types::{EligibilityRule, HostClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Eligibility::Eligible
    }
}

/// Evaluate a driver's rule against the host class.
///
/// Deny rules make unknown hosts eligible, allow rules make them ineligible.
pub fn evaluate(rule: &EligibilityRule, host: &HostClass) -> Eligibility {
    let eligible = match rule {
        EligibilityRule::Deny(rules) => !rules.matches(host),
        EligibilityRule::Allow(rules) => rules.matches(host),
    };

    if eligible {
        Eligibility::Eligible
    } else {
        Eligibility::Ineligible
    }
}
