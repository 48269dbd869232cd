//! Access-code quota models.

use serde::{Deserialize, Serialize};

/// Metered record behind one access code.
///
/// `remaining` may go negative in the store when concurrent requests race past
/// validation; it is reported floored at zero but never corrected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessCodeRecord {
    /// Quota ceiling at issuance
    pub total: i64,
    /// Generations still permitted
    pub remaining: i64,
    /// Operator kill switch
    pub valid: bool,
}

impl AccessCodeRecord {
    /// Fresh, enabled record with a full balance.
    pub fn issue(total: i64) -> Self {
        Self { total, remaining: total, valid: true }
    }

    pub fn has_quota(&self) -> bool {
        self.remaining > 0
    }

    /// Display view of the balance.
    pub fn quota(&self) -> Quota {
        Quota::new(self.total, self.remaining)
    }

    /// Display view including the enabled flag, as returned by the verify endpoint.
    pub fn verified_quota(&self) -> VerifiedQuota {
        VerifiedQuota { total: self.total, remaining: self.remaining.max(0), valid: self.valid }
    }
}

/// Balance reported to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quota {
    pub total: i64,
    pub remaining: i64,
}

impl Quota {
    /// Build a display quota; `remaining` is floored at zero.
    pub fn new(total: i64, remaining: i64) -> Self {
        Self { total, remaining: remaining.max(0) }
    }
}

/// Balance plus enabled flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedQuota {
    pub total: i64,
    pub remaining: i64,
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_floors_negative_remaining() {
        let quota = Quota::new(10, -2);
        assert_eq!(quota.remaining, 0);
        assert_eq!(quota.total, 10);
    }

    #[test]
    fn test_issue_starts_full_and_enabled() {
        let record = AccessCodeRecord::issue(25);
        assert_eq!(record.remaining, 25);
        assert!(record.valid);
        assert!(record.has_quota());
    }

    #[test]
    fn test_exhausted_record_has_no_quota() {
        let record = AccessCodeRecord { total: 10, remaining: 0, valid: true };
        assert!(!record.has_quota());
        assert_eq!(record.quota(), Quota { total: 10, remaining: 0 });
    }
}
