use std::str::FromStr;

use crate::entities::Status;
use crate::error::{invalid_transition_error, validation_error, Error};

/// Which status changes a booking accepts.
///
/// `Unrestricted` only requires the target to be a known status, so admins can
/// correct a booking from any state (including re-applying the current one).
/// `Forward` follows the trip lifecycle:
///
/// ```text
/// pending -> confirmed -> in_progress -> completed
///    \            \             \
///     +------------+-------------+--> cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionPolicy {
    Unrestricted,
    Forward,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self::Unrestricted
    }
}

impl TransitionPolicy {
    pub fn allows(&self, from: Status, to: Status) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Forward => matches!(
                (from, to),
                (Status::Pending, Status::Confirmed)
                    | (Status::Confirmed, Status::InProgress)
                    | (Status::InProgress, Status::Completed)
            ) || (to == Status::Cancelled && !from.is_terminal()),
        }
    }

    pub fn check(&self, from: Status, to: Status) -> Result<(), Error> {
        if self.allows(from, to) {
            return Ok(());
        }

        Err(invalid_transition_error(from.name(), to.name()))
    }
}

impl FromStr for TransitionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unrestricted" => Ok(Self::Unrestricted),
            "forward" => Ok(Self::Forward),
            _ => Err(validation_error(format!("unknown transition policy: {}", s))),
        }
    }
}

#[test]
fn unrestricted_policy_test() {
    let policy = TransitionPolicy::Unrestricted;

    for from in Status::ALL {
        for to in Status::ALL {
            assert!(policy.check(from, to).is_ok());
        }
    }
}

#[test]
fn forward_policy_test() {
    let policy = TransitionPolicy::Forward;

    assert!(policy.allows(Status::Pending, Status::Confirmed));
    assert!(policy.allows(Status::Confirmed, Status::InProgress));
    assert!(policy.allows(Status::InProgress, Status::Completed));

    assert!(policy.allows(Status::Pending, Status::Cancelled));
    assert!(policy.allows(Status::Confirmed, Status::Cancelled));
    assert!(policy.allows(Status::InProgress, Status::Cancelled));

    assert!(!policy.allows(Status::Pending, Status::Completed));
    assert!(!policy.allows(Status::Confirmed, Status::Confirmed));
    assert!(!policy.allows(Status::Completed, Status::Pending));
    assert!(!policy.allows(Status::Cancelled, Status::Cancelled));
    assert!(!policy.allows(Status::Completed, Status::Cancelled));

    let err = policy.check(Status::Completed, Status::Pending).unwrap_err();
    assert!(err.is_invalid_status_error());
}

#[test]
fn policy_parse_test() {
    assert_eq!(
        "forward".parse::<TransitionPolicy>().unwrap(),
        TransitionPolicy::Forward
    );
    assert_eq!(
        "Unrestricted".parse::<TransitionPolicy>().unwrap(),
        TransitionPolicy::Unrestricted
    );
    assert!("strict".parse::<TransitionPolicy>().is_err());
}
