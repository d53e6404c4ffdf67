use thiserror::Error;
use tripbi_types::models::ProposalStatus;

/// A rejected proposal status transition. The proposal is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid status transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: ProposalStatus,
    pub to: ProposalStatus,
}

/// Proposal status state machine: proposed -> discussing -> decided, with one
/// backward edge discussing -> proposed. Decided is terminal, and proposed
/// cannot jump straight to decided.
pub fn is_allowed(from: ProposalStatus, to: ProposalStatus) -> bool {
    use ProposalStatus::*;
    matches!(
        (from, to),
        (Proposed, Discussing) | (Discussing, Proposed) | (Discussing, Decided)
    )
}

/// Validate a transition request, returning the new status or an error.
pub fn transition(
    from: ProposalStatus,
    to: ProposalStatus,
) -> Result<ProposalStatus, InvalidTransition> {
    if is_allowed(from, to) {
        Ok(to)
    } else {
        Err(InvalidTransition { from, to })
    }
}

/// Vote casting is permitted in all states except decided, which shows a
/// read-only tally.
pub fn voting_open(status: ProposalStatus) -> bool {
    status != ProposalStatus::Decided
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProposalStatus::*;

    #[test]
    fn test_forward_path() {
        assert_eq!(transition(Proposed, Discussing), Ok(Discussing));
        assert_eq!(transition(Discussing, Decided), Ok(Decided));
    }

    #[test]
    fn test_backward_from_discussing_only() {
        assert_eq!(transition(Discussing, Proposed), Ok(Proposed));
        assert!(transition(Decided, Discussing).is_err());
        assert!(transition(Decided, Proposed).is_err());
    }

    #[test]
    fn test_no_skipping_to_decided() {
        let err = transition(Proposed, Decided).unwrap_err();
        assert_eq!(err, InvalidTransition { from: Proposed, to: Decided });
    }

    #[test]
    fn test_self_transitions_rejected() {
        for status in [Proposed, Discussing, Decided] {
            assert!(transition(status, status).is_err());
        }
    }

    #[test]
    fn test_voting_open() {
        assert!(voting_open(Proposed));
        assert!(voting_open(Discussing));
        assert!(!voting_open(Decided));
    }
}
