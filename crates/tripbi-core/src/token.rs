use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use tripbi_types::models::{Invitation, InvitationStatus, ShareableTimeline};

/// Token alphabet with visually confusable characters removed (0/O, 1/I/l).
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

pub const TOKEN_LENGTH: usize = 16;

/// Invitations expire 7 days after creation.
pub const INVITE_TTL_DAYS: i64 = 7;

/// Generate an unguessable share token. `rand::rng()` is a CSPRNG, so tokens
/// are not predictable from earlier ones.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

pub fn invitation_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(INVITE_TTL_DAYS)
}

/// Outcome of a token lookup. Re-validating never flips state: an expired
/// token stays expired, a missing one stays missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidity {
    Valid,
    Expired,
    NotFound,
}

/// Invitation validity at `now`. Expiry compares wall-clock time and wins over
/// the stored status field; an already-accepted invitation cannot be reused
/// and reads as expired.
pub fn validate_invitation(invitation: Option<&Invitation>, now: DateTime<Utc>) -> TokenValidity {
    let Some(invitation) = invitation else {
        return TokenValidity::NotFound;
    };
    if invitation.expires_at < now {
        return TokenValidity::Expired;
    }
    if invitation.status == InvitationStatus::Accepted {
        return TokenValidity::Expired;
    }
    TokenValidity::Valid
}

/// Shared-timeline validity at `now`. No acceptance flow; a missing expiry
/// means the link never expires.
pub fn validate_shared_timeline(
    timeline: Option<&ShareableTimeline>,
    now: DateTime<Utc>,
) -> TokenValidity {
    let Some(timeline) = timeline else {
        return TokenValidity::NotFound;
    };
    match timeline.expires_at {
        Some(expires_at) if expires_at < now => TokenValidity::Expired,
        _ => TokenValidity::Valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn invitation(created_at: DateTime<Utc>, status: InvitationStatus) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            trip_name: "Tokyo 2025".to_string(),
            email: None,
            token: generate_token(),
            status,
            created_by: Uuid::new_v4(),
            created_at,
            expires_at: invitation_expiry(created_at),
            accepted_by: None,
            accepted_at: None,
        }
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
        // No confusable characters
        for banned in ['0', 'O', '1', 'I', 'l'] {
            assert!(!token.contains(banned));
        }
    }

    #[test]
    fn test_tokens_are_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invitation_expired_by_clock_despite_pending_status() {
        let created = Utc::now() - Duration::days(8);
        let inv = invitation(created, InvitationStatus::Pending);
        assert_eq!(validate_invitation(Some(&inv), Utc::now()), TokenValidity::Expired);
    }

    #[test]
    fn test_invitation_accepted_reads_expired() {
        let inv = invitation(Utc::now(), InvitationStatus::Accepted);
        assert_eq!(validate_invitation(Some(&inv), Utc::now()), TokenValidity::Expired);
    }

    #[test]
    fn test_invitation_valid_within_window() {
        let inv = invitation(Utc::now() - Duration::days(6), InvitationStatus::Pending);
        assert_eq!(validate_invitation(Some(&inv), Utc::now()), TokenValidity::Valid);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let now = Utc::now();
        let expired = invitation(now - Duration::days(30), InvitationStatus::Pending);
        for _ in 0..3 {
            assert_eq!(validate_invitation(Some(&expired), now), TokenValidity::Expired);
            assert_eq!(validate_invitation(None, now), TokenValidity::NotFound);
        }
    }

    #[test]
    fn test_shared_timeline_validity() {
        let now = Utc::now();
        let mut shared = ShareableTimeline {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            trip_name: "Tokyo 2025".to_string(),
            destination: "Tokyo".to_string(),
            start_date: now,
            end_date: now,
            token: generate_token(),
            created_by: Uuid::new_v4(),
            created_at: now,
            expires_at: None,
            proposals: vec![],
        };
        assert_eq!(validate_shared_timeline(Some(&shared), now), TokenValidity::Valid);

        shared.expires_at = Some(now - Duration::hours(1));
        assert_eq!(validate_shared_timeline(Some(&shared), now), TokenValidity::Expired);

        assert_eq!(validate_shared_timeline(None, now), TokenValidity::NotFound);
    }
}
