use uuid::Uuid;

use tripbi_types::api::{BookingCompletionView, TripSummaryView, VoteTallyView};
use tripbi_types::models::{
    Booking, BookingStatus, Proposal, ProposalStatus, Reaction, ReactionValue, Vote, VoteValue,
};

/// Partition a proposal's votes by value and compute voting progress as a
/// percentage of trip members who have voted. Zero members means 0%.
pub fn tally_votes(votes: &[Vote], member_count: usize) -> VoteTallyView {
    let mut tally = VoteTallyView {
        yes: 0,
        no: 0,
        abstain: 0,
        total: votes.len(),
        progress_percent: 0,
    };
    for vote in votes {
        match vote.vote {
            VoteValue::Yes => tally.yes += 1,
            VoteValue::No => tally.no += 1,
            VoteValue::Abstain => tally.abstain += 1,
        }
    }
    if member_count > 0 {
        tally.progress_percent =
            ((votes.len() as f64 / member_count as f64) * 100.0).round() as u32;
    }
    tally
}

/// The single boundary through which reactions reach view models: returns only
/// the viewer's own reaction. Other members' reactions never leave this layer.
pub fn viewer_reaction(reactions: &[Reaction], viewer: Uuid) -> Option<ReactionValue> {
    reactions.iter().find(|r| r.user_id == viewer).map(|r| r.reaction)
}

/// Booking completion for one proposal across all trip members. Fractions are
/// of the member count (not the booking count) so the two-segment progress bar
/// leaves the unbooked remainder empty.
pub fn booking_completion(members: &[Uuid], bookings: &[&Booking]) -> BookingCompletionView {
    let confirmed = bookings.iter().filter(|b| b.status == BookingStatus::Confirmed).count();
    let pending = bookings.iter().filter(|b| b.status == BookingStatus::Pending).count();
    let not_booked: Vec<Uuid> = members
        .iter()
        .filter(|m| !bookings.iter().any(|b| b.user_id == **m))
        .copied()
        .collect();

    let member_count = members.len();
    let (confirmed_fraction, pending_fraction) = if member_count > 0 {
        (
            confirmed as f64 / member_count as f64,
            pending as f64 / member_count as f64,
        )
    } else {
        (0.0, 0.0)
    };

    BookingCompletionView {
        confirmed,
        pending,
        not_booked,
        confirmed_fraction,
        pending_fraction,
    }
}

/// Trip-level rollup for summary badges. Derived on demand, never stored.
pub fn trip_summary(proposals: &[Proposal], bookings: &[Booking]) -> TripSummaryView {
    TripSummaryView {
        decided_count: proposals
            .iter()
            .filter(|p| p.status == ProposalStatus::Decided)
            .count(),
        confirmed_bookings: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .count(),
        pending_bookings: bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Pending)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn vote(value: VoteValue) -> Vote {
        Vote {
            user_id: Uuid::new_v4(),
            vote: value,
            timestamp: Utc::now(),
        }
    }

    fn booking(user_id: Uuid, status: BookingStatus) -> Booking {
        let trip_id = Uuid::new_v4();
        let proposal_id = Uuid::new_v4();
        Booking {
            id: format!("{trip_id}-{proposal_id}-{user_id}"),
            trip_id,
            proposal_id,
            user_id,
            status,
            confirmation_number: None,
            proof_url: None,
            notes: None,
            booked_for_count: 1,
            booked_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tally_four_members_full_turnout() {
        let votes = vec![
            vote(VoteValue::Yes),
            vote(VoteValue::Yes),
            vote(VoteValue::Yes),
            vote(VoteValue::No),
        ];
        let tally = tally_votes(&votes, 4);
        assert_eq!((tally.yes, tally.no, tally.abstain), (3, 1, 0));
        assert_eq!(tally.progress_percent, 100);
    }

    #[test]
    fn test_tally_rounds_percentage() {
        let votes = vec![vote(VoteValue::Yes)];
        assert_eq!(tally_votes(&votes, 3).progress_percent, 33);
        let votes = vec![vote(VoteValue::Yes), vote(VoteValue::Abstain)];
        assert_eq!(tally_votes(&votes, 3).progress_percent, 67);
    }

    #[test]
    fn test_tally_zero_members_guard() {
        let votes = vec![vote(VoteValue::Yes)];
        assert_eq!(tally_votes(&votes, 0).progress_percent, 0);
        assert_eq!(tally_votes(&[], 0).progress_percent, 0);
    }

    #[test]
    fn test_viewer_reaction_only_own() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let reactions = vec![
            Reaction { user_id: other, reaction: ReactionValue::NotInterested, timestamp: Utc::now() },
            Reaction { user_id: me, reaction: ReactionValue::Interested, timestamp: Utc::now() },
        ];
        assert_eq!(viewer_reaction(&reactions, me), Some(ReactionValue::Interested));
        let stranger = Uuid::new_v4();
        assert_eq!(viewer_reaction(&reactions, stranger), None);
    }

    #[test]
    fn test_booking_completion_segments() {
        let members: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let b1 = booking(members[0], BookingStatus::Confirmed);
        let b2 = booking(members[1], BookingStatus::Pending);
        let completion = booking_completion(&members, &[&b1, &b2]);

        assert_eq!(completion.confirmed, 1);
        assert_eq!(completion.pending, 1);
        // A member who booked is out of "not booked" regardless of status
        assert_eq!(completion.not_booked, vec![members[2], members[3]]);
        assert_eq!(completion.confirmed_fraction, 0.25);
        assert_eq!(completion.pending_fraction, 0.25);
    }

    #[test]
    fn test_booking_completion_no_members() {
        let completion = booking_completion(&[], &[]);
        assert_eq!(completion.confirmed_fraction, 0.0);
        assert_eq!(completion.pending_fraction, 0.0);
        assert!(completion.not_booked.is_empty());
    }
}
