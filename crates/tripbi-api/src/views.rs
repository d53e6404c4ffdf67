//! Derived-state orchestrator: turns one consistent database snapshot into
//! the per-viewer trip view the client renders. All aggregation (tallies,
//! booking completion, timeline grouping) happens here, never in handlers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tripbi_core::{engagement, status, timeline, timezone};
use tripbi_db::Database;
use tripbi_db::queries::assemble_snapshot;
use tripbi_types::api::{ProposalView, ScheduleView, TimelineDay, TripView};
use tripbi_types::models::{Booking, Proposal, Trip};

use crate::error::{ApiError, ApiResult};

pub fn build_trip_view(
    db: &Database,
    trip_id: Uuid,
    viewer: Uuid,
    now: DateTime<Utc>,
) -> ApiResult<TripView> {
    let rows = db
        .load_trip_snapshot(&trip_id.to_string())?
        .ok_or(ApiError::NotFound("trip"))?;
    let (trip, proposals, bookings) = assemble_snapshot(rows)?;

    // Bookings for proposals that no longer exist are dropped from every
    // derived view; the rows stay until the cascade removes them.
    let live_bookings: Vec<&Booking> = bookings
        .iter()
        .filter(|b| proposals.iter().any(|p| p.id == b.proposal_id))
        .collect();

    let proposal_views: Vec<ProposalView> = proposals
        .iter()
        .map(|p| proposal_view(p, &trip, &live_bookings, viewer))
        .collect();

    let timeline_days = build_timeline(&proposals);
    let summary = engagement::trip_summary(&proposals, &bookings);

    let (timezone_offset_hours, timezone_offset_label) = match &trip.timezone_settings {
        Some(tz) => {
            let hours = timezone::offset_hours(&tz.home_timezone, &tz.destination_timezone, now);
            (Some(hours), Some(timezone::format_offset(hours)))
        }
        None => (None, None),
    };

    let bookings = live_bookings.into_iter().cloned().collect();

    Ok(TripView {
        trip,
        proposals: proposal_views,
        bookings,
        timeline: timeline_days,
        summary,
        timezone_offset_hours,
        timezone_offset_label,
    })
}

fn proposal_view(
    proposal: &Proposal,
    trip: &Trip,
    bookings: &[&Booking],
    viewer: Uuid,
) -> ProposalView {
    let proposal_bookings: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.proposal_id == proposal.id)
        .copied()
        .collect();

    ProposalView {
        id: proposal.id,
        trip_id: proposal.trip_id,
        category: proposal.category,
        status: proposal.status,
        title: proposal.title.clone(),
        description: proposal.description.clone(),
        details: proposal.details.clone(),
        created_by: proposal.created_by,
        created_at: proposal.created_at,
        updated_at: proposal.updated_at,
        scheduled_date: proposal.scheduled_date,
        scheduled_time: proposal.scheduled_time.clone(),
        votes: proposal.votes.clone(),
        tally: engagement::tally_votes(&proposal.votes, trip.members.len()),
        voting_open: status::voting_open(proposal.status),
        // Other members' reactions never cross this boundary
        viewer_reaction: engagement::viewer_reaction(&proposal.reactions, viewer),
        comments: proposal.comments.clone(),
        booking_completion: engagement::booking_completion(&trip.members, &proposal_bookings),
        schedule: schedule_view(proposal, trip),
    }
}

/// Render a dated proposal's schedule. The stored time-of-day is destination
/// wall clock; the labels read it as written, and the optional home label
/// converts it onto the home clock.
fn schedule_view(proposal: &Proposal, trip: &Trip) -> Option<ScheduleView> {
    let date = proposal.scheduled_date?;
    let effective_at = timezone::combine_date_and_time(date, proposal.scheduled_time.as_deref());

    let date_label = timezone::format_date_in("UTC", effective_at);
    let time_label = proposal
        .scheduled_time
        .as_ref()
        .map(|_| timezone::format_time_in("UTC", effective_at));

    let home_time_label = trip
        .timezone_settings
        .as_ref()
        .filter(|tz| tz.show_home_time && time_label.is_some())
        .map(|tz| {
            timezone::format_in_home_zone(&tz.home_timezone, &tz.destination_timezone, effective_at)
        });

    Some(ScheduleView {
        effective_at,
        date_label,
        time_label,
        home_time_label,
    })
}

/// Timeline days over reaction-stripped proposals. The timeline is shared
/// trip state, so the private reaction rows must not ride along.
pub fn build_timeline(proposals: &[Proposal]) -> Vec<TimelineDay> {
    let sanitized: Vec<Proposal> = proposals
        .iter()
        .map(|p| Proposal {
            reactions: Vec::new(),
            ..p.clone()
        })
        .collect();

    timeline::group_by_day(&sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use tripbi_types::models::{
        ProposalCategory, ProposalDetails, ProposalStatus, Reaction, ReactionValue, TripStatus,
        TripTimezoneSettings,
    };

    fn proposal_with_reaction(user: Uuid) -> Proposal {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        Proposal {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            category: ProposalCategory::Activities,
            status: ProposalStatus::Decided,
            title: "Museum".into(),
            description: String::new(),
            details: ProposalDetails::default(),
            created_by: user,
            created_at: now,
            updated_at: now,
            scheduled_date: Some(now),
            scheduled_time: Some("10:00".into()),
            votes: vec![],
            comments: vec![],
            reactions: vec![Reaction {
                user_id: user,
                reaction: ReactionValue::Interested,
                timestamp: now,
            }],
        }
    }

    fn trip_with_timezones(show_home_time: bool) -> Trip {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        Trip {
            id: Uuid::new_v4(),
            name: "Japan".into(),
            destination: "Tokyo".into(),
            description: None,
            start_date: now,
            end_date: now,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            members: vec![],
            member_details: vec![],
            status: TripStatus::Planning,
            splitbi_group_id: None,
            timezone_settings: Some(TripTimezoneSettings {
                home_timezone: "America/New_York".into(),
                destination_timezone: "Asia/Tokyo".into(),
                show_home_time,
            }),
        }
    }

    #[test]
    fn test_timeline_strips_reactions() {
        let user = Uuid::new_v4();
        let days = build_timeline(&[proposal_with_reaction(user)]);
        assert_eq!(days.len(), 1);
        assert!(days[0].proposals[0].reactions.is_empty());
    }

    #[test]
    fn test_schedule_view_renders_both_clocks() {
        let proposal = proposal_with_reaction(Uuid::new_v4());
        let trip = trip_with_timezones(true);

        let schedule = schedule_view(&proposal, &trip).unwrap();
        assert_eq!(schedule.date_label, "Sun, Jun 1");
        assert_eq!(schedule.time_label.as_deref(), Some("10:00 AM"));
        // 10:00 in Tokyo is 01:00 UTC, which is 9:00 PM the previous evening
        // in New York (EDT).
        assert_eq!(schedule.home_time_label.as_deref(), Some("9:00 PM"));
    }

    #[test]
    fn test_schedule_view_home_clock_is_opt_in() {
        let proposal = proposal_with_reaction(Uuid::new_v4());
        let trip = trip_with_timezones(false);

        let schedule = schedule_view(&proposal, &trip).unwrap();
        assert_eq!(schedule.time_label.as_deref(), Some("10:00 AM"));
        assert!(schedule.home_time_label.is_none());
    }

    #[test]
    fn test_schedule_view_absent_without_a_date() {
        let mut proposal = proposal_with_reaction(Uuid::new_v4());
        proposal.scheduled_date = None;
        let trip = trip_with_timezones(true);
        assert!(schedule_view(&proposal, &trip).is_none());
    }
}
