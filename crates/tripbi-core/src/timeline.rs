use std::collections::BTreeMap;

use chrono::NaiveDate;

use tripbi_types::api::TimelineDay;
use tripbi_types::models::{Proposal, ProposalStatus, ShareableProposal};

/// Sorts after any real `HH:MM`, so untimed proposals land at the end of a day.
const NO_TIME_SENTINEL: &str = "99:99";

/// Whether a proposal appears on the timeline: decided and dated.
pub fn on_timeline(proposal: &Proposal) -> bool {
    proposal.status == ProposalStatus::Decided && proposal.scheduled_date.is_some()
}

/// Group proposals into ordered day buckets.
///
/// The grouping key is the stored instant's own (UTC) calendar day, not a
/// destination-timezone-adjusted day — timezone settings affect display only.
/// Within a day, proposals sort ascending by `scheduled_time` lexicographically
/// with absent times last; days sort ascending by date.
pub fn group_by_day(proposals: &[Proposal]) -> Vec<TimelineDay> {
    let mut groups: BTreeMap<NaiveDate, Vec<Proposal>> = BTreeMap::new();

    for proposal in proposals.iter().filter(|p| on_timeline(p)) {
        // on_timeline guarantees the date is present
        let Some(date) = proposal.scheduled_date else { continue };
        groups.entry(date.date_naive()).or_default().push(proposal.clone());
    }

    groups
        .into_iter()
        .map(|(date, mut proposals)| {
            proposals.sort_by(|a, b| {
                let ta = a.scheduled_time.as_deref().unwrap_or(NO_TIME_SENTINEL);
                let tb = b.scheduled_time.as_deref().unwrap_or(NO_TIME_SENTINEL);
                ta.cmp(tb)
            });
            TimelineDay { date, proposals }
        })
        .collect()
}

/// Deep frozen copies of the timeline proposals for a shareable snapshot,
/// taken at export time. Deliberately not a live view: the share link must
/// stay stable even if the trip later changes.
pub fn snapshot_proposals(proposals: &[Proposal]) -> Vec<ShareableProposal> {
    proposals
        .iter()
        .filter(|p| on_timeline(p))
        .map(|p| ShareableProposal {
            id: p.id,
            category: p.category,
            title: p.title.clone(),
            description: p.description.clone(),
            scheduled_date: p.scheduled_date,
            scheduled_time: p.scheduled_time.clone(),
            details: p.details.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tripbi_types::models::{ProposalCategory, ProposalDetails};
    use uuid::Uuid;

    fn proposal(
        status: ProposalStatus,
        day: Option<u32>,
        time: Option<&str>,
        title: &str,
    ) -> Proposal {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        Proposal {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            category: ProposalCategory::Activities,
            status,
            title: title.to_string(),
            description: String::new(),
            details: ProposalDetails::default(),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            scheduled_date: day.map(|d| Utc.with_ymd_and_hms(2025, 3, d, 15, 0, 0).unwrap()),
            scheduled_time: time.map(str::to_string),
            votes: vec![],
            comments: vec![],
            reactions: vec![],
        }
    }

    #[test]
    fn test_excludes_undecided_and_undated() {
        let proposals = vec![
            proposal(ProposalStatus::Proposed, Some(10), Some("09:00"), "proposed"),
            proposal(ProposalStatus::Discussing, Some(10), Some("09:00"), "discussing"),
            proposal(ProposalStatus::Decided, None, Some("09:00"), "undated"),
            proposal(ProposalStatus::Decided, Some(10), Some("09:00"), "on timeline"),
        ];
        let days = group_by_day(&proposals);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].proposals.len(), 1);
        assert_eq!(days[0].proposals[0].title, "on timeline");
    }

    #[test]
    fn test_untimed_sorts_last_within_day() {
        let proposals = vec![
            proposal(ProposalStatus::Decided, Some(10), None, "untimed"),
            proposal(ProposalStatus::Decided, Some(10), Some("09:00"), "morning"),
        ];
        let days = group_by_day(&proposals);
        assert_eq!(days.len(), 1);
        let titles: Vec<_> = days[0].proposals.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["morning", "untimed"]);
    }

    #[test]
    fn test_days_ascending_and_times_nondecreasing() {
        let proposals = vec![
            proposal(ProposalStatus::Decided, Some(12), Some("20:00"), "d12 dinner"),
            proposal(ProposalStatus::Decided, Some(10), Some("14:30"), "d10 afternoon"),
            proposal(ProposalStatus::Decided, Some(12), Some("08:15"), "d12 breakfast"),
            proposal(ProposalStatus::Decided, Some(10), Some("09:00"), "d10 morning"),
        ];
        let days = group_by_day(&proposals);
        assert_eq!(days.len(), 2);
        assert!(days[0].date < days[1].date);
        for day in &days {
            let times: Vec<_> = day
                .proposals
                .iter()
                .map(|p| p.scheduled_time.clone().unwrap_or_else(|| "99:99".into()))
                .collect();
            let mut sorted = times.clone();
            sorted.sort();
            assert_eq!(times, sorted);
        }
    }

    #[test]
    fn test_snapshot_is_frozen_copy() {
        let mut proposals = vec![proposal(ProposalStatus::Decided, Some(10), Some("09:00"), "hike")];
        let snapshot = snapshot_proposals(&proposals);
        assert_eq!(snapshot.len(), 1);

        // Later edits to the live proposal do not touch the snapshot
        proposals[0].title = "renamed".to_string();
        assert_eq!(snapshot[0].title, "hike");
    }

    #[test]
    fn test_snapshot_applies_timeline_filter() {
        let proposals = vec![
            proposal(ProposalStatus::Proposed, Some(10), None, "not decided"),
            proposal(ProposalStatus::Decided, None, None, "not dated"),
        ];
        assert!(snapshot_proposals(&proposals).is_empty());
    }
}
