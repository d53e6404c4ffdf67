//! Database row types — these map directly to SQLite rows.
//! Distinct from the tripbi-types API models to keep the DB layer independent;
//! `into_model` conversions do the string -> typed parsing in one place.

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tripbi_types::models::{
    Booking, BookingStatus, Comment, Invitation, InvitationStatus, MemberRole, ProposalCategory,
    ProposalStatus, Reaction, ReactionValue, ShareableTimeline, TripMember, TripStatus, Vote,
    VoteValue,
};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub password: String,
    pub created_at: String,
}

pub struct TripRow {
    pub id: String,
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
    pub splitbi_group_id: Option<String>,
    pub home_timezone: Option<String>,
    pub destination_timezone: Option<String>,
    pub show_home_time: Option<bool>,
}

pub struct TripMemberRow {
    pub trip_id: String,
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    pub joined_at: String,
}

pub struct ProposalRow {
    pub id: String,
    pub trip_id: String,
    pub category: String,
    pub status: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub price: Option<String>,
    pub link: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
}

pub struct VoteRow {
    pub proposal_id: String,
    pub user_id: String,
    pub vote: String,
    pub timestamp: String,
}

pub struct ReactionRow {
    pub proposal_id: String,
    pub user_id: String,
    pub reaction: String,
    pub timestamp: String,
}

pub struct CommentRow {
    pub id: String,
    pub proposal_id: String,
    pub user_id: String,
    pub text: String,
    pub timestamp: String,
    pub edited_at: Option<String>,
}

pub struct BookingRow {
    pub id: String,
    pub trip_id: String,
    pub proposal_id: String,
    pub user_id: String,
    pub status: String,
    pub confirmation_number: Option<String>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    pub booked_for_count: u32,
    pub booked_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct InvitationRow {
    pub id: String,
    pub trip_id: String,
    pub trip_name: String,
    pub email: Option<String>,
    pub token: String,
    pub status: String,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: String,
    pub accepted_by: Option<String>,
    pub accepted_at: Option<String>,
}

pub struct SharedTimelineRow {
    pub id: String,
    pub trip_id: String,
    pub trip_name: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub token: String,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub proposals_json: String,
}

// -- Parsing helpers --

pub fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite-style "YYYY-MM-DD HH:MM:SS" without timezone
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| anyhow!("bad timestamp '{}': {}", value, e))
}

pub fn parse_ts_opt(value: &Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

pub fn parse_id(value: &str) -> Result<Uuid> {
    value.parse().map_err(|e| anyhow!("bad id '{}': {}", value, e))
}

fn parse_id_opt(value: &Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_id).transpose()
}

pub fn trip_status_from_str(s: &str) -> Result<TripStatus> {
    Ok(match s {
        "planning" => TripStatus::Planning,
        "active" => TripStatus::Active,
        "completed" => TripStatus::Completed,
        other => bail!("unknown trip status '{}'", other),
    })
}

pub fn trip_status_str(s: TripStatus) -> &'static str {
    match s {
        TripStatus::Planning => "planning",
        TripStatus::Active => "active",
        TripStatus::Completed => "completed",
    }
}

pub fn role_from_str(s: &str) -> Result<MemberRole> {
    Ok(match s {
        "admin" => MemberRole::Admin,
        "member" => MemberRole::Member,
        other => bail!("unknown member role '{}'", other),
    })
}

pub fn role_str(r: MemberRole) -> &'static str {
    match r {
        MemberRole::Admin => "admin",
        MemberRole::Member => "member",
    }
}

pub fn category_from_str(s: &str) -> Result<ProposalCategory> {
    Ok(match s {
        "flights" => ProposalCategory::Flights,
        "hotels" => ProposalCategory::Hotels,
        "activities" => ProposalCategory::Activities,
        "restaurants" => ProposalCategory::Restaurants,
        "transportation" => ProposalCategory::Transportation,
        "tasks" => ProposalCategory::Tasks,
        other => bail!("unknown proposal category '{}'", other),
    })
}

pub fn category_str(c: ProposalCategory) -> &'static str {
    match c {
        ProposalCategory::Flights => "flights",
        ProposalCategory::Hotels => "hotels",
        ProposalCategory::Activities => "activities",
        ProposalCategory::Restaurants => "restaurants",
        ProposalCategory::Transportation => "transportation",
        ProposalCategory::Tasks => "tasks",
    }
}

pub fn proposal_status_from_str(s: &str) -> Result<ProposalStatus> {
    Ok(match s {
        "proposed" => ProposalStatus::Proposed,
        "discussing" => ProposalStatus::Discussing,
        "decided" => ProposalStatus::Decided,
        other => bail!("unknown proposal status '{}'", other),
    })
}

pub fn proposal_status_str(s: ProposalStatus) -> &'static str {
    match s {
        ProposalStatus::Proposed => "proposed",
        ProposalStatus::Discussing => "discussing",
        ProposalStatus::Decided => "decided",
    }
}

pub fn vote_from_str(s: &str) -> Result<VoteValue> {
    Ok(match s {
        "yes" => VoteValue::Yes,
        "no" => VoteValue::No,
        "abstain" => VoteValue::Abstain,
        other => bail!("unknown vote value '{}'", other),
    })
}

pub fn vote_str(v: VoteValue) -> &'static str {
    match v {
        VoteValue::Yes => "yes",
        VoteValue::No => "no",
        VoteValue::Abstain => "abstain",
    }
}

pub fn reaction_from_str(s: &str) -> Result<ReactionValue> {
    Ok(match s {
        "interested" => ReactionValue::Interested,
        "maybe" => ReactionValue::Maybe,
        "not_interested" => ReactionValue::NotInterested,
        other => bail!("unknown reaction value '{}'", other),
    })
}

pub fn reaction_str(r: ReactionValue) -> &'static str {
    match r {
        ReactionValue::Interested => "interested",
        ReactionValue::Maybe => "maybe",
        ReactionValue::NotInterested => "not_interested",
    }
}

pub fn booking_status_from_str(s: &str) -> Result<BookingStatus> {
    Ok(match s {
        "pending" => BookingStatus::Pending,
        "confirmed" => BookingStatus::Confirmed,
        other => bail!("unknown booking status '{}'", other),
    })
}

pub fn booking_status_str(s: BookingStatus) -> &'static str {
    match s {
        BookingStatus::Pending => "pending",
        BookingStatus::Confirmed => "confirmed",
    }
}

pub fn invitation_status_from_str(s: &str) -> Result<InvitationStatus> {
    Ok(match s {
        "pending" => InvitationStatus::Pending,
        "accepted" => InvitationStatus::Accepted,
        "expired" => InvitationStatus::Expired,
        other => bail!("unknown invitation status '{}'", other),
    })
}

pub fn invitation_status_str(s: InvitationStatus) -> &'static str {
    match s {
        InvitationStatus::Pending => "pending",
        InvitationStatus::Accepted => "accepted",
        InvitationStatus::Expired => "expired",
    }
}

// -- Row -> model conversions --

impl TripMemberRow {
    pub fn into_model(self) -> Result<TripMember> {
        Ok(TripMember {
            user_id: parse_id(&self.user_id)?,
            email: self.email,
            display_name: self.display_name,
            role: role_from_str(&self.role)?,
            joined_at: parse_ts(&self.joined_at)?,
        })
    }
}

impl VoteRow {
    pub fn into_model(self) -> Result<Vote> {
        Ok(Vote {
            user_id: parse_id(&self.user_id)?,
            vote: vote_from_str(&self.vote)?,
            timestamp: parse_ts(&self.timestamp)?,
        })
    }
}

impl ReactionRow {
    pub fn into_model(self) -> Result<Reaction> {
        Ok(Reaction {
            user_id: parse_id(&self.user_id)?,
            reaction: reaction_from_str(&self.reaction)?,
            timestamp: parse_ts(&self.timestamp)?,
        })
    }
}

impl CommentRow {
    pub fn into_model(self) -> Result<Comment> {
        Ok(Comment {
            id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            text: self.text,
            timestamp: parse_ts(&self.timestamp)?,
            edited_at: parse_ts_opt(&self.edited_at)?,
        })
    }
}

impl BookingRow {
    pub fn into_model(self) -> Result<Booking> {
        Ok(Booking {
            trip_id: parse_id(&self.trip_id)?,
            proposal_id: parse_id(&self.proposal_id)?,
            user_id: parse_id(&self.user_id)?,
            status: booking_status_from_str(&self.status)?,
            confirmation_number: self.confirmation_number,
            proof_url: self.proof_url,
            notes: self.notes,
            booked_for_count: self.booked_for_count,
            booked_at: parse_ts_opt(&self.booked_at)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            id: self.id,
        })
    }
}

impl InvitationRow {
    pub fn into_model(self) -> Result<Invitation> {
        Ok(Invitation {
            id: parse_id(&self.id)?,
            trip_id: parse_id(&self.trip_id)?,
            trip_name: self.trip_name,
            email: self.email,
            token: self.token,
            status: invitation_status_from_str(&self.status)?,
            created_by: parse_id(&self.created_by)?,
            created_at: parse_ts(&self.created_at)?,
            expires_at: parse_ts(&self.expires_at)?,
            accepted_by: parse_id_opt(&self.accepted_by)?,
            accepted_at: parse_ts_opt(&self.accepted_at)?,
        })
    }
}

impl SharedTimelineRow {
    pub fn into_model(self) -> Result<ShareableTimeline> {
        Ok(ShareableTimeline {
            id: parse_id(&self.id)?,
            trip_id: parse_id(&self.trip_id)?,
            trip_name: self.trip_name,
            destination: self.destination,
            start_date: parse_ts(&self.start_date)?,
            end_date: parse_ts(&self.end_date)?,
            token: self.token,
            created_by: parse_id(&self.created_by)?,
            created_at: parse_ts(&self.created_at)?,
            expires_at: parse_ts_opt(&self.expires_at)?,
            proposals: serde_json::from_str(&self.proposals_json)?,
        })
    }
}
