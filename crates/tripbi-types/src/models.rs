use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Planning,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripMember {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Dual-timezone display settings for a trip: the group's home zone and the
/// destination zone, both IANA identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripTimezoneSettings {
    pub home_timezone: String,
    pub destination_timezone: String,
    pub show_home_time: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Member ids in join order. Always identical in membership to `member_details`.
    pub members: Vec<Uuid>,
    pub member_details: Vec<TripMember>,
    pub status: TripStatus,
    pub splitbi_group_id: Option<String>,
    pub timezone_settings: Option<TripTimezoneSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalCategory {
    Flights,
    Hotels,
    Activities,
    Restaurants,
    Transportation,
    Tasks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Proposed,
    Discussing,
    Decided,
}

/// Category-specific free-form details. All optional strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalDetails {
    pub location: Option<String>,
    pub price: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Yes,
    No,
    Abstain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: Uuid,
    pub vote: VoteValue,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionValue {
    Interested,
    Maybe,
    NotInterested,
}

/// A member's private interest signal. Never rendered for any user other than
/// its owner — view models only ever carry the requesting user's own reaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: Uuid,
    pub reaction: ReactionValue,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub category: ProposalCategory,
    pub status: ProposalStatus,
    pub title: String,
    pub description: String,
    pub details: ProposalDetails,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scheduled_date: Option<DateTime<Utc>>,
    /// Time of day as `HH:MM`, interpreted in the trip's destination timezone.
    pub scheduled_time: Option<String>,
    pub votes: Vec<Vote>,
    pub comments: Vec<Comment>,
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Deterministic composite id: `{trip_id}-{proposal_id}-{user_id}`.
    pub id: String,
    pub trip_id: Uuid,
    pub proposal_id: Uuid,
    pub user_id: Uuid,
    pub status: BookingStatus,
    pub confirmation_number: Option<String>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    /// Number of people this booking covers. Always >= 1.
    pub booked_for_count: u32,
    pub booked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub trip_name: String,
    /// Absent for link-only invites.
    pub email: Option<String>,
    pub token: String,
    pub status: InvitationStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_by: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Frozen copy of a proposal embedded in a shared timeline. Deliberately a
/// point-in-time snapshot so share links stay stable as the trip changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareableProposal {
    pub id: Uuid,
    pub category: ProposalCategory,
    pub title: String,
    pub description: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub scheduled_time: Option<String>,
    pub details: ProposalDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareableTimeline {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub trip_name: String,
    pub destination: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub token: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub proposals: Vec<ShareableProposal>,
}
