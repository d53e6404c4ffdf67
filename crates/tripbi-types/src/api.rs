use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, Comment, MemberRole, Proposal, ProposalCategory, ProposalDetails,
    ProposalStatus, ReactionValue, ShareableTimeline, Trip, TripStatus, TripTimezoneSettings,
    VoteValue,
};

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the WebSocket gateway.
/// Canonical definition lives here in tripbi-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub token: String,
}

// -- Trips --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTripRequest {
    pub name: String,
    pub destination: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub timezone_settings: Option<TripTimezoneSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTripRequest {
    pub name: Option<String>,
    pub destination: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<TripStatus>,
    pub timezone_settings: Option<TripTimezoneSettings>,
    pub splitbi_group_id: Option<String>,
}

// -- Proposals --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProposalRequest {
    pub category: ProposalCategory,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub details: ProposalDetails,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProposalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<ProposalDetails>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChangeRequest {
    pub status: ProposalStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CastVoteRequest {
    pub vote: VoteValue,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetReactionRequest {
    pub reaction: ReactionValue,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditCommentRequest {
    pub text: String,
}

// -- Bookings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertBookingRequest {
    pub status: BookingStatus,
    pub confirmation_number: Option<String>,
    pub notes: Option<String>,
    #[serde(default = "default_party_size")]
    pub booked_for_count: u32,
}

fn default_party_size() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct UploadProofResponse {
    pub proof_url: String,
}

// -- Invitations --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInvitationRequest {
    /// Absent for a shareable link-only invite.
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateInvitationResponse {
    pub invitation_id: Uuid,
    pub token: String,
    pub invite_link: String,
    pub expires_at: DateTime<Utc>,
    pub email_sent: bool,
}

/// Outcome of validating or accepting an invite token. Mirrors the distinct
/// UI states the token can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InviteOutcome {
    Valid,
    Expired,
    NotFound,
    AlreadyMember,
    Accepted,
}

#[derive(Debug, Serialize)]
pub struct InvitationStatusResponse {
    pub outcome: InviteOutcome,
    pub trip_id: Option<Uuid>,
    pub trip_name: Option<String>,
}

// -- Timeline views --

/// One calendar day of the derived itinerary: proposals sorted by time of day,
/// untimed entries last.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineDay {
    pub date: chrono::NaiveDate,
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub trip_id: Uuid,
    pub days: Vec<TimelineDay>,
    pub item_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ShareTimelineResponse {
    pub token: String,
    pub share_link: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SharedTimelineResponse {
    Valid { timeline: ShareableTimeline },
    Expired,
    NotFound,
}

// -- Derived trip view --

#[derive(Debug, Clone, Serialize)]
pub struct VoteTallyView {
    pub yes: usize,
    pub no: usize,
    pub abstain: usize,
    pub total: usize,
    pub progress_percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingCompletionView {
    pub confirmed: usize,
    pub pending: usize,
    pub not_booked: Vec<Uuid>,
    pub confirmed_fraction: f64,
    pub pending_fraction: f64,
}

/// Per-proposal view model. `viewer_reaction` is the requesting user's own
/// reaction only; other members' reactions are stripped at this boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
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
    pub scheduled_time: Option<String>,
    pub votes: Vec<crate::models::Vote>,
    pub tally: VoteTallyView,
    pub voting_open: bool,
    pub viewer_reaction: Option<ReactionValue>,
    pub comments: Vec<Comment>,
    pub booking_completion: BookingCompletionView,
    /// Display-ready schedule labels; only present for dated proposals.
    pub schedule: Option<ScheduleView>,
}

/// Rendered schedule for a dated proposal. `home_time_label` only appears
/// when the trip opts into showing the home clock alongside.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub effective_at: DateTime<Utc>,
    pub date_label: String,
    pub time_label: Option<String>,
    pub home_time_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TripSummaryView {
    pub decided_count: usize,
    pub confirmed_bookings: usize,
    pub pending_bookings: usize,
}

#[derive(Debug, Serialize)]
pub struct TripView {
    pub trip: Trip,
    pub proposals: Vec<ProposalView>,
    pub bookings: Vec<Booking>,
    pub timeline: Vec<TimelineDay>,
    pub summary: TripSummaryView,
    /// Signed hour offset destination-ahead-of-home, present when timezone
    /// settings are configured.
    pub timezone_offset_hours: Option<f64>,
    pub timezone_offset_label: Option<String>,
}

// -- Error body --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
