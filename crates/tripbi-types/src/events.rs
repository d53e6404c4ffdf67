use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BookingStatus, ProposalStatus};

/// Events sent over the WebSocket gateway. Every mutation to a trip's shared
/// state produces one of these so clients can recompute their derived views.
///
/// Reactions are private per-user data and deliberately have no event variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, email: String },

    TripUpdated { trip_id: Uuid },

    TripDeleted { trip_id: Uuid },

    MemberJoined {
        trip_id: Uuid,
        user_id: Uuid,
        email: String,
    },

    ProposalCreated {
        trip_id: Uuid,
        proposal_id: Uuid,
        created_by: Uuid,
    },

    ProposalUpdated { trip_id: Uuid, proposal_id: Uuid },

    ProposalStatusChanged {
        trip_id: Uuid,
        proposal_id: Uuid,
        status: ProposalStatus,
    },

    VoteCast {
        trip_id: Uuid,
        proposal_id: Uuid,
        user_id: Uuid,
    },

    CommentAdded {
        trip_id: Uuid,
        proposal_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
    },

    CommentDeleted {
        trip_id: Uuid,
        proposal_id: Uuid,
        comment_id: Uuid,
    },

    BookingUpserted {
        trip_id: Uuid,
        proposal_id: Uuid,
        user_id: Uuid,
        status: BookingStatus,
    },
}

impl GatewayEvent {
    /// Returns the trip_id if this event is scoped to a specific trip.
    /// Events that return `None` are connection-level and always delivered.
    pub fn trip_id(&self) -> Option<Uuid> {
        match self {
            Self::Ready { .. } => None,
            Self::TripUpdated { trip_id }
            | Self::TripDeleted { trip_id }
            | Self::MemberJoined { trip_id, .. }
            | Self::ProposalCreated { trip_id, .. }
            | Self::ProposalUpdated { trip_id, .. }
            | Self::ProposalStatusChanged { trip_id, .. }
            | Self::VoteCast { trip_id, .. }
            | Self::CommentAdded { trip_id, .. }
            | Self::CommentDeleted { trip_id, .. }
            | Self::BookingUpserted { trip_id, .. } => Some(*trip_id),
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to events for specific trips. The server only forwards
    /// trip-scoped events for trips the client has subscribed to.
    Subscribe { trip_ids: Vec<Uuid> },
}
