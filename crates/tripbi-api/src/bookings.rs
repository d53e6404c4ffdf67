use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use tripbi_db::models::{BookingRow, booking_status_str};
use tripbi_types::api::{Claims, UpsertBookingRequest};
use tripbi_types::events::GatewayEvent;
use tripbi_types::models::{Booking, BookingStatus};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::trips::require_member;

/// Deterministic booking id: one booking per member per proposal, and writing
/// again lands on the same row.
pub fn booking_id(trip_id: Uuid, proposal_id: Uuid, user_id: Uuid) -> String {
    format!("{trip_id}-{proposal_id}-{user_id}")
}

pub async fn upsert_booking(
    State(state): State<AppState>,
    Path((trip_id, proposal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpsertBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.booked_for_count == 0 {
        return Err(ApiError::Validation("booked_for_count must be at least 1".into()));
    }

    let db = state.db.clone();
    let user_id = claims.sub;
    let status = req.status;
    let booking = blocking(move || {
        require_member(&db, trip_id, user_id)?;

        let proposal = db
            .get_proposal(&proposal_id.to_string())?
            .ok_or(ApiError::NotFound("proposal"))?;
        if proposal.trip_id != trip_id.to_string() {
            return Err(ApiError::NotFound("proposal"));
        }

        let id = booking_id(trip_id, proposal_id, user_id);
        let now = Utc::now().to_rfc3339();
        let booked_at = match req.status {
            BookingStatus::Confirmed => Some(now.clone()),
            BookingStatus::Pending => None,
        };

        let existing = db.get_booking(&id)?;
        let (created_at, proof_url) = match &existing {
            Some(row) => (row.created_at.clone(), row.proof_url.clone()),
            None => (now.clone(), None),
        };

        let row = BookingRow {
            id: id.clone(),
            trip_id: trip_id.to_string(),
            proposal_id: proposal_id.to_string(),
            user_id: user_id.to_string(),
            status: booking_status_str(req.status).to_string(),
            confirmation_number: req.confirmation_number,
            proof_url,
            notes: req.notes,
            booked_for_count: req.booked_for_count,
            booked_at,
            created_at,
            updated_at: now,
        };
        db.upsert_booking(&row)?;

        let booking = db
            .get_booking(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("booking vanished after upsert")))?
            .into_model()?;
        Ok(booking)
    })
    .await?;

    state.dispatcher.broadcast(GatewayEvent::BookingUpserted {
        trip_id,
        proposal_id,
        user_id: claims.sub,
        status,
    });

    Ok(Json(booking))
}

/// All bookings in a trip, for the booking-status board.
pub async fn list_trip_bookings(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let bookings = blocking(move || {
        require_member(&db, trip_id, claims.sub)?;

        let bookings = db
            .list_bookings_for_trip(&trip_id.to_string())?
            .into_iter()
            .map(|row| row.into_model())
            .collect::<anyhow::Result<Vec<Booking>>>()?;
        Ok(bookings)
    })
    .await?;

    Ok(Json(bookings))
}

/// The caller's bookings across all trips, for the "my bookings" screen.
pub async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let bookings = blocking(move || {
        let bookings = db
            .list_bookings_for_user(&claims.sub.to_string())?
            .into_iter()
            .map(|row| row.into_model())
            .collect::<anyhow::Result<Vec<Booking>>>()?;
        Ok(bookings)
    })
    .await?;

    Ok(Json(bookings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_id_is_deterministic() {
        let trip = Uuid::new_v4();
        let proposal = Uuid::new_v4();
        let user = Uuid::new_v4();
        assert_eq!(
            booking_id(trip, proposal, user),
            booking_id(trip, proposal, user)
        );
        assert_eq!(
            booking_id(trip, proposal, user),
            format!("{trip}-{proposal}-{user}")
        );
    }
}
