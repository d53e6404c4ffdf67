use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use tripbi_core::{timeline, token};
use tripbi_db::models::SharedTimelineRow;
use tripbi_db::queries::assemble_snapshot;
use tripbi_types::api::{
    Claims, ShareTimelineResponse, SharedTimelineResponse, TimelineResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::trips::require_member;
use crate::views;

/// The live derived itinerary: decided, dated proposals grouped by day.
pub async fn get_timeline(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let days = blocking(move || {
        require_member(&db, trip_id, claims.sub)?;

        let rows = db
            .load_trip_snapshot(&trip_id.to_string())?
            .ok_or(ApiError::NotFound("trip"))?;
        let (_trip, proposals, _bookings) = assemble_snapshot(rows)?;

        Ok(views::build_timeline(&proposals))
    })
    .await?;
    let item_count = days.iter().map(|d| d.proposals.len()).sum();

    Ok(Json(TimelineResponse {
        trip_id,
        days,
        item_count,
    }))
}

/// Freeze the current timeline into a public snapshot behind a share token.
/// Later edits to the trip never show through the link.
pub async fn share_timeline(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let share_token = token::generate_token();

    let db = state.db.clone();
    let stored_token = share_token.clone();
    blocking(move || {
        require_member(&db, trip_id, claims.sub)?;

        let rows = db
            .load_trip_snapshot(&trip_id.to_string())?
            .ok_or(ApiError::NotFound("trip"))?;
        let (trip, proposals, _bookings) = assemble_snapshot(rows)?;

        let snapshot = timeline::snapshot_proposals(&proposals);
        let now = Utc::now();

        Ok(db.insert_shared_timeline(&SharedTimelineRow {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            trip_name: trip.name,
            destination: trip.destination,
            start_date: trip.start_date.to_rfc3339(),
            end_date: trip.end_date.to_rfc3339(),
            token: stored_token,
            created_by: claims.sub.to_string(),
            created_at: now.to_rfc3339(),
            expires_at: None,
            proposals_json: serde_json::to_string(&snapshot)
                .map_err(|e| anyhow::anyhow!("failed to serialize snapshot: {}", e))?,
        })?)
    })
    .await?;

    let share_link = format!("{}/shared/{}", state.app_url, share_token);

    Ok((
        StatusCode::CREATED,
        Json(ShareTimelineResponse {
            token: share_token,
            share_link,
        }),
    ))
}

/// Public read of a shared snapshot. No authentication; the token is the
/// only credential.
pub async fn shared_timeline(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
) -> ApiResult<Response> {
    let db = state.db.clone();
    let snapshot = blocking(move || {
        let row = db.get_shared_timeline_by_token(&share_token)?;
        Ok(row.map(|r| r.into_model()).transpose()?)
    })
    .await?;

    let response = match token::validate_shared_timeline(snapshot.as_ref(), Utc::now()) {
        token::TokenValidity::NotFound => (
            StatusCode::NOT_FOUND,
            Json(SharedTimelineResponse::NotFound),
        ),
        token::TokenValidity::Expired => {
            (StatusCode::GONE, Json(SharedTimelineResponse::Expired))
        }
        token::TokenValidity::Valid => {
            let Some(timeline) = snapshot else {
                return Err(ApiError::Internal(anyhow::anyhow!(
                    "valid shared timeline with no row"
                )));
            };
            (
                StatusCode::OK,
                Json(SharedTimelineResponse::Valid { timeline }),
            )
        }
    };

    Ok(response.into_response())
}
