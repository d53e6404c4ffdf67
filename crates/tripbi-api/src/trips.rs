use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use tripbi_core::{timezone, validation};
use tripbi_db::Database;
use tripbi_db::models::{TripMemberRow, TripRow, trip_status_str};
use tripbi_db::queries::assemble_trip;
use tripbi_types::api::{Claims, CreateTripRequest, UpdateTripRequest};
use tripbi_types::events::GatewayEvent;
use tripbi_types::models::Trip;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::views;

/// Membership gate shared by every trip-scoped handler.
pub fn require_member(db: &Database, trip_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    if db.is_trip_member(&trip_id.to_string(), &user_id.to_string())? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("not a member of this trip".into()))
    }
}

pub async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTripRequest>,
) -> ApiResult<impl IntoResponse> {
    if !validation::is_not_empty(&req.name) {
        return Err(ApiError::Validation("trip name is required".into()));
    }
    if !validation::is_not_empty(&req.destination) {
        return Err(ApiError::Validation("destination is required".into()));
    }
    if !validation::is_end_after_start(req.start_date, req.end_date) {
        return Err(ApiError::Validation("end date must be after start date".into()));
    }

    let trip_id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();

    let (home_timezone, destination_timezone, show_home_time) = match &req.timezone_settings {
        Some(tz) => (
            Some(tz.home_timezone.clone()),
            Some(tz.destination_timezone.clone()),
            Some(tz.show_home_time),
        ),
        None => (None, None, None),
    };

    let trip = TripRow {
        id: trip_id.to_string(),
        name: req.name,
        destination: req.destination,
        description: req.description,
        start_date: req.start_date.to_rfc3339(),
        end_date: req.end_date.to_rfc3339(),
        created_by: claims.sub.to_string(),
        created_at: now.clone(),
        updated_at: now.clone(),
        status: "planning".into(),
        splitbi_group_id: None,
        home_timezone,
        destination_timezone,
        show_home_time,
    };
    let creator = TripMemberRow {
        trip_id: trip_id.to_string(),
        user_id: claims.sub.to_string(),
        email: claims.email.clone(),
        display_name: claims.display_name.clone(),
        role: "admin".into(),
        joined_at: now,
    };

    let db = state.db.clone();
    let model = blocking(move || {
        db.create_trip(&trip, &creator)?;
        load_trip(&db, trip_id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(model)))
}

pub async fn list_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let trips = blocking(move || {
        let rows = db.list_trips_for_user(&claims.sub.to_string())?;
        rows.into_iter()
            .map(|(trip, members)| Ok(assemble_trip(trip, members)?))
            .collect::<ApiResult<Vec<Trip>>>()
    })
    .await?;

    Ok(Json(trips))
}

pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let view = blocking(move || {
        require_member(&db, trip_id, claims.sub)?;
        views::build_trip_view(&db, trip_id, claims.sub, Utc::now())
    })
    .await?;
    Ok(Json(view))
}

pub async fn update_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateTripRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let model = blocking(move || {
        require_member(&db, trip_id, claims.sub)?;

        let (mut trip, _members) = db
            .get_trip(&trip_id.to_string())?
            .ok_or(ApiError::NotFound("trip"))?;

        if let Some(name) = req.name {
            if !validation::is_not_empty(&name) {
                return Err(ApiError::Validation("trip name cannot be empty".into()));
            }
            trip.name = name;
        }
        if let Some(destination) = req.destination {
            if !validation::is_not_empty(&destination) {
                return Err(ApiError::Validation("destination cannot be empty".into()));
            }
            trip.destination = destination;
        }
        if let Some(description) = req.description {
            trip.description = Some(description);
        }
        if req.start_date.is_some() || req.end_date.is_some() {
            let start = req
                .start_date
                .map_or_else(|| tripbi_db::models::parse_ts(&trip.start_date), Ok)?;
            let end = req
                .end_date
                .map_or_else(|| tripbi_db::models::parse_ts(&trip.end_date), Ok)?;
            if !validation::is_end_after_start(start, end) {
                return Err(ApiError::Validation("end date must be after start date".into()));
            }
            trip.start_date = start.to_rfc3339();
            trip.end_date = end.to_rfc3339();
        }
        if let Some(status) = req.status {
            trip.status = trip_status_str(status).to_string();
        }
        if let Some(tz) = req.timezone_settings {
            trip.home_timezone = Some(tz.home_timezone);
            trip.destination_timezone = Some(tz.destination_timezone);
            trip.show_home_time = Some(tz.show_home_time);
        }
        if let Some(group_id) = req.splitbi_group_id {
            trip.splitbi_group_id = Some(group_id);
        }
        trip.updated_at = Utc::now().to_rfc3339();

        db.update_trip(&trip)?;
        load_trip(&db, trip_id)
    })
    .await?;

    state.dispatcher.broadcast(GatewayEvent::TripUpdated { trip_id });

    Ok(Json(model))
}

pub async fn delete_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let splitbi_group_id = blocking(move || {
        let (trip, members) = db
            .get_trip(&trip_id.to_string())?
            .ok_or(ApiError::NotFound("trip"))?;

        let is_admin = members
            .iter()
            .any(|m| m.user_id == claims.sub.to_string() && m.role == "admin");
        if !is_admin {
            return Err(ApiError::Forbidden("only a trip admin can delete a trip".into()));
        }
        Ok(trip.splitbi_group_id)
    })
    .await?;

    // Archive the linked expense group if one exists; best effort only.
    if let (Some(client), Some(group_id)) = (&state.splitbi, &splitbi_group_id) {
        if let Err(e) = client.archive_group(group_id).await {
            tracing::warn!("failed to archive expense group {}: {:#}", group_id, e);
        }
    }

    let db = state.db.clone();
    blocking(move || Ok(db.delete_trip(&trip_id.to_string())?)).await?;
    state.dispatcher.broadcast(GatewayEvent::TripDeleted { trip_id });

    Ok(StatusCode::NO_CONTENT)
}

/// Timezone picker data: region-grouped IANA options plus the current
/// abbreviation for each, and a suggestion matching the query city if any.
pub async fn list_timezones(
    axum::extract::Query(query): axum::extract::Query<TimezoneQuery>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();

    let groups: Vec<serde_json::Value> = timezone::grouped_timezones()
        .into_iter()
        .map(|(region, options)| {
            let zones: Vec<serde_json::Value> = options
                .iter()
                .map(|opt| {
                    serde_json::json!({
                        "id": opt.value,
                        "label": opt.label,
                        "abbreviation": timezone::abbreviation(opt.value, now),
                    })
                })
                .collect();
            serde_json::json!({ "region": region, "zones": zones })
        })
        .collect();

    let suggestion = query
        .city
        .as_deref()
        .and_then(timezone::suggest_timezone_for_city);

    Ok(Json(serde_json::json!({
        "groups": groups,
        "suggestion": suggestion,
    })))
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct TimezoneQuery {
    pub city: Option<String>,
}

fn load_trip(db: &Database, trip_id: Uuid) -> ApiResult<Trip> {
    let (trip, members) = db
        .get_trip(&trip_id.to_string())?
        .ok_or(ApiError::NotFound("trip"))?;
    Ok(assemble_trip(trip, members)?)
}
