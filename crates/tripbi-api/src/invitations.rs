use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use tripbi_core::{token, validation};
use tripbi_db::models::{InvitationRow, TripMemberRow};
use tripbi_types::api::{
    Claims, CreateInvitationRequest, CreateInvitationResponse, InvitationStatusResponse,
    InviteOutcome,
};
use tripbi_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::trips::require_member;

pub async fn create_invitation(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateInvitationRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(email) = &req.email {
        if !validation::is_valid_email(email) {
            return Err(ApiError::Validation("invalid email address".into()));
        }
    }

    let invitation_id = Uuid::new_v4();
    let invite_token = token::generate_token();
    let now = Utc::now();
    let expires_at = token::invitation_expiry(now);

    let db = state.db.clone();
    let user_id = claims.sub;
    let invitee_email = req.email.clone();
    let stored_token = invite_token.clone();
    let trip_name = blocking(move || {
        require_member(&db, trip_id, user_id)?;

        let (trip, members) = db
            .get_trip(&trip_id.to_string())?
            .ok_or(ApiError::NotFound("trip"))?;
        if members.len() >= validation::MAX_TRIP_MEMBERS {
            return Err(ApiError::Conflict(format!(
                "trip already has the maximum of {} members",
                validation::MAX_TRIP_MEMBERS
            )));
        }

        db.insert_invitation(&InvitationRow {
            id: invitation_id.to_string(),
            trip_id: trip_id.to_string(),
            trip_name: trip.name.clone(),
            email: invitee_email,
            token: stored_token,
            status: "pending".into(),
            created_by: user_id.to_string(),
            created_at: now.to_rfc3339(),
            expires_at: expires_at.to_rfc3339(),
            accepted_by: None,
            accepted_at: None,
        })?;

        Ok(trip.name)
    })
    .await?;

    let invite_link = format!("{}/invite/{}", state.app_url, invite_token);

    // Email delivery is best effort; the link works either way.
    let mut email_sent = false;
    if let (Some(client), Some(email)) = (&state.email, &req.email) {
        match client
            .send_invitation(email, &trip_name, &invite_link, &claims.email)
            .await
        {
            Ok(()) => email_sent = true,
            Err(e) => warn!("invitation email to {} failed: {:#}", email, e),
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateInvitationResponse {
            invitation_id,
            token: invite_token,
            invite_link,
            expires_at,
            email_sent,
        }),
    ))
}

/// Public token check for the invite landing page. No authentication, so the
/// caller-specific `AlreadyMember` outcome cannot appear here.
pub async fn invitation_status(
    State(state): State<AppState>,
    Path(invite_token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let invitation = blocking(move || {
        let row = db.get_invitation_by_token(&invite_token)?;
        Ok(row.map(|r| r.into_model()).transpose()?)
    })
    .await?;

    let outcome = match token::validate_invitation(invitation.as_ref(), Utc::now()) {
        token::TokenValidity::Valid => InviteOutcome::Valid,
        token::TokenValidity::Expired => InviteOutcome::Expired,
        token::TokenValidity::NotFound => InviteOutcome::NotFound,
    };

    let (trip_id, trip_name) = match (&outcome, invitation) {
        (InviteOutcome::Valid, Some(inv)) => (Some(inv.trip_id), Some(inv.trip_name)),
        _ => (None, None),
    };

    Ok(Json(InvitationStatusResponse {
        outcome,
        trip_id,
        trip_name,
    }))
}

pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(invite_token): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let email = claims.email.clone();
    let display_name = claims.display_name.clone();
    let (invitation, already_member, splitbi_group_id) = blocking(move || {
        let row = db.get_invitation_by_token(&invite_token)?;
        let Some(invitation) = row.map(|r| r.into_model()).transpose()? else {
            return Err(ApiError::NotFound("invitation"));
        };

        match token::validate_invitation(Some(&invitation), Utc::now()) {
            token::TokenValidity::NotFound => {
                return Err(ApiError::NotFound("invitation"));
            }
            token::TokenValidity::Expired => {
                return Err(ApiError::Expired("this invitation has expired".into()));
            }
            token::TokenValidity::Valid => {}
        }

        // Joining a trip you already belong to is a no-op, not an error.
        if db.is_trip_member(&invitation.trip_id.to_string(), &user_id.to_string())? {
            return Ok((invitation, true, None));
        }

        let member_count = db.member_count(&invitation.trip_id.to_string())?;
        if member_count >= validation::MAX_TRIP_MEMBERS {
            return Err(ApiError::Conflict(format!(
                "trip already has the maximum of {} members",
                validation::MAX_TRIP_MEMBERS
            )));
        }

        let member = TripMemberRow {
            trip_id: invitation.trip_id.to_string(),
            user_id: user_id.to_string(),
            email,
            display_name,
            role: "member".into(),
            joined_at: Utc::now().to_rfc3339(),
        };
        db.accept_invitation(&invitation.id.to_string(), &member, &Utc::now().to_rfc3339())?;

        let splitbi_group_id = db
            .get_trip(&invitation.trip_id.to_string())?
            .and_then(|(trip, _)| trip.splitbi_group_id);

        Ok((invitation, false, splitbi_group_id))
    })
    .await?;

    if already_member {
        return Ok(Json(InvitationStatusResponse {
            outcome: InviteOutcome::AlreadyMember,
            trip_id: Some(invitation.trip_id),
            trip_name: Some(invitation.trip_name),
        }));
    }

    state.dispatcher.broadcast(GatewayEvent::MemberJoined {
        trip_id: invitation.trip_id,
        user_id: claims.sub,
        email: claims.email.clone(),
    });

    // Keep the linked expense group's roster in sync; best effort only.
    if let (Some(client), Some(group_id)) = (&state.splitbi, &splitbi_group_id) {
        if let Err(e) = client.add_members(group_id, &[claims.email.clone()]).await {
            warn!("failed to add member to expense group {}: {:#}", group_id, e);
        }
    }

    Ok(Json(InvitationStatusResponse {
        outcome: InviteOutcome::Accepted,
        trip_id: Some(invitation.trip_id),
        trip_name: Some(invitation.trip_name),
    }))
}
