use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use tripbi_core::{status, validation};
use tripbi_db::Database;
use tripbi_db::models::{
    CommentRow, ProposalRow, category_str, proposal_status_from_str, proposal_status_str,
    reaction_str, vote_str,
};
use tripbi_types::api::{
    AddCommentRequest, CastVoteRequest, Claims, CreateProposalRequest, EditCommentRequest,
    SetReactionRequest, StatusChangeRequest, UpdateProposalRequest,
};
use tripbi_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::trips::require_member;

pub async fn create_proposal(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProposalRequest>,
) -> ApiResult<impl IntoResponse> {
    if !validation::is_not_empty(&req.title) {
        return Err(ApiError::Validation("title is required".into()));
    }
    if let Some(time) = &req.scheduled_time {
        if !validation::is_valid_time_of_day(time) {
            return Err(ApiError::Validation("scheduled time must be HH:MM".into()));
        }
    }

    let proposal_id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();

    let proposal = ProposalRow {
        id: proposal_id.to_string(),
        trip_id: trip_id.to_string(),
        category: category_str(req.category).to_string(),
        status: "proposed".into(),
        title: req.title,
        description: req.description,
        location: req.details.location,
        price: req.details.price,
        link: req.details.link,
        created_by: claims.sub.to_string(),
        created_at: now.clone(),
        updated_at: now,
        scheduled_date: req.scheduled_date.map(|d| d.to_rfc3339()),
        scheduled_time: req.scheduled_time,
    };

    let db = state.db.clone();
    let user_id = claims.sub;
    blocking(move || {
        require_member(&db, trip_id, user_id)?;

        let count = db.count_proposals_for_trip(&trip_id.to_string())?;
        if count >= validation::MAX_PROPOSALS_PER_TRIP {
            return Err(ApiError::Validation(format!(
                "trip already has the maximum of {} proposals",
                validation::MAX_PROPOSALS_PER_TRIP
            )));
        }
        Ok(db.insert_proposal(&proposal)?)
    })
    .await?;

    state.dispatcher.broadcast(GatewayEvent::ProposalCreated {
        trip_id,
        proposal_id,
        created_by: claims.sub,
    });

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "proposal_id": proposal_id })),
    ))
}

pub async fn update_proposal(
    State(state): State<AppState>,
    Path((trip_id, proposal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProposalRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(time) = &req.scheduled_time {
        if !validation::is_valid_time_of_day(time) {
            return Err(ApiError::Validation("scheduled time must be HH:MM".into()));
        }
    }

    let db = state.db.clone();
    let user_id = claims.sub;
    blocking(move || {
        require_member(&db, trip_id, user_id)?;
        let mut proposal = get_trip_proposal(&db, trip_id, proposal_id)?;

        if let Some(title) = req.title {
            if !validation::is_not_empty(&title) {
                return Err(ApiError::Validation("title cannot be empty".into()));
            }
            proposal.title = title;
        }
        if let Some(description) = req.description {
            proposal.description = description;
        }
        if let Some(details) = req.details {
            proposal.location = details.location;
            proposal.price = details.price;
            proposal.link = details.link;
        }
        if let Some(scheduled_date) = req.scheduled_date {
            proposal.scheduled_date = Some(scheduled_date.to_rfc3339());
        }
        if let Some(scheduled_time) = req.scheduled_time {
            proposal.scheduled_time = Some(scheduled_time);
        }
        proposal.updated_at = Utc::now().to_rfc3339();

        Ok(db.update_proposal(&proposal)?)
    })
    .await?;

    state
        .dispatcher
        .broadcast(GatewayEvent::ProposalUpdated { trip_id, proposal_id });

    Ok(StatusCode::NO_CONTENT)
}

/// Proposed -> discussing -> decided, with discussing -> proposed as the only
/// backward edge. Any member may move the status.
pub async fn change_status(
    State(state): State<AppState>,
    Path((trip_id, proposal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StatusChangeRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let new_status = blocking(move || {
        require_member(&db, trip_id, user_id)?;
        let proposal = get_trip_proposal(&db, trip_id, proposal_id)?;

        let current = proposal_status_from_str(&proposal.status)?;
        let new_status = status::transition(current, req.status)?;

        db.set_proposal_status(
            &proposal_id.to_string(),
            proposal_status_str(new_status),
            &Utc::now().to_rfc3339(),
        )?;
        Ok(new_status)
    })
    .await?;

    state
        .dispatcher
        .broadcast(GatewayEvent::ProposalStatusChanged {
            trip_id,
            proposal_id,
            status: new_status,
        });

    Ok(Json(serde_json::json!({ "status": new_status })))
}

/// Set-or-replace the caller's vote. Decided proposals show a read-only tally.
pub async fn cast_vote(
    State(state): State<AppState>,
    Path((trip_id, proposal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CastVoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user_id = claims.sub;
    blocking(move || {
        require_member(&db, trip_id, user_id)?;
        let proposal = get_trip_proposal(&db, trip_id, proposal_id)?;

        if !status::voting_open(proposal_status_from_str(&proposal.status)?) {
            return Err(ApiError::Conflict("voting is closed on a decided proposal".into()));
        }

        Ok(db.upsert_vote(
            &proposal_id.to_string(),
            &user_id.to_string(),
            vote_str(req.vote),
            &Utc::now().to_rfc3339(),
        )?)
    })
    .await?;

    state.dispatcher.broadcast(GatewayEvent::VoteCast {
        trip_id,
        proposal_id,
        user_id: claims.sub,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Set-or-replace the caller's private reaction. Reactions never broadcast:
/// other clients have nothing to update.
pub async fn set_reaction(
    State(state): State<AppState>,
    Path((trip_id, proposal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user_id = claims.sub;
    blocking(move || {
        require_member(&db, trip_id, user_id)?;
        get_trip_proposal(&db, trip_id, proposal_id)?;

        Ok(db.upsert_reaction(
            &proposal_id.to_string(),
            &user_id.to_string(),
            reaction_str(req.reaction),
            &Utc::now().to_rfc3339(),
        )?)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path((trip_id, proposal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    if !validation::is_not_empty(&req.text) {
        return Err(ApiError::Validation("comment text is required".into()));
    }

    let comment_id = Uuid::new_v4();
    let db = state.db.clone();
    let user_id = claims.sub;
    blocking(move || {
        require_member(&db, trip_id, user_id)?;
        get_trip_proposal(&db, trip_id, proposal_id)?;

        Ok(db.insert_comment(&CommentRow {
            id: comment_id.to_string(),
            proposal_id: proposal_id.to_string(),
            user_id: user_id.to_string(),
            text: req.text,
            timestamp: Utc::now().to_rfc3339(),
            edited_at: None,
        })?)
    })
    .await?;

    state.dispatcher.broadcast(GatewayEvent::CommentAdded {
        trip_id,
        proposal_id,
        comment_id,
        user_id: claims.sub,
    });

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "comment_id": comment_id })),
    ))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path((trip_id, proposal_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    if !validation::is_not_empty(&req.text) {
        return Err(ApiError::Validation("comment text is required".into()));
    }

    let db = state.db.clone();
    let user_id = claims.sub;
    blocking(move || {
        require_member(&db, trip_id, user_id)?;
        let comment = get_own_comment(&db, proposal_id, comment_id, user_id)?;

        Ok(db.edit_comment(&comment.id, &req.text, &Utc::now().to_rfc3339())?)
    })
    .await?;

    state.dispatcher.broadcast(GatewayEvent::CommentAdded {
        trip_id,
        proposal_id,
        comment_id,
        user_id: claims.sub,
    });

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((trip_id, proposal_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let user_id = claims.sub;
    blocking(move || {
        require_member(&db, trip_id, user_id)?;
        let comment = get_own_comment(&db, proposal_id, comment_id, user_id)?;

        Ok(db.delete_comment(&comment.id)?)
    })
    .await?;

    state.dispatcher.broadcast(GatewayEvent::CommentDeleted {
        trip_id,
        proposal_id,
        comment_id,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Fetch a proposal and confirm it belongs to the trip in the path. A valid
/// proposal id under the wrong trip reads as not found.
fn get_trip_proposal(db: &Database, trip_id: Uuid, proposal_id: Uuid) -> ApiResult<ProposalRow> {
    let proposal = db
        .get_proposal(&proposal_id.to_string())?
        .ok_or(ApiError::NotFound("proposal"))?;
    if proposal.trip_id != trip_id.to_string() {
        return Err(ApiError::NotFound("proposal"));
    }
    Ok(proposal)
}

/// Comments are author-owned: only the author may edit or delete.
fn get_own_comment(
    db: &Database,
    proposal_id: Uuid,
    comment_id: Uuid,
    user_id: Uuid,
) -> ApiResult<CommentRow> {
    let comment = db
        .get_comment(&comment_id.to_string())?
        .ok_or(ApiError::NotFound("comment"))?;
    if comment.proposal_id != proposal_id.to_string() {
        return Err(ApiError::NotFound("comment"));
    }
    if comment.user_id != user_id.to_string() {
        return Err(ApiError::Forbidden("only the author can modify a comment".into()));
    }
    Ok(comment)
}
