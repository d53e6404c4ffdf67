use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use tripbi_core::validation;
use tripbi_types::api::{Claims, UploadProofResponse};

use crate::auth::AppState;
use crate::bookings::booking_id;
use crate::error::{ApiError, ApiResult, blocking};
use crate::trips::require_member;

/// Attach a proof document to the caller's booking. The content type is
/// checked before the size so an oversized unsupported file reports the
/// type problem, matching what the picker filters on.
pub async fn upload_proof(
    State(state): State<AppState>,
    Path((trip_id, proposal_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let id = booking_id(trip_id, proposal_id, claims.sub);
    {
        let db = state.db.clone();
        let id = id.clone();
        blocking(move || {
            require_member(&db, trip_id, claims.sub)?;
            db.get_booking(&id)?.ok_or(ApiError::NotFound("booking"))?;
            Ok(())
        })
        .await?;
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("bad multipart body: {e}")))?
        .ok_or_else(|| ApiError::Validation("missing file field".into()))?;

    let content_type = field
        .content_type()
        .ok_or_else(|| ApiError::Validation("missing content type".into()))?
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read upload: {e}")))?;

    validation::check_proof_upload(&content_type, data.len() as u64)?;

    let ext = extension_for(&content_type);
    let filename = format!("{id}.{ext}");
    let dest = state.upload_dir.join(&filename);

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create upload dir: {}", e))?;
    tokio::fs::write(&dest, &data)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write proof file: {}", e))?;

    let proof_url = format!("/uploads/{filename}");
    {
        let db = state.db.clone();
        let id = id.clone();
        let proof_url = proof_url.clone();
        blocking(move || Ok(db.set_booking_proof(&id, &proof_url, &Utc::now().to_rfc3339())?))
            .await?;
    }

    info!(
        "stored booking proof {} ({} bytes, {})",
        filename,
        data.len(),
        content_type
    );

    Ok(Json(UploadProofResponse { proof_url }))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        // unreachable after check_proof_upload, but keep a sane default
        _ => "bin",
    }
}
