//! Client and handlers for the SplitBi expense-tracking service. Each trip
//! may be linked to one SplitBi group, keyed by the trip id as the group's
//! external id.

use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tripbi_types::api::Claims;
use tripbi_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking};
use crate::trips::require_member;

pub struct SplitbiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitbiGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitbiBalance {
    pub email: String,
    pub balance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitbiSummary {
    pub group_id: String,
    pub total: f64,
    pub currency: String,
    pub balances: Vec<SplitbiBalance>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitbiExpense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub paid_by: String,
    pub date: String,
}

impl SplitbiClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    pub async fn create_group(
        &self,
        name: &str,
        external_id: &str,
        member_emails: &[String],
    ) -> Result<SplitbiGroup> {
        let group = self
            .request(reqwest::Method::POST, "/v1/groups")
            .json(&serde_json::json!({
                "name": name,
                "external_id": external_id,
                "members": member_emails,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("bad create-group response")?;
        Ok(group)
    }

    pub async fn find_group_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<SplitbiGroup>> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/groups/by-external-id/{external_id}"),
            )
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let group = resp
            .error_for_status()?
            .json()
            .await
            .context("bad group lookup response")?;
        Ok(Some(group))
    }

    pub async fn get_summary(&self, group_id: &str) -> Result<SplitbiSummary> {
        let summary = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/groups/{group_id}/summary"),
            )
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("bad summary response")?;
        Ok(summary)
    }

    pub async fn list_expenses(&self, group_id: &str) -> Result<Vec<SplitbiExpense>> {
        let expenses = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/groups/{group_id}/expenses"),
            )
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("bad expenses response")?;
        Ok(expenses)
    }

    pub async fn add_members(&self, group_id: &str, emails: &[String]) -> Result<()> {
        self.request(
            reqwest::Method::POST,
            &format!("/v1/groups/{group_id}/members"),
        )
        .json(&serde_json::json!({ "emails": emails }))
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }

    pub async fn archive_group(&self, group_id: &str) -> Result<()> {
        self.request(
            reqwest::Method::POST,
            &format!("/v1/groups/{group_id}/archive"),
        )
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }
}

fn client(state: &AppState) -> ApiResult<&SplitbiClient> {
    state
        .splitbi
        .as_ref()
        .ok_or(ApiError::Unavailable("expense tracking is not configured"))
}

/// Membership check plus lookup of the trip's linked group id.
async fn linked_group_id(state: &AppState, trip_id: Uuid, user_id: Uuid) -> ApiResult<String> {
    let db = state.db.clone();
    blocking(move || {
        require_member(&db, trip_id, user_id)?;
        let (trip, _members) = db
            .get_trip(&trip_id.to_string())?
            .ok_or(ApiError::NotFound("trip"))?;
        trip.splitbi_group_id
            .ok_or(ApiError::NotFound("expense group"))
    })
    .await
}

/// Link a trip to its expense group, creating one if none exists yet.
/// Re-linking finds the existing group by external id instead of
/// creating a duplicate.
pub async fn link_expense_group(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let splitbi = client(&state)?;

    let db = state.db.clone();
    let (mut trip, members) = blocking(move || {
        require_member(&db, trip_id, claims.sub)?;
        Ok(db
            .get_trip(&trip_id.to_string())?
            .ok_or(ApiError::NotFound("trip"))?)
    })
    .await?;

    if let Some(group_id) = &trip.splitbi_group_id {
        return Ok(Json(serde_json::json!({ "group_id": group_id })));
    }

    let emails: Vec<String> = members.iter().map(|m| m.email.clone()).collect();
    let group = match splitbi
        .find_group_by_external_id(&trip_id.to_string())
        .await
        .map_err(ApiError::Internal)?
    {
        Some(group) => group,
        None => splitbi
            .create_group(&trip.name, &trip_id.to_string(), &emails)
            .await
            .map_err(ApiError::Internal)?,
    };

    trip.splitbi_group_id = Some(group.id.clone());
    trip.updated_at = Utc::now().to_rfc3339();
    let db = state.db.clone();
    blocking(move || Ok(db.update_trip(&trip)?)).await?;

    state.dispatcher.broadcast(GatewayEvent::TripUpdated { trip_id });

    Ok(Json(serde_json::json!({ "group_id": group.id })))
}

pub async fn expense_summary(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let splitbi = client(&state)?;
    let group_id = linked_group_id(&state, trip_id, claims.sub).await?;

    let summary = splitbi
        .get_summary(&group_id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(summary))
}

pub async fn list_trip_expenses(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let splitbi = client(&state)?;
    let group_id = linked_group_id(&state, trip_id, claims.sub).await?;

    let expenses = splitbi
        .list_expenses(&group_id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(expenses))
}
