//! Profile endpoints

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::Result;
use crate::guard::parse_id;
use crate::models::{Event, Profile};
use crate::routes::JsonBody;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/profiles",
            get(list_profiles).post(create_profile).delete(delete_profile),
        )
        .route("/api/profiles/default", put(set_default_profile))
        .route("/api/profiles/allEvents", get(all_events))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesResponse {
    pub profiles: Vec<Profile>,
    pub default_profile_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileRef {
    pub id: Option<String>,
}

impl ProfileRef {
    fn profile_id(&self) -> Result<Uuid> {
        parse_id(self.id.as_deref().unwrap_or_default(), "Profile")
    }
}

/// GET /api/profiles - The caller's profiles
async fn list_profiles(State(state): State<AppState>, caller: Caller) -> Result<Json<ProfilesResponse>> {
    let profiles = state.db.list_profiles(caller.user_id).await?;
    let default_profile_id = state.db.default_profile_id(caller.user_id).await?;
    Ok(Json(ProfilesResponse {
        profiles,
        default_profile_id,
    }))
}

/// POST /api/profiles - Create a profile
async fn create_profile(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<CreateProfileRequest>,
) -> Result<Json<serde_json::Value>> {
    let profile = state
        .db
        .create_profile(caller.user_id, req.name.as_deref())
        .await?;
    Ok(Json(serde_json::json!({ "profile": profile })))
}

/// DELETE /api/profiles - Delete a profile and its events
async fn delete_profile(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<ProfileRef>,
) -> Result<Json<serde_json::Value>> {
    let profile_id = req.profile_id()?;
    state.db.delete_profile(caller.user_id, profile_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// PUT /api/profiles/default - Choose the caller's default profile
async fn set_default_profile(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<ProfileRef>,
) -> Result<Json<serde_json::Value>> {
    let profile_id = req.profile_id()?;
    state.db.set_default_profile(caller.user_id, profile_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
}

/// GET /api/profiles/allEvents - Events across all of the caller's profiles
async fn all_events(State(state): State<AppState>, caller: Caller) -> Result<Json<EventsResponse>> {
    let events = state.db.list_all_events(caller.user_id).await?;
    Ok(Json(EventsResponse { events }))
}
