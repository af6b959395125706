//! Event endpoints, all scoped to one of the caller's profiles

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use crate::auth::Caller;
use crate::error::Result;
use crate::guard::parse_id;
use crate::models::EventInput;
use crate::routes::{profiles::EventsResponse, JsonBody};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/profiles/{id}/events",
            get(list_events).post(create_event),
        )
        .route(
            "/api/profiles/{id}/events/{event_id}",
            put(update_event).delete(delete_event),
        )
}

/// GET /api/profiles/{id}/events
async fn list_events(
    State(state): State<AppState>,
    caller: Caller,
    Path(profile_id): Path<String>,
) -> Result<Json<EventsResponse>> {
    let profile_id = parse_id(&profile_id, "Profile")?;
    let events = state.db.list_events(caller.user_id, profile_id).await?;
    Ok(Json(EventsResponse { events }))
}

/// POST /api/profiles/{id}/events
async fn create_event(
    State(state): State<AppState>,
    caller: Caller,
    Path(profile_id): Path<String>,
    JsonBody(input): JsonBody<EventInput>,
) -> Result<Json<serde_json::Value>> {
    let profile_id = parse_id(&profile_id, "Profile")?;
    let event = state
        .db
        .create_event(caller.user_id, profile_id, &input)
        .await?;
    Ok(Json(serde_json::json!({ "event": event })))
}

/// PUT /api/profiles/{id}/events/{event_id}
async fn update_event(
    State(state): State<AppState>,
    caller: Caller,
    Path((profile_id, event_id)): Path<(String, String)>,
    JsonBody(input): JsonBody<EventInput>,
) -> Result<Json<serde_json::Value>> {
    let profile_id = parse_id(&profile_id, "Profile")?;
    let event_id = parse_id(&event_id, "Event")?;
    let event = state
        .db
        .update_event(caller.user_id, profile_id, event_id, &input)
        .await?;
    Ok(Json(serde_json::json!({ "event": event })))
}

/// DELETE /api/profiles/{id}/events/{event_id}
async fn delete_event(
    State(state): State<AppState>,
    caller: Caller,
    Path((profile_id, event_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>> {
    let profile_id = parse_id(&profile_id, "Profile")?;
    let event_id = parse_id(&event_id, "Event")?;
    state
        .db
        .delete_event(caller.user_id, profile_id, event_id)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
