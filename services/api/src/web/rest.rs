//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Identity arrives in an `x-user-id` header: authentication flows are owned
//! by an upstream collaborator (a gateway or the hosting platform), and this
//! service trusts the user id it forwards.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::NaiveDate;
use command_centre_core::domain::{GoalUpdate, NewGoal};
use command_centre_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_goals_handler,
        create_goal_handler,
        update_goal_handler,
        delete_goal_handler,
        create_step_handler,
        set_step_handler,
        delete_step_handler,
        check_in_handler,
        undo_check_in_handler,
        stats_handler,
        chat_handler,
    ),
    components(
        schemas(
            CreateGoalRequest,
            UpdateGoalRequest,
            CreateStepRequest,
            SetStepRequest,
            CheckInRequest,
            CheckInResponse,
            ChatRequest,
            ChatResponse,
        )
    ),
    tags(
        (name = "Goal Command Centre API", description = "API endpoints for the goal-tracking dashboard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateGoalRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateGoalRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateStepRequest {
    pub title: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SetStepRequest {
    pub completed: bool,
}

/// The check-in day defaults to today (UTC) when omitted.
#[derive(Deserialize, Default, ToSchema)]
pub struct CheckInRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    /// False when the day was already recorded (a no-op, not an error).
    pub recorded: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub response: String,
}

//=========================================================================================
// Shared Handler Helpers
//=========================================================================================

/// Extracts and parses the `x-user-id` header.
fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let user_id_str = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;

    Uuid::parse_str(user_id_str).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id format".to_string(),
        )
    })
}

/// Maps a port error to an HTTP response, logging the unexpected ones.
fn port_error(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unexpected(msg) => {
            error!("{context}: {msg}");
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

//=========================================================================================
// Goal Handlers
//=========================================================================================

/// List the user's goals with their derived display values (progress,
/// streaks, marked-today, days remaining).
#[utoipa::path(
    get,
    path = "/goals",
    responses(
        (status = 200, description = "The user's goals with streak and progress data"),
        (status = 400, description = "Missing or malformed x-user-id header")
    ),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn list_goals_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let overview = state
        .goals
        .overview(user_id)
        .await
        .map_err(|e| port_error("Failed to list goals", e))?;
    Ok(Json(overview))
}

/// Create a new goal. Goals start with no steps and progress 0.
#[utoipa::path(
    post,
    path = "/goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created"),
        (status = 400, description = "Bad request")
    ),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn create_goal_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    if req.title.trim().is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "title must not be empty".to_string()));
    }
    let goal = state
        .goals
        .create_goal(
            user_id,
            NewGoal {
                title: req.title,
                description: req.description,
                target_date: req.target_date,
            },
        )
        .await
        .map_err(|e| port_error("Failed to create goal", e))?;
    Ok((StatusCode::CREATED, Json(goal)))
}

/// Update a goal's title, description, or target date. Progress is derived
/// and cannot be set here.
#[utoipa::path(
    patch,
    path = "/goals/{goal_id}",
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated"),
        (status = 404, description = "Goal not found")
    ),
    params(
        ("goal_id" = Uuid, Path, description = "The goal to update."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn update_goal_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(goal_id): Path<Uuid>,
    Json(req): Json<UpdateGoalRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    if matches!(&req.title, Some(t) if t.trim().is_empty()) {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "title must not be empty".to_string()));
    }
    let goal = state
        .goals
        .update_goal(
            user_id,
            goal_id,
            GoalUpdate {
                title: req.title,
                description: req.description,
                target_date: req.target_date,
            },
        )
        .await
        .map_err(|e| port_error("Failed to update goal", e))?;
    Ok(Json(goal))
}

/// Delete a goal and everything it owns (action steps, check-in history).
#[utoipa::path(
    delete,
    path = "/goals/{goal_id}",
    responses(
        (status = 204, description = "Goal deleted"),
        (status = 404, description = "Goal not found")
    ),
    params(
        ("goal_id" = Uuid, Path, description = "The goal to delete."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_goal_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(goal_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    state
        .goals
        .delete_goal(user_id, goal_id)
        .await
        .map_err(|e| port_error("Failed to delete goal", e))?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Action Step Handlers
//=========================================================================================

/// Add an action step to a goal. Steps start incomplete.
#[utoipa::path(
    post,
    path = "/goals/{goal_id}/steps",
    request_body = CreateStepRequest,
    responses(
        (status = 201, description = "Action step created"),
        (status = 404, description = "Goal not found")
    ),
    params(
        ("goal_id" = Uuid, Path, description = "The owning goal."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_step_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(goal_id): Path<Uuid>,
    Json(req): Json<CreateStepRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    if req.title.trim().is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "title must not be empty".to_string()));
    }
    let step = state
        .goals
        .add_action_step(user_id, goal_id, &req.title)
        .await
        .map_err(|e| port_error("Failed to create action step", e))?;
    Ok((StatusCode::CREATED, Json(step)))
}

/// Mark an action step complete or incomplete. Completing stamps today's
/// date; either way the goal's progress is recomputed, and the refreshed
/// goal is returned.
#[utoipa::path(
    patch,
    path = "/goals/{goal_id}/steps/{step_id}",
    request_body = SetStepRequest,
    responses(
        (status = 200, description = "Step updated; response carries the goal with fresh progress"),
        (status = 404, description = "Goal or step not found")
    ),
    params(
        ("goal_id" = Uuid, Path, description = "The owning goal."),
        ("step_id" = Uuid, Path, description = "The step to toggle."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn set_step_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((goal_id, step_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetStepRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let goal = state
        .goals
        .set_action_step(user_id, goal_id, step_id, req.completed)
        .await
        .map_err(|e| port_error("Failed to update action step", e))?;
    Ok(Json(goal))
}

/// Delete an action step; the goal's progress is recomputed.
#[utoipa::path(
    delete,
    path = "/goals/{goal_id}/steps/{step_id}",
    responses(
        (status = 200, description = "Step deleted; response carries the goal with fresh progress"),
        (status = 404, description = "Goal or step not found")
    ),
    params(
        ("goal_id" = Uuid, Path, description = "The owning goal."),
        ("step_id" = Uuid, Path, description = "The step to delete."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_step_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((goal_id, step_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let goal = state
        .goals
        .remove_action_step(user_id, goal_id, step_id)
        .await
        .map_err(|e| port_error("Failed to delete action step", e))?;
    Ok(Json(goal))
}

//=========================================================================================
// Check-in Handlers
//=========================================================================================

/// Record a check-in for a goal. Defaults to today (UTC); a day that was
/// already recorded is a no-op and answers 200 instead of 201.
#[utoipa::path(
    post,
    path = "/goals/{goal_id}/check-ins",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Check-in recorded", body = CheckInResponse),
        (status = 200, description = "Day already recorded; nothing changed", body = CheckInResponse),
        (status = 404, description = "Goal not found")
    ),
    params(
        ("goal_id" = Uuid, Path, description = "The goal checked in on."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn check_in_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(goal_id): Path<Uuid>,
    Json(req): Json<CheckInRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let recorded = state
        .goals
        .check_in(user_id, goal_id, req.date)
        .await
        .map_err(|e| port_error("Failed to record check-in", e))?;
    let status = if recorded { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(CheckInResponse { recorded })))
}

/// Remove a check-in for a specific day.
#[utoipa::path(
    delete,
    path = "/goals/{goal_id}/check-ins/{date}",
    responses(
        (status = 204, description = "Check-in removed"),
        (status = 404, description = "Goal not found")
    ),
    params(
        ("goal_id" = Uuid, Path, description = "The goal."),
        ("date" = NaiveDate, Path, description = "The calendar day to remove (ISO 8601)."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn undo_check_in_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((goal_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    state
        .goals
        .undo_check_in(user_id, goal_id, date)
        .await
        .map_err(|e| port_error("Failed to remove check-in", e))?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Aggregate and Chat Handlers
//=========================================================================================

/// Dashboard-wide statistics across all of the user's goals.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Aggregate goal statistics"),
        (status = 400, description = "Missing or malformed x-user-id header")
    ),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let stats = state
        .goals
        .stats(user_id)
        .await
        .map_err(|e| port_error("Failed to compute stats", e))?;
    Ok(Json(stats))
}

/// Ask the assistant a question about the user's goals. The handler snapshots
/// the goal data, hands it to the language-model collaborator, and relays the
/// answer.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant answer", body = ChatResponse),
        (status = 503, description = "No chat API key configured")
    ),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    if req.message.trim().is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "message must not be empty".to_string()));
    }
    let assistant = state.assistant.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Chat assistant is not configured".to_string(),
        )
    })?;

    let context = state
        .goals
        .assistant_context(user_id)
        .await
        .map_err(|e| port_error("Failed to build assistant context", e))?;
    let response = assistant
        .answer(&req.message, &context)
        .await
        .map_err(|e| port_error("Failed to generate assistant response", e))?;
    Ok(Json(ChatResponse { response }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_in_request_date_is_optional() {
        let with_date: CheckInRequest = serde_json::from_str(r#"{"date":"2025-01-21"}"#).unwrap();
        assert_eq!(with_date.date, Some("2025-01-21".parse().unwrap()));

        let without: CheckInRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(without.date, None);
    }

    #[test]
    fn update_request_fields_all_default_to_untouched() {
        let req: UpdateGoalRequest = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("New"));
        assert!(req.description.is_none());
        assert!(req.target_date.is_none());
    }

    #[test]
    fn malformed_date_strings_are_rejected_at_the_boundary() {
        let result = serde_json::from_str::<CheckInRequest>(r#"{"date":"21/01/2025"}"#);
        assert!(result.is_err());
    }
}
