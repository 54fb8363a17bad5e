//! crates/command_centre_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or hosted language models.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{ActionStep, Goal, GoalContext, GoalUpdate, NewGoal};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services
/// (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persistence collaborator. One logical instance exists per running
/// process; it is constructed once at startup and handed to the
/// `GoalService` rather than exposed as a global singleton.
///
/// Every operation is scoped by `user_id`: a store must never return or
/// mutate another user's data.
#[async_trait]
pub trait GoalStore: Send + Sync {
    // --- Goals ---
    /// All goals for the user, each with its action steps and completed
    /// dates attached, most recently created first.
    async fn list_goals(&self, user_id: Uuid) -> PortResult<Vec<Goal>>;

    async fn get_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<Goal>;

    async fn insert_goal(&self, user_id: Uuid, new_goal: NewGoal) -> PortResult<Goal>;

    async fn update_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        update: GoalUpdate,
    ) -> PortResult<Goal>;

    /// Deletes the goal and cascades to its action steps and completed dates.
    async fn delete_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()>;

    /// Persists a freshly derived progress percentage for the goal.
    async fn set_goal_progress(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        progress: u8,
    ) -> PortResult<()>;

    // --- Action Steps ---
    async fn insert_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        title: &str,
    ) -> PortResult<ActionStep>;

    /// Sets the completion flag and the stamped completion day together;
    /// `completed_date` must be `Some` exactly when `completed` is true.
    async fn set_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        step_id: Uuid,
        completed: bool,
        completed_date: Option<NaiveDate>,
    ) -> PortResult<ActionStep>;

    async fn delete_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        step_id: Uuid,
    ) -> PortResult<()>;

    // --- Completed Dates ---
    /// Records a check-in for the given calendar day. Returns `true` if a
    /// record was inserted and `false` if one already existed for that
    /// (goal, day) pair; the duplicate case is a no-op, not an error.
    async fn insert_completed_date(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<bool>;

    async fn delete_completed_date(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<()>;
}

/// The language-model collaborator behind the dashboard's chat feature.
#[async_trait]
pub trait GoalAssistant: Send + Sync {
    /// Answers a natural-language question against a snapshot of the user's
    /// goal data.
    async fn answer(&self, message: &str, context: &[GoalContext]) -> PortResult<String>;
}
