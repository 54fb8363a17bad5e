//! crates/command_centre_core/src/domain.rs
//!
//! Defines the pure, core data structures for the goal dashboard.
//! These structs are independent of any database or HTTP layer; the REST
//! handlers and the assistant context both serialize them directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-defined objective tracked over time, together with the action
/// steps and completion history it exclusively owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Calendar date only; the dashboard has no time-of-day semantics.
    pub target_date: Option<NaiveDate>,
    /// Derived value: percentage of completed action steps, 0 when there
    /// are no steps. Never written directly by a caller.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub action_steps: Vec<ActionStep>,
    pub completed_dates: Vec<CompletedDate>,
}

impl Goal {
    /// Count of (completed, total) action steps.
    pub fn step_counts(&self) -> (usize, usize) {
        let completed = self.action_steps.iter().filter(|s| s.completed).count();
        (completed, self.action_steps.len())
    }

    /// The bare calendar days the user checked in on, in storage order.
    pub fn completion_days(&self) -> Vec<NaiveDate> {
        self.completed_dates.iter().map(|cd| cd.completed_date).collect()
    }
}

/// An individual checklist item contributing to a goal's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStep {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub completed: bool,
    /// Present only while `completed` is true.
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record that the user engaged with a goal on a specific calendar day.
/// At most one exists per (goal, day) pair; this is the sole input to
/// streak computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedDate {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub completed_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Write Shapes
//=========================================================================================

/// Payload for creating a goal. Progress is absent by design: it is always
/// derived from the action steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

/// Partial update for a goal. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

//=========================================================================================
// Derived Display Shapes
//=========================================================================================

/// A goal decorated with the engine's derived display values.
#[derive(Debug, Clone, Serialize)]
pub struct GoalOverview {
    #[serde(flatten)]
    pub goal: Goal,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub marked_today: bool,
    /// Signed whole days until the target date; negative once it has passed.
    pub days_remaining: Option<i64>,
}

/// Dashboard-wide aggregate across all of a user's goals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalStats {
    pub total_goals: usize,
    pub completed_actions: usize,
    pub total_actions: usize,
    pub average_progress: u8,
}

//=========================================================================================
// Assistant Context
//=========================================================================================

/// The per-goal snapshot handed to the language-model collaborator. This is
/// the one data shape the chat feature depends on; keep field names stable,
/// the prompt refers to them.
#[derive(Debug, Clone, Serialize)]
pub struct GoalContext {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub action_steps: Vec<StepContext>,
    pub daily_streak: u32,
    pub completed_dates: Vec<NaiveDate>,
    pub incomplete_tasks: Vec<String>,
}

/// A single action step as the assistant sees it.
#[derive(Debug, Clone, Serialize)]
pub struct StepContext {
    pub title: String,
    pub completed: bool,
}
