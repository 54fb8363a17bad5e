//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `GoalStore` port from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use command_centre_core::domain::{ActionStep, CompletedDate, Goal, GoalUpdate, NewGoal};
use command_centre_core::ports::{GoalStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `GoalStore` port.
#[derive(Clone)]
pub struct PgGoalStore {
    pool: PgPool,
}

impl PgGoalStore {
    /// Creates a new `PgGoalStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    fn unexpected(e: sqlx::Error) -> PortError {
        PortError::Unexpected(e.to_string())
    }

    /// Confirms the goal exists and belongs to the user, so callers can
    /// distinguish "missing goal" from legitimate no-op writes.
    async fn ensure_owned(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()> {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM goals WHERE id = $1 AND user_id = $2")
                .bind(goal_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Self::unexpected)?;
        if exists.is_none() {
            return Err(PortError::NotFound(format!("Goal {} not found", goal_id)));
        }
        Ok(())
    }

    /// Loads the action steps and completed dates for a set of goals and
    /// attaches them to their owners.
    async fn attach_children(&self, mut goals: Vec<Goal>) -> PortResult<Vec<Goal>> {
        if goals.is_empty() {
            return Ok(goals);
        }
        let goal_ids: Vec<Uuid> = goals.iter().map(|g| g.id).collect();

        let steps: Vec<ActionStepRecord> = sqlx::query_as(
            "SELECT id, goal_id, title, completed, completed_date, created_at, updated_at \
             FROM action_steps WHERE goal_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(&goal_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        let dates: Vec<CompletedDateRecord> = sqlx::query_as(
            "SELECT id, goal_id, completed_date, created_at \
             FROM completed_dates WHERE goal_id = ANY($1) ORDER BY completed_date ASC",
        )
        .bind(&goal_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        let mut steps_by_goal: HashMap<Uuid, Vec<ActionStep>> = HashMap::new();
        for record in steps {
            steps_by_goal
                .entry(record.goal_id)
                .or_default()
                .push(record.to_domain());
        }
        let mut dates_by_goal: HashMap<Uuid, Vec<CompletedDate>> = HashMap::new();
        for record in dates {
            dates_by_goal
                .entry(record.goal_id)
                .or_default()
                .push(record.to_domain());
        }

        for goal in &mut goals {
            goal.action_steps = steps_by_goal.remove(&goal.id).unwrap_or_default();
            goal.completed_dates = dates_by_goal.remove(&goal.id).unwrap_or_default();
        }
        Ok(goals)
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct GoalRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    target_date: Option<NaiveDate>,
    progress: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GoalRecord {
    fn to_domain(self) -> Goal {
        Goal {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            target_date: self.target_date,
            progress: self.progress.clamp(0, 100) as u8,
            created_at: self.created_at,
            updated_at: self.updated_at,
            action_steps: Vec::new(),
            completed_dates: Vec::new(),
        }
    }
}

#[derive(FromRow)]
struct ActionStepRecord {
    id: Uuid,
    goal_id: Uuid,
    title: String,
    completed: bool,
    completed_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ActionStepRecord {
    fn to_domain(self) -> ActionStep {
        ActionStep {
            id: self.id,
            goal_id: self.goal_id,
            title: self.title,
            completed: self.completed,
            completed_date: self.completed_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CompletedDateRecord {
    id: Uuid,
    goal_id: Uuid,
    completed_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl CompletedDateRecord {
    fn to_domain(self) -> CompletedDate {
        CompletedDate {
            id: self.id,
            goal_id: self.goal_id,
            completed_date: self.completed_date,
            created_at: self.created_at,
        }
    }
}

const GOAL_COLUMNS: &str =
    "id, user_id, title, description, target_date, progress, created_at, updated_at";

//=========================================================================================
// `GoalStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl GoalStore for PgGoalStore {
    async fn list_goals(&self, user_id: Uuid) -> PortResult<Vec<Goal>> {
        let records: Vec<GoalRecord> = sqlx::query_as(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        let goals = records.into_iter().map(GoalRecord::to_domain).collect();
        self.attach_children(goals).await
    }

    async fn get_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<Goal> {
        let record: Option<GoalRecord> = sqlx::query_as(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE id = $1 AND user_id = $2"
        ))
        .bind(goal_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        let record =
            record.ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;
        let mut goals = self.attach_children(vec![record.to_domain()]).await?;
        Ok(goals.remove(0))
    }

    async fn insert_goal(&self, user_id: Uuid, new_goal: NewGoal) -> PortResult<Goal> {
        let record: GoalRecord = sqlx::query_as(&format!(
            "INSERT INTO goals (id, user_id, title, description, target_date) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {GOAL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new_goal.title)
        .bind(&new_goal.description)
        .bind(new_goal.target_date)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        Ok(record.to_domain())
    }

    async fn update_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        update: GoalUpdate,
    ) -> PortResult<Goal> {
        // Absent fields keep their current values.
        let record: Option<GoalRecord> = sqlx::query_as(&format!(
            "UPDATE goals SET \
                 title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 target_date = COALESCE($5, target_date), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {GOAL_COLUMNS}"
        ))
        .bind(goal_id)
        .bind(user_id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.target_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        let record =
            record.ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;
        let mut goals = self.attach_children(vec![record.to_domain()]).await?;
        Ok(goals.remove(0))
    }

    async fn delete_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()> {
        // Action steps and completed dates go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
            .bind(goal_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Self::unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Goal {} not found", goal_id)));
        }
        Ok(())
    }

    async fn set_goal_progress(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        progress: u8,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE goals SET progress = $3, updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(goal_id)
        .bind(user_id)
        .bind(i32::from(progress))
        .execute(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Goal {} not found", goal_id)));
        }
        Ok(())
    }

    async fn insert_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        title: &str,
    ) -> PortResult<ActionStep> {
        // The ownership check is folded into the insert: no matching goal
        // row means nothing is inserted.
        let record: Option<ActionStepRecord> = sqlx::query_as(
            "INSERT INTO action_steps (id, goal_id, title) \
             SELECT $1, g.id, $2 FROM goals g WHERE g.id = $3 AND g.user_id = $4 \
             RETURNING id, goal_id, title, completed, completed_date, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(goal_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        let record =
            record.ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;
        Ok(record.to_domain())
    }

    async fn set_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        step_id: Uuid,
        completed: bool,
        completed_date: Option<NaiveDate>,
    ) -> PortResult<ActionStep> {
        let record: Option<ActionStepRecord> = sqlx::query_as(
            "UPDATE action_steps s SET completed = $1, completed_date = $2, updated_at = now() \
             FROM goals g \
             WHERE s.id = $3 AND s.goal_id = $4 AND g.id = s.goal_id AND g.user_id = $5 \
             RETURNING s.id, s.goal_id, s.title, s.completed, s.completed_date, \
                       s.created_at, s.updated_at",
        )
        .bind(completed)
        .bind(completed_date)
        .bind(step_id)
        .bind(goal_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        let record = record
            .ok_or_else(|| PortError::NotFound(format!("Action step {} not found", step_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        step_id: Uuid,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "DELETE FROM action_steps s USING goals g \
             WHERE s.id = $1 AND s.goal_id = $2 AND g.id = s.goal_id AND g.user_id = $3",
        )
        .bind(step_id)
        .bind(goal_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Action step {} not found",
                step_id
            )));
        }
        Ok(())
    }

    async fn insert_completed_date(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<bool> {
        self.ensure_owned(user_id, goal_id).await?;

        // The unique (goal_id, completed_date) index makes the duplicate
        // case a clean no-op.
        let result = sqlx::query(
            "INSERT INTO completed_dates (id, goal_id, completed_date) VALUES ($1, $2, $3) \
             ON CONFLICT (goal_id, completed_date) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(goal_id)
        .bind(date)
        .execute(&self.pool)
        .await
        .map_err(Self::unexpected)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_completed_date(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<()> {
        self.ensure_owned(user_id, goal_id).await?;

        sqlx::query("DELETE FROM completed_dates WHERE goal_id = $1 AND completed_date = $2")
            .bind(goal_id)
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(Self::unexpected)?;
        Ok(())
    }
}
