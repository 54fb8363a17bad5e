//! crates/command_centre_core/src/service.rs
//!
//! The `GoalService`: the single, explicitly constructed collaborator object
//! that orchestrates the store and the engine. It is created once at startup
//! with its `GoalStore` and passed to whatever needs it; there is no hidden
//! process-wide instance.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    ActionStep, Goal, GoalContext, GoalOverview, GoalStats, GoalUpdate, NewGoal, StepContext,
};
use crate::engine;
use crate::ports::{GoalStore, PortResult};

/// Orchestrates goal CRUD, action-step lifecycle, and check-ins, keeping the
/// derived-progress invariant intact on every mutation.
#[derive(Clone)]
pub struct GoalService {
    store: Arc<dyn GoalStore>,
}

impl GoalService {
    pub fn new(store: Arc<dyn GoalStore>) -> Self {
        Self { store }
    }

    /// The pinned time zone policy: "today" is the UTC calendar day,
    /// resolved once per operation.
    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    //=====================================================================================
    // Goals
    //=====================================================================================

    /// All of the user's goals decorated with the engine's display values.
    pub async fn overview(&self, user_id: Uuid) -> PortResult<Vec<GoalOverview>> {
        let goals = self.store.list_goals(user_id).await?;
        let today = Self::today();
        Ok(goals
            .into_iter()
            .map(|goal| {
                let days = goal.completion_days();
                GoalOverview {
                    current_streak: engine::current_streak(&days, today),
                    longest_streak: engine::longest_streak(&days),
                    marked_today: engine::is_marked_on(&days, today),
                    days_remaining: goal.target_date.map(|t| engine::days_until(t, today)),
                    goal,
                }
            })
            .collect())
    }

    pub async fn create_goal(&self, user_id: Uuid, new_goal: NewGoal) -> PortResult<Goal> {
        self.store.insert_goal(user_id, new_goal).await
    }

    pub async fn update_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        update: GoalUpdate,
    ) -> PortResult<Goal> {
        self.store.update_goal(user_id, goal_id, update).await
    }

    /// Deletes the goal; the store cascades its action steps and completed
    /// dates, so nothing owned by the goal survives it.
    pub async fn delete_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()> {
        self.store.delete_goal(user_id, goal_id).await
    }

    //=====================================================================================
    // Action Steps
    //=====================================================================================

    /// Adds a step; new steps start incomplete, so the goal's progress drops
    /// accordingly and is re-persisted.
    pub async fn add_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        title: &str,
    ) -> PortResult<ActionStep> {
        let step = self.store.insert_action_step(user_id, goal_id, title).await?;
        self.recompute_progress(user_id, goal_id).await?;
        Ok(step)
    }

    /// Marks a step complete or incomplete. Completing stamps today's UTC
    /// calendar day; un-completing clears the stamp. Either way the goal's
    /// progress is recomputed and persisted, and the fresh goal is returned.
    pub async fn set_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        step_id: Uuid,
        completed: bool,
    ) -> PortResult<Goal> {
        let stamp = completed.then(Self::today);
        self.store
            .set_action_step(user_id, goal_id, step_id, completed, stamp)
            .await?;
        self.recompute_progress(user_id, goal_id).await
    }

    /// Deletes a step and recomputes the owning goal's progress. Removing
    /// the last step takes progress back to 0.
    pub async fn remove_action_step(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        step_id: Uuid,
    ) -> PortResult<Goal> {
        self.store.delete_action_step(user_id, goal_id, step_id).await?;
        self.recompute_progress(user_id, goal_id).await
    }

    async fn recompute_progress(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<Goal> {
        let mut goal = self.store.get_goal(user_id, goal_id).await?;
        let (completed, total) = goal.step_counts();
        let progress = engine::progress(completed, total);
        if progress != goal.progress {
            self.store.set_goal_progress(user_id, goal_id, progress).await?;
            goal.progress = progress;
        }
        Ok(goal)
    }

    //=====================================================================================
    // Check-ins (Completed Dates)
    //=====================================================================================

    /// Records that the user engaged with the goal on `date` (today when
    /// omitted). Returns `false` when the day was already recorded; the
    /// duplicate is a no-op rather than an error.
    pub async fn check_in(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        date: Option<NaiveDate>,
    ) -> PortResult<bool> {
        let date = date.unwrap_or_else(Self::today);
        self.store.insert_completed_date(user_id, goal_id, date).await
    }

    pub async fn undo_check_in(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<()> {
        self.store.delete_completed_date(user_id, goal_id, date).await
    }

    //=====================================================================================
    // Aggregates
    //=====================================================================================

    /// Dashboard-wide statistics across all of the user's goals.
    pub async fn stats(&self, user_id: Uuid) -> PortResult<GoalStats> {
        let goals = self.store.list_goals(user_id).await?;
        let total_goals = goals.len();
        let mut completed_actions = 0;
        let mut total_actions = 0;
        let mut progress_sum: u32 = 0;
        for goal in &goals {
            let (completed, total) = goal.step_counts();
            completed_actions += completed;
            total_actions += total;
            progress_sum += u32::from(goal.progress);
        }
        let average_progress = if total_goals == 0 {
            0
        } else {
            (progress_sum as f64 / total_goals as f64).round() as u8
        };
        Ok(GoalStats {
            total_goals,
            completed_actions,
            total_actions,
            average_progress,
        })
    }

    /// The snapshot of goal data handed to the language-model collaborator.
    pub async fn assistant_context(&self, user_id: Uuid) -> PortResult<Vec<GoalContext>> {
        let goals = self.store.list_goals(user_id).await?;
        let today = Self::today();
        Ok(goals
            .into_iter()
            .map(|goal| {
                let days = goal.completion_days();
                GoalContext {
                    daily_streak: engine::current_streak(&days, today),
                    completed_dates: days,
                    action_steps: goal
                        .action_steps
                        .iter()
                        .map(|s| StepContext {
                            title: s.title.clone(),
                            completed: s.completed,
                        })
                        .collect(),
                    incomplete_tasks: goal
                        .action_steps
                        .iter()
                        .filter(|s| !s.completed)
                        .map(|s| s.title.clone())
                        .collect(),
                    title: goal.title,
                    description: goal.description,
                    target_date: goal.target_date,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CompletedDate;
    use crate::ports::PortError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory `GoalStore` double mirroring the relational layout: flat
    /// collections tied together by ids, cascade on goal deletion.
    #[derive(Default)]
    struct MemStore {
        goals: Mutex<Vec<Goal>>,
    }

    impl MemStore {
        fn with_goal(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            f: impl FnOnce(&mut Goal),
        ) -> PortResult<Goal> {
            let mut goals = self.goals.lock().unwrap();
            let goal = goals
                .iter_mut()
                .find(|g| g.id == goal_id && g.user_id == user_id)
                .ok_or_else(|| PortError::NotFound(format!("Goal {goal_id}")))?;
            f(goal);
            goal.updated_at = Utc::now();
            Ok(goal.clone())
        }
    }

    #[async_trait]
    impl GoalStore for MemStore {
        async fn list_goals(&self, user_id: Uuid) -> PortResult<Vec<Goal>> {
            Ok(self
                .goals
                .lock()
                .unwrap()
                .iter()
                .filter(|g| g.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn get_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<Goal> {
            self.with_goal(user_id, goal_id, |_| {})
        }

        async fn insert_goal(&self, user_id: Uuid, new_goal: NewGoal) -> PortResult<Goal> {
            let now = Utc::now();
            let goal = Goal {
                id: Uuid::new_v4(),
                user_id,
                title: new_goal.title,
                description: new_goal.description,
                target_date: new_goal.target_date,
                progress: 0,
                created_at: now,
                updated_at: now,
                action_steps: Vec::new(),
                completed_dates: Vec::new(),
            };
            self.goals.lock().unwrap().push(goal.clone());
            Ok(goal)
        }

        async fn update_goal(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            update: GoalUpdate,
        ) -> PortResult<Goal> {
            self.with_goal(user_id, goal_id, |goal| {
                if let Some(title) = update.title {
                    goal.title = title;
                }
                if let Some(description) = update.description {
                    goal.description = Some(description);
                }
                if let Some(target_date) = update.target_date {
                    goal.target_date = Some(target_date);
                }
            })
        }

        async fn delete_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()> {
            let mut goals = self.goals.lock().unwrap();
            let before = goals.len();
            goals.retain(|g| !(g.id == goal_id && g.user_id == user_id));
            if goals.len() == before {
                return Err(PortError::NotFound(format!("Goal {goal_id}")));
            }
            Ok(())
        }

        async fn set_goal_progress(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            progress: u8,
        ) -> PortResult<()> {
            self.with_goal(user_id, goal_id, |goal| goal.progress = progress)?;
            Ok(())
        }

        async fn insert_action_step(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            title: &str,
        ) -> PortResult<ActionStep> {
            let now = Utc::now();
            let step = ActionStep {
                id: Uuid::new_v4(),
                goal_id,
                title: title.to_string(),
                completed: false,
                completed_date: None,
                created_at: now,
                updated_at: now,
            };
            let inserted = step.clone();
            self.with_goal(user_id, goal_id, |goal| goal.action_steps.push(step))?;
            Ok(inserted)
        }

        async fn set_action_step(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            step_id: Uuid,
            completed: bool,
            completed_date: Option<NaiveDate>,
        ) -> PortResult<ActionStep> {
            let goal = self.with_goal(user_id, goal_id, |goal| {
                if let Some(step) = goal.action_steps.iter_mut().find(|s| s.id == step_id) {
                    step.completed = completed;
                    step.completed_date = completed_date;
                    step.updated_at = Utc::now();
                }
            })?;
            goal.action_steps
                .into_iter()
                .find(|s| s.id == step_id)
                .ok_or_else(|| PortError::NotFound(format!("Action step {step_id}")))
        }

        async fn delete_action_step(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            step_id: Uuid,
        ) -> PortResult<()> {
            self.with_goal(user_id, goal_id, |goal| {
                goal.action_steps.retain(|s| s.id != step_id)
            })?;
            Ok(())
        }

        async fn insert_completed_date(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            date: NaiveDate,
        ) -> PortResult<bool> {
            let mut inserted = false;
            self.with_goal(user_id, goal_id, |goal| {
                if !goal.completed_dates.iter().any(|cd| cd.completed_date == date) {
                    goal.completed_dates.push(CompletedDate {
                        id: Uuid::new_v4(),
                        goal_id,
                        completed_date: date,
                        created_at: Utc::now(),
                    });
                    inserted = true;
                }
            })?;
            Ok(inserted)
        }

        async fn delete_completed_date(
            &self,
            user_id: Uuid,
            goal_id: Uuid,
            date: NaiveDate,
        ) -> PortResult<()> {
            self.with_goal(user_id, goal_id, |goal| {
                goal.completed_dates.retain(|cd| cd.completed_date != date)
            })?;
            Ok(())
        }
    }

    fn service() -> (GoalService, Uuid) {
        (GoalService::new(Arc::new(MemStore::default())), Uuid::new_v4())
    }

    #[tokio::test]
    async fn toggling_steps_keeps_progress_derived() {
        let (service, user) = service();
        let goal = service
            .create_goal(user, NewGoal { title: "Learn Rust".into(), description: None, target_date: None })
            .await
            .unwrap();
        assert_eq!(goal.progress, 0);

        let a = service.add_action_step(user, goal.id, "Read the book").await.unwrap();
        let b = service.add_action_step(user, goal.id, "Build a crate").await.unwrap();
        service.add_action_step(user, goal.id, "Ship it").await.unwrap();

        let goal = service.set_action_step(user, goal.id, a.id, true).await.unwrap();
        assert_eq!(goal.progress, 33);
        let step = goal.action_steps.iter().find(|s| s.id == a.id).unwrap();
        assert!(step.completed);
        assert!(step.completed_date.is_some());

        let goal = service.set_action_step(user, goal.id, b.id, true).await.unwrap();
        assert_eq!(goal.progress, 67);

        // Un-completing clears the stamp and drops progress back.
        let goal = service.set_action_step(user, goal.id, b.id, false).await.unwrap();
        assert_eq!(goal.progress, 33);
        let step = goal.action_steps.iter().find(|s| s.id == b.id).unwrap();
        assert!(step.completed_date.is_none());
    }

    #[tokio::test]
    async fn removing_the_last_step_resets_progress() {
        let (service, user) = service();
        let goal = service
            .create_goal(user, NewGoal { title: "Run".into(), description: None, target_date: None })
            .await
            .unwrap();
        let step = service.add_action_step(user, goal.id, "5k").await.unwrap();
        let goal = service.set_action_step(user, goal.id, step.id, true).await.unwrap();
        assert_eq!(goal.progress, 100);

        let goal = service.remove_action_step(user, goal.id, step.id).await.unwrap();
        assert_eq!(goal.progress, 0);
        assert!(goal.action_steps.is_empty());
    }

    #[tokio::test]
    async fn duplicate_check_in_is_a_no_op() {
        let (service, user) = service();
        let goal = service
            .create_goal(user, NewGoal { title: "Meditate".into(), description: None, target_date: None })
            .await
            .unwrap();
        let day: NaiveDate = "2025-01-15".parse().unwrap();

        assert!(service.check_in(user, goal.id, Some(day)).await.unwrap());
        assert!(!service.check_in(user, goal.id, Some(day)).await.unwrap());

        let goals = service.store.list_goals(user).await.unwrap();
        assert_eq!(goals[0].completed_dates.len(), 1);

        service.undo_check_in(user, goal.id, day).await.unwrap();
        let goals = service.store.list_goals(user).await.unwrap();
        assert!(goals[0].completed_dates.is_empty());
    }

    #[tokio::test]
    async fn overview_decorates_goals_with_engine_output() {
        let (service, user) = service();
        let goal = service
            .create_goal(user, NewGoal { title: "Write".into(), description: None, target_date: None })
            .await
            .unwrap();
        // Check in today and yesterday: current streak 2, marked today.
        let today = Utc::now().date_naive();
        service.check_in(user, goal.id, Some(today)).await.unwrap();
        service
            .check_in(user, goal.id, Some(today.pred_opt().unwrap()))
            .await
            .unwrap();

        let overview = service.overview(user).await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].current_streak, 2);
        assert_eq!(overview[0].longest_streak, 2);
        assert!(overview[0].marked_today);
        assert_eq!(overview[0].days_remaining, None);
    }

    #[tokio::test]
    async fn deleting_a_goal_cascades_everything_it_owns() {
        let (service, user) = service();
        let goal = service
            .create_goal(user, NewGoal { title: "Gone".into(), description: None, target_date: None })
            .await
            .unwrap();
        service.add_action_step(user, goal.id, "step").await.unwrap();
        service.check_in(user, goal.id, None).await.unwrap();

        service.delete_goal(user, goal.id).await.unwrap();
        assert!(service.overview(user).await.unwrap().is_empty());
        assert!(matches!(
            service.store.get_goal(user, goal.id).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stats_aggregate_across_goals() {
        let (service, user) = service();
        let a = service
            .create_goal(user, NewGoal { title: "A".into(), description: None, target_date: None })
            .await
            .unwrap();
        let b = service
            .create_goal(user, NewGoal { title: "B".into(), description: None, target_date: None })
            .await
            .unwrap();
        let s1 = service.add_action_step(user, a.id, "one").await.unwrap();
        service.add_action_step(user, a.id, "two").await.unwrap();
        service.add_action_step(user, b.id, "three").await.unwrap();
        service.set_action_step(user, a.id, s1.id, true).await.unwrap();

        let stats = service.stats(user).await.unwrap();
        assert_eq!(
            stats,
            GoalStats {
                total_goals: 2,
                completed_actions: 1,
                total_actions: 3,
                average_progress: 25,
            }
        );
    }

    #[tokio::test]
    async fn stats_of_no_goals_are_all_zero() {
        let (service, user) = service();
        let stats = service.stats(user).await.unwrap();
        assert_eq!(
            stats,
            GoalStats { total_goals: 0, completed_actions: 0, total_actions: 0, average_progress: 0 }
        );
    }

    #[tokio::test]
    async fn assistant_context_has_the_documented_shape() {
        let (service, user) = service();
        let goal = service
            .create_goal(
                user,
                NewGoal {
                    title: "Learn TypeScript".into(),
                    description: Some("Master the fundamentals".into()),
                    target_date: Some("2025-12-31".parse().unwrap()),
                },
            )
            .await
            .unwrap();
        let done = service.add_action_step(user, goal.id, "Basics course").await.unwrap();
        service.add_action_step(user, goal.id, "Build a project").await.unwrap();
        service.set_action_step(user, goal.id, done.id, true).await.unwrap();
        service.check_in(user, goal.id, None).await.unwrap();

        let context = service.assistant_context(user).await.unwrap();
        let json = serde_json::to_value(&context).unwrap();
        let entry = &json[0];
        assert_eq!(entry["title"], "Learn TypeScript");
        assert_eq!(entry["daily_streak"], 1);
        assert_eq!(entry["action_steps"].as_array().unwrap().len(), 2);
        assert_eq!(entry["incomplete_tasks"], serde_json::json!(["Build a project"]));
        assert_eq!(entry["completed_dates"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn users_never_see_each_others_goals() {
        let (service, user) = service();
        let stranger = Uuid::new_v4();
        let goal = service
            .create_goal(user, NewGoal { title: "Private".into(), description: None, target_date: None })
            .await
            .unwrap();

        assert!(service.overview(stranger).await.unwrap().is_empty());
        assert!(matches!(
            service.delete_goal(stranger, goal.id).await,
            Err(PortError::NotFound(_))
        ));
    }
}
