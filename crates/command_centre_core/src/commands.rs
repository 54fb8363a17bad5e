//! crates/command_centre_core/src/commands.rs
//!
//! The optimistic-update protocol for a UI sitting in front of a slow
//! remote store: apply a tentative command to a local snapshot, fire the
//! remote write, and on failure apply the command's inverse to roll the
//! snapshot back. Every mutation is an explicit command with a well-defined
//! inverse rather than an ad hoc state patch.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{CompletedDate, Goal};
use crate::engine;

/// A reversible mutation of the local goal snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalCommand {
    /// Record a check-in for the day. Applying when the day is already
    /// present is a no-op, matching the store's duplicate policy.
    CheckIn { goal_id: Uuid, date: NaiveDate },
    /// Remove a check-in for the day.
    UndoCheckIn { goal_id: Uuid, date: NaiveDate },
    /// Set an action step's completion flag and stamped day. Carries the
    /// step's previous stamp so the inverse can restore it exactly.
    SetStepCompleted {
        goal_id: Uuid,
        step_id: Uuid,
        completed: bool,
        stamped_date: Option<NaiveDate>,
        previous_date: Option<NaiveDate>,
    },
}

impl GoalCommand {
    /// The command that undoes this one.
    pub fn inverse(&self) -> GoalCommand {
        match *self {
            GoalCommand::CheckIn { goal_id, date } => GoalCommand::UndoCheckIn { goal_id, date },
            GoalCommand::UndoCheckIn { goal_id, date } => GoalCommand::CheckIn { goal_id, date },
            GoalCommand::SetStepCompleted {
                goal_id,
                step_id,
                completed,
                stamped_date,
                previous_date,
            } => GoalCommand::SetStepCompleted {
                goal_id,
                step_id,
                completed: !completed,
                stamped_date: previous_date,
                previous_date: stamped_date,
            },
        }
    }

    /// Applies the command to a local snapshot, maintaining the same
    /// invariants the store enforces: duplicate check-in days are no-ops
    /// and step toggles recompute the owning goal's progress. Unknown ids
    /// leave the snapshot untouched.
    pub fn apply(&self, goals: &mut [Goal]) {
        match *self {
            GoalCommand::CheckIn { goal_id, date } => {
                if let Some(goal) = goals.iter_mut().find(|g| g.id == goal_id) {
                    let already = goal.completed_dates.iter().any(|cd| cd.completed_date == date);
                    if !already {
                        goal.completed_dates.push(CompletedDate {
                            id: Uuid::new_v4(),
                            goal_id,
                            completed_date: date,
                            created_at: chrono::Utc::now(),
                        });
                    }
                }
            }
            GoalCommand::UndoCheckIn { goal_id, date } => {
                if let Some(goal) = goals.iter_mut().find(|g| g.id == goal_id) {
                    goal.completed_dates.retain(|cd| cd.completed_date != date);
                }
            }
            GoalCommand::SetStepCompleted {
                goal_id,
                step_id,
                completed,
                stamped_date,
                ..
            } => {
                if let Some(goal) = goals.iter_mut().find(|g| g.id == goal_id) {
                    if let Some(step) = goal.action_steps.iter_mut().find(|s| s.id == step_id) {
                        step.completed = completed;
                        step.completed_date = stamped_date;
                    }
                    let (done, total) = goal.step_counts();
                    goal.progress = engine::progress(done, total);
                }
            }
        }
    }
}

/// A local view of the user's goals that accepts tentative commands ahead
/// of the authoritative write. Each instance is independent; two snapshots
/// never share mutable state, so re-running the same reconciliation twice
/// with different inputs produces non-interfering results.
#[derive(Debug, Clone)]
pub struct OptimisticGoals {
    goals: Vec<Goal>,
}

impl OptimisticGoals {
    pub fn new(goals: Vec<Goal>) -> Self {
        Self { goals }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Applies a tentative command before the remote write is acknowledged.
    pub fn apply(&mut self, command: &GoalCommand) {
        command.apply(&mut self.goals);
    }

    /// Rolls a tentative command back after the remote write failed.
    pub fn rollback(&mut self, command: &GoalCommand) {
        command.inverse().apply(&mut self.goals);
    }

    /// Replaces the snapshot once the authoritative state arrives.
    pub fn reconcile(&mut self, goals: Vec<Goal>) {
        self.goals = goals;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionStep;
    use chrono::Utc;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn fixture() -> (Vec<Goal>, Uuid, Uuid) {
        let goal_id = Uuid::new_v4();
        let step_id = Uuid::new_v4();
        let now = Utc::now();
        let goals = vec![Goal {
            id: goal_id,
            user_id: Uuid::new_v4(),
            title: "Daily exercise".into(),
            description: None,
            target_date: None,
            progress: 0,
            created_at: now,
            updated_at: now,
            action_steps: vec![
                ActionStep {
                    id: step_id,
                    goal_id,
                    title: "Morning jog".into(),
                    completed: false,
                    completed_date: None,
                    created_at: now,
                    updated_at: now,
                },
                ActionStep {
                    id: Uuid::new_v4(),
                    goal_id,
                    title: "Stretch".into(),
                    completed: false,
                    completed_date: None,
                    created_at: now,
                    updated_at: now,
                },
            ],
            completed_dates: vec![],
        }];
        (goals, goal_id, step_id)
    }

    #[test]
    fn step_toggle_recomputes_progress_and_inverts_cleanly() {
        let (goals, goal_id, step_id) = fixture();
        let mut view = OptimisticGoals::new(goals);

        let command = GoalCommand::SetStepCompleted {
            goal_id,
            step_id,
            completed: true,
            stamped_date: Some(d("2025-01-21")),
            previous_date: None,
        };
        view.apply(&command);
        assert_eq!(view.goals()[0].progress, 50);
        assert!(view.goals()[0].action_steps[0].completed);

        view.rollback(&command);
        assert_eq!(view.goals()[0].progress, 0);
        assert!(!view.goals()[0].action_steps[0].completed);
        assert!(view.goals()[0].action_steps[0].completed_date.is_none());
    }

    #[test]
    fn check_in_then_failed_write_rolls_back_to_the_original_snapshot() {
        let (goals, goal_id, _) = fixture();
        let mut view = OptimisticGoals::new(goals);

        let command = GoalCommand::CheckIn { goal_id, date: d("2025-01-21") };
        view.apply(&command);
        assert_eq!(view.goals()[0].completed_dates.len(), 1);

        // The remote write fails; the tentative change is inverted.
        view.rollback(&command);
        assert!(view.goals()[0].completed_dates.is_empty());
    }

    #[test]
    fn duplicate_check_in_apply_is_a_no_op() {
        let (goals, goal_id, _) = fixture();
        let mut view = OptimisticGoals::new(goals);
        let command = GoalCommand::CheckIn { goal_id, date: d("2025-01-21") };

        view.apply(&command);
        view.apply(&command);
        assert_eq!(view.goals()[0].completed_dates.len(), 1);
    }

    #[test]
    fn snapshots_are_independent() {
        let (goals, goal_id, _) = fixture();
        let mut first = OptimisticGoals::new(goals.clone());
        let second = OptimisticGoals::new(goals);

        first.apply(&GoalCommand::CheckIn { goal_id, date: d("2025-01-21") });
        assert_eq!(first.goals()[0].completed_dates.len(), 1);
        assert!(second.goals()[0].completed_dates.is_empty());
    }

    #[test]
    fn reconcile_adopts_the_authoritative_state() {
        let (goals, goal_id, _) = fixture();
        let mut view = OptimisticGoals::new(goals.clone());
        view.apply(&GoalCommand::CheckIn { goal_id, date: d("2025-01-21") });

        // The authoritative snapshot arrives (without the rejected write).
        view.reconcile(goals);
        assert!(view.goals()[0].completed_dates.is_empty());
    }
}
