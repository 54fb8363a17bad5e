pub mod commands;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod service;

pub use commands::{GoalCommand, OptimisticGoals};
pub use domain::{
    ActionStep, CompletedDate, Goal, GoalContext, GoalOverview, GoalStats, GoalUpdate, NewGoal,
    StepContext,
};
pub use ports::{GoalAssistant, GoalStore, PortError, PortResult};
pub use service::GoalService;
