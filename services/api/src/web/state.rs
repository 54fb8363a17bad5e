//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use command_centre_core::ports::GoalAssistant;
use command_centre_core::service::GoalService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. The `GoalService` is the one logical service instance for the
/// process; it arrives here by construction, not through a global.
#[derive(Clone)]
pub struct AppState {
    pub goals: GoalService,
    /// Absent when no chat API key is configured; the chat endpoint then
    /// reports itself unavailable while the rest of the dashboard works.
    pub assistant: Option<Arc<dyn GoalAssistant>>,
    pub config: Arc<Config>,
}
