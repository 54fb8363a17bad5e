pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary that
// builds the web server router.
pub use rest::{
    chat_handler, check_in_handler, create_goal_handler, create_step_handler,
    delete_goal_handler, delete_step_handler, list_goals_handler, set_step_handler,
    stats_handler, undo_check_in_handler, update_goal_handler,
};
