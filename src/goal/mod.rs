// Public API - what other modules can use
pub use handlers::{cancel_goal, create_goal, current_goal, goal_history};
pub use service::GoalService;

// Internal modules
mod handlers;
pub mod models;
pub mod service;
pub mod types;
