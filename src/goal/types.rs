use serde::{Deserialize, Serialize};

use super::models::{GoalModel, GoalState};

/// Request payload for setting a goal
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateGoalRequest {
    pub title: String,
    pub target_stamps: i32,
}

/// A goal with the stamps earned towards it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: GoalModel,
    pub state: GoalState,
    pub progress: i32,
    pub remaining: i32,
}

impl GoalProgress {
    pub fn new(goal: GoalModel, progress: i32) -> Self {
        Self {
            state: goal.state(),
            remaining: (goal.target_stamps - progress).max(0),
            progress,
            goal,
        }
    }

    pub fn is_reached(&self) -> bool {
        self.progress >= self.goal.target_stamps
    }
}

/// Current goal lookup; `goal` is empty when the child has none
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentGoalResponse {
    pub goal: Option<GoalProgress>,
    /// True when this lookup is what marked the goal completed
    pub just_completed: bool,
}
