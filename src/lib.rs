// Library crate for the stamp card reward service
// This file exposes the public API for the binary and integration tests

pub mod card;
pub mod child;
pub mod config;
pub mod family;
pub mod goal;
pub mod reward;
pub mod shared;
pub mod stamp;
pub mod stats;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use family::{FamilyId, FAMILY_HEADER};
pub use reward::{Dice, RewardSelector, ScriptedDice, ThreadRngDice};
pub use shared::{AppError, AppState};
pub use stamp::{StampIssuer, StampService};
pub use store::{InMemoryStore, PostgresStore, StampStore, StoreTransaction};

/// Builds the HTTP API over the given state
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/rewards", get(reward::list_rewards))
        .route(
            "/children",
            post(child::create_child).get(child::list_children),
        )
        .route(
            "/children/:id",
            get(child::get_child)
                .patch(child::update_child)
                .delete(child::delete_child),
        )
        .route(
            "/children/:id/stamps",
            post(stamp::issue_stamp).get(stamp::list_stamps),
        )
        .route("/stamps/:id", get(stamp::get_stamp))
        .route("/stamps/:id/open", post(stamp::open_stamp))
        .route("/children/:id/cards", get(card::list_cards))
        .route("/children/:id/cards/current", get(card::current_card))
        .route("/children/:id/cards/migrate", post(card::migrate_cards))
        .route("/children/:id/stats", get(stats::child_stats))
        .route("/children/:id/calendar", get(stats::calendar))
        .route(
            "/children/:id/goal",
            get(goal::current_goal)
                .post(goal::create_goal)
                .delete(goal::cancel_goal),
        )
        .route("/children/:id/goals", get(goal::goal_history));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
