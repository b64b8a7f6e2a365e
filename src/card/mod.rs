// Public API - what other modules can use
pub use handlers::{current_card, list_cards, migrate_cards};
pub use service::CardService;
pub use tracker::{CardProgressionTracker, CardSummary, MigrationReport, ProgressResult};

// Internal modules
mod handlers;
pub mod models;
pub mod service;
pub mod tracker;
