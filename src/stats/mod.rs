// Public API - what other modules can use
pub use handlers::{calendar, child_stats};
pub use models::{CalendarDay, CalendarMonth, ChildStats, CollectionProgress, TierCollection};
pub use service::StatsService;

// Internal modules
pub mod aggregation;
mod handlers;
pub mod models;
pub mod service;
