// Public API - what other modules can use
pub use handlers::{get_stamp, issue_stamp, list_stamps, open_stamp};
pub use issuer::StampIssuer;
pub use service::StampService;

// Internal modules
mod handlers;
pub mod issuer;
pub mod models;
pub mod service;
pub mod types;
