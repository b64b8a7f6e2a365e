// Public API - what other modules can use
pub use handlers::{create_child, delete_child, get_child, list_children, update_child};
pub use service::{find_child, ChildService};

// Internal modules
mod handlers;
pub mod models;
pub mod service;
pub mod types;
