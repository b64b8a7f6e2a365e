use serde::{Deserialize, Serialize};

/// Request payload for creating a child
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateChildRequest {
    pub name: String,
    /// Falls back to the configured default when omitted
    pub target_stamps: Option<i32>,
}

/// Request payload for updating a child; omitted fields are unchanged
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub target_stamps: Option<i32>,
}
