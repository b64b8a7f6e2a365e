use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

use stampcard::FAMILY_HEADER;

use super::setup::TestSetup;

/// Status and decoded JSON body of one response
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a request as the given family and decode the reply
    pub async fn send(&self, method: &str, uri: &str, family: i64, body: Option<Value>) -> Reply {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(FAMILY_HEADER, family.to_string());
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, body }
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Create a child in family 1 and return its id
    pub async fn create_child(&self, name: &str, target_stamps: i32) -> String {
        let reply = self
            .send(
                "POST",
                "/api/children",
                1,
                Some(serde_json::json!({ "name": name, "target_stamps": target_stamps })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.body["id"].as_str().unwrap().to_string()
    }

    pub async fn issue_stamp(&self, child_id: &str) -> Reply {
        self.send(
            "POST",
            &format!("/api/children/{child_id}/stamps"),
            1,
            Some(serde_json::json!({})),
        )
        .await
    }

    pub async fn open_stamp(&self, stamp_id: &str) -> Reply {
        self.send("POST", &format!("/api/stamps/{stamp_id}/open"), 1, None)
            .await
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send("GET", uri, 1, None).await
    }
}
