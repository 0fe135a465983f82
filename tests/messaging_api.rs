//! Messaging API integration tests
//!
//! Tests for the REST endpoints: conversations, messages, unread counter and
//! online users, against the in-memory store.

#[cfg(feature = "ssr")]
mod common;

#[cfg(feature = "ssr")]
mod tests {
    use std::sync::Arc;

    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::common::{alice, bob, carol, TestUser, TEST_SECRET};
    use saas_manager::backend::messaging::{ChatStore, MemoryChatStore};
    use saas_manager::backend::routes::create_router;
    use saas_manager::backend::server::{build_state, ServerConfig};

    fn create_test_server() -> TestServer {
        let store: Arc<dyn ChatStore> = Arc::new(MemoryChatStore::with_users([
            (1, "Alice"),
            (2, "Bob"),
            (3, "Carol"),
        ]));
        let config = ServerConfig {
            jwt_secret: TEST_SECRET.to_string(),
            ..ServerConfig::default()
        };
        let app = create_router(build_state(config, store));
        TestServer::new(app).unwrap()
    }

    fn bearer(user: &TestUser) -> HeaderValue {
        HeaderValue::from_str(&user.bearer()).unwrap()
    }

    async fn open_conversation(server: &TestServer, user: &TestUser, other: i64) -> Value {
        let response = server
            .post("/api/messages/conversations")
            .add_header(header::AUTHORIZATION, bearer(user))
            .json(&json!({ "other_user_id": other }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json()
    }

    async fn send(server: &TestServer, user: &TestUser, receiver: i64, text: &str) -> Value {
        let response = server
            .post("/api/messages/send")
            .add_header(header::AUTHORIZATION, bearer(user))
            .json(&json!({ "receiver_id": receiver, "message": text }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json()
    }

    async fn unread(server: &TestServer, user: &TestUser) -> i64 {
        let response = server
            .get("/api/messages/unread-count")
            .add_header(header::AUTHORIZATION, bearer(user))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        body["count"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let server = create_test_server();

        let response = server.get("/health").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let server = create_test_server();

        let response = server.get("/api/messages/conversations").await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["status"], 401);
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let server = create_test_server();

        let response = server
            .get("/api/messages/unread-count")
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer not-a-token"))
            .await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_open_conversation_is_symmetric() {
        let server = create_test_server();

        let from_bob = open_conversation(&server, &bob(), 1).await;
        let from_alice = open_conversation(&server, &alice(), 2).await;

        assert_eq!(from_bob["id"], from_alice["id"]);
        assert_eq!(from_alice["user1_id"], 1);
        assert_eq!(from_alice["user2_id"], 2);
        assert_eq!(from_alice["user1_name"], "Alice");
        assert_eq!(from_alice["user2_name"], "Bob");
        assert_eq!(from_alice["unread_count"], 0);
    }

    #[tokio::test]
    async fn test_open_conversation_with_self_is_rejected() {
        let server = create_test_server();

        let response = server
            .post("/api/messages/conversations")
            .add_header(header::AUTHORIZATION, bearer(&alice()))
            .json(&json!({ "other_user_id": 1 }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_empty_message_is_rejected() {
        let server = create_test_server();

        let response = server
            .post("/api/messages/send")
            .add_header(header::AUTHORIZATION, bearer(&alice()))
            .json(&json!({ "receiver_id": 2, "message": "   " }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_then_read_clears_unread() {
        let server = create_test_server();
        let (alice, bob) = (alice(), bob());

        let first = send(&server, &alice, 2, "first").await;
        let second = send(&server, &alice, 2, "second").await;
        assert_eq!(first["sender_name"], "Alice");
        assert_eq!(first["is_read"], false);
        assert_eq!(first["conversation_id"], second["conversation_id"]);
        assert_eq!(unread(&server, &bob).await, 2);
        assert_eq!(unread(&server, &alice).await, 0);

        let conversation_id = first["conversation_id"].as_i64().unwrap();
        let response = server
            .get(&format!("/api/messages/conversations/{}/messages", conversation_id))
            .add_header(header::AUTHORIZATION, bearer(&bob))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let messages: Vec<Value> = response.json();
        let bodies: Vec<&str> = messages
            .iter()
            .map(|m| m["message"].as_str().unwrap())
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(unread(&server, &bob).await, 0);
    }

    #[tokio::test]
    async fn test_outsider_cannot_read_conversation() {
        let server = create_test_server();

        let sent = send(&server, &alice(), 2, "private").await;
        let conversation_id = sent["conversation_id"].as_i64().unwrap();

        let response = server
            .get(&format!("/api/messages/conversations/{}/messages", conversation_id))
            .add_header(header::AUTHORIZATION, bearer(&carol()))
            .await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_conversations_carries_counters() {
        let server = create_test_server();
        let (alice, bob) = (alice(), bob());

        send(&server, &alice, 2, "hello bob").await;
        send(&server, &alice, 3, "hello carol").await;

        let response = server
            .get("/api/messages/conversations")
            .add_header(header::AUTHORIZATION, bearer(&bob))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let conversations: Vec<Value> = response.json();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0]["unread_count"], 1);
        assert_eq!(conversations[0]["last_message"], "hello bob");

        let response = server
            .get("/api/messages/conversations")
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .await;
        let conversations: Vec<Value> = response.json();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0]["last_message"], "hello carol");
    }

    #[tokio::test]
    async fn test_online_users_without_sockets() {
        let server = create_test_server();

        let response = server
            .get("/api/messages/online-users")
            .add_header(header::AUTHORIZATION, bearer(&alice()))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let users: Vec<i64> = response.json();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = create_test_server();

        let response = server.get("/api/unknown").await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }
}
