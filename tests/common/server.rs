//! Live server and WebSocket client helpers
//!
//! `LiveServer` binds the full router to an ephemeral port on localhost with
//! the in-memory store, so tests exercise the real upgrade path, pumps and
//! hub. `WsClient` wraps a tokio-tungstenite stream with JSON helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use saas_manager::backend::messaging::{ChatStore, MemoryChatStore};
use saas_manager::backend::realtime::HubHandle;
use saas_manager::backend::routes::create_router;
use saas_manager::backend::server::{build_state, HubConfig, ServerConfig};
use saas_manager::shared::messaging::UserId;

use super::auth_helpers::{generate_test_token, TEST_SECRET};

/// How long to wait for an expected event
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Router served on 127.0.0.1 with a seeded in-memory store
pub struct LiveServer {
    pub addr: SocketAddr,
    pub store: Arc<MemoryChatStore>,
    pub hub: HubHandle,
}

impl LiveServer {
    pub async fn start() -> Self {
        Self::start_with(HubConfig::default()).await
    }

    pub async fn start_with(hub_config: HubConfig) -> Self {
        let store = Arc::new(MemoryChatStore::with_users([
            (1, "Alice"),
            (2, "Bob"),
            (3, "Carol"),
        ]));

        let config = ServerConfig {
            jwt_secret: TEST_SECRET.to_string(),
            hub: hub_config,
            ..ServerConfig::default()
        };
        let dyn_store: Arc<dyn ChatStore> = store.clone();
        let state = build_state(config, dyn_store);
        let hub = state.hub.clone();
        let app = create_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self { addr, store, hub }
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/api/ws?token={}", self.addr, token)
    }

    /// Open a WebSocket as the given user
    pub async fn connect(&self, user_id: UserId, name: &str) -> WsClient {
        let token = generate_test_token(user_id, name);
        let (stream, _) = connect_async(self.ws_url(&token))
            .await
            .expect("WebSocket handshake failed");
        WsClient { stream }
    }

    /// Online users according to the hub
    pub async fn online_users(&self) -> Vec<UserId> {
        self.hub
            .snapshot()
            .await
            .expect("Hub stopped")
            .online_users()
    }

    /// Poll the hub until exactly `count` connections are registered
    pub async fn wait_for_connections(&self, count: usize) {
        let wait = async {
            loop {
                let snapshot = self.hub.snapshot().await.expect("Hub stopped");
                if snapshot.connections == count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(EVENT_TIMEOUT, wait)
            .await
            .unwrap_or_else(|_| panic!("Hub never reached {} connections", count))
    }
}

/// Client side of a test WebSocket
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }

    /// Wait for the next event of `kind`, skipping control frames and other kinds
    pub async fn expect_event(&mut self, kind: &str) -> Value {
        let wait = async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let event: Value =
                            serde_json::from_str(text.as_str()).expect("Server sent invalid JSON");
                        if event["type"] == kind {
                            return event;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        panic!("Connection closed while waiting for {:?}", kind)
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => panic!("WebSocket error while waiting for {:?}: {:?}", kind, e),
                }
            }
        };
        tokio::time::timeout(EVENT_TIMEOUT, wait)
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for {:?}", kind))
    }

    /// Wait until an `online_users` event satisfies `accept`
    pub async fn expect_online_users<F>(&mut self, accept: F) -> Vec<UserId>
    where
        F: Fn(&[UserId]) -> bool,
    {
        loop {
            let event = self.expect_event("online_users").await;
            let users: Vec<UserId> =
                serde_json::from_value(event["data"].clone()).expect("online_users is not a list");
            if accept(&users) {
                return users;
            }
        }
    }

    /// Read until the server closes the connection
    pub async fn expect_closed(&mut self, within: Duration) {
        let wait = async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    Some(Ok(_)) => continue,
                }
            }
        };
        tokio::time::timeout(within, wait)
            .await
            .expect("Server did not close the connection");
    }

    /// Keep reading, and so keep answering pings, for `duration`
    pub async fn idle_for(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return,
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                    panic!("Connection closed while idling")
                }
                Ok(Some(Err(e))) => panic!("WebSocket error while idling: {:?}", e),
                Ok(Some(Ok(_))) => continue,
            }
        }
    }
}
