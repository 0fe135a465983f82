/**
 * Connection Lifecycle
 *
 * One WebSocket connection runs two pumps:
 *
 * - the **writer** drains the connection's outbound queue onto the socket and
 *   sends a ping every `ping_period`. Every write has a `write_wait` deadline.
 *   When the hub releases the queue the writer sends a close frame and stops.
 * - the **reader** decodes inbound frames in arrival order and dispatches
 *   them. Its deadline is `pong_wait` and is extended only by pongs, so a
 *   client that stops answering pings is closed even if it keeps talking.
 *
 * Whichever pump ends first ends the connection, and the connection is
 * unregistered from the hub exactly once.
 */
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::dispatch::{dispatch, Session};
use super::hub::{ConnectionHandle, ConnectionId, HubHandle};
use crate::backend::messaging::ChatStore;
use crate::backend::middleware::AuthenticatedUser;
use crate::backend::server::config::HubConfig;
use crate::shared::event::{ClientEvent, ServerEvent};
use crate::shared::messaging::UserId;
use crate::shared::SharedError;

/// Where a connection is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame or the stream ended
    PeerClosed,
    /// Socket read failed
    TransportError,
    /// No pong within the read deadline
    IdleTimeout,
    /// Too many consecutive frames that could not be decoded
    MalformedFrames,
    /// Frame larger than the configured limit
    OversizeFrame,
    /// The hub released the outbound queue
    QueueClosed,
    /// Socket write failed or missed its deadline
    WriteFailed,
    /// The hub is not running
    HubStopped,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CloseReason::PeerClosed => "peer closed",
            CloseReason::TransportError => "transport error",
            CloseReason::IdleTimeout => "idle timeout",
            CloseReason::MalformedFrames => "too many malformed frames",
            CloseReason::OversizeFrame => "oversize frame",
            CloseReason::QueueClosed => "outbound queue closed",
            CloseReason::WriteFailed => "write failed",
            CloseReason::HubStopped => "hub stopped",
        };
        f.write_str(text)
    }
}

struct Connection {
    id: ConnectionId,
    user_id: UserId,
    state: ConnectionState,
}

impl Connection {
    fn transition(&mut self, next: ConnectionState) {
        tracing::debug!(
            "Connection {} (user {}): {:?} -> {:?}",
            self.id,
            self.user_id,
            self.state,
            next
        );
        self.state = next;
    }
}

/// Run one upgraded connection to completion
pub async fn serve(
    socket: WebSocket,
    user: AuthenticatedUser,
    hub: HubHandle,
    store: Arc<dyn ChatStore>,
    config: HubConfig,
) {
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);
    let handle = ConnectionHandle::new(user.user_id, outbound_tx);
    let mut connection = Connection {
        id: handle.id,
        user_id: user.user_id,
        state: ConnectionState::Connecting,
    };

    if let Err(e) = hub.register(handle).await {
        tracing::error!(
            "Connection {} not registered ({}): {}",
            connection.id,
            e,
            CloseReason::HubStopped
        );
        connection.transition(ConnectionState::Closed);
        return;
    }
    connection.transition(ConnectionState::Active);
    tracing::info!(
        "User {} ({}) connected as {}",
        user.user_id,
        user.name,
        connection.id
    );

    replay_history(&hub, store.as_ref(), connection.id, user.user_id, config.history_limit).await;

    let session = Session {
        connection_id: connection.id,
        user_id: user.user_id,
        display_name: user.name,
        hub: hub.clone(),
        store,
    };

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_pump(
        sink,
        outbound_rx,
        config.ping_period(),
        config.write_wait,
    ));
    let mut reader = tokio::spawn(read_pump(stream, session, config.clone()));

    let reason = tokio::select! {
        result = &mut reader => {
            connection.transition(ConnectionState::Closing);
            // Unregistering releases the queue, which lets the writer send a close frame
            unregister(&hub, connection.id).await;
            if tokio::time::timeout(config.write_wait, &mut writer).await.is_err() {
                writer.abort();
            }
            result.unwrap_or(CloseReason::TransportError)
        }
        result = &mut writer => {
            connection.transition(ConnectionState::Closing);
            reader.abort();
            unregister(&hub, connection.id).await;
            result.unwrap_or(CloseReason::WriteFailed)
        }
    };

    connection.transition(ConnectionState::Closed);
    tracing::info!(
        "Connection {} of user {} closed: {}",
        connection.id,
        connection.user_id,
        reason
    );
}

async fn unregister(hub: &HubHandle, id: ConnectionId) {
    if let Err(e) = hub.unregister(id).await {
        tracing::warn!("Connection {} not unregistered: {}", id, e);
    }
}

/// Push the user's recent messages to the new connection only
async fn replay_history(
    hub: &HubHandle,
    store: &dyn ChatStore,
    id: ConnectionId,
    user_id: UserId,
    limit: i64,
) {
    match store.fetch_recent_messages(user_id, limit).await {
        Ok(messages) => {
            tracing::debug!("Replaying {} messages to connection {}", messages.len(), id);
            if let Err(e) = hub.send_to(id, ServerEvent::History(messages)).await {
                tracing::warn!("History for connection {} not sent: {}", id, e);
            }
        }
        Err(e) => {
            tracing::error!("Failed to load history for user {}: {:?}", user_id, e);
        }
    }
}

async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: Message,
    write_wait: Duration,
) -> Result<(), CloseReason> {
    match tokio::time::timeout(write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::debug!("WebSocket write failed: {:?}", e);
            Err(CloseReason::WriteFailed)
        }
        Err(_) => {
            tracing::warn!("WebSocket write timed out after {:?}", write_wait);
            Err(CloseReason::WriteFailed)
        }
    }
}

async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
    ping_period: Duration,
    write_wait: Duration,
) -> CloseReason {
    let mut ping = tokio::time::interval_at(Instant::now() + ping_period, ping_period);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(payload) => {
                    if let Err(reason) = write_frame(&mut sink, Message::Text(payload), write_wait).await {
                        return reason;
                    }
                }
                None => {
                    let _ = write_frame(&mut sink, Message::Close(None), write_wait).await;
                    return CloseReason::QueueClosed;
                }
            },
            _ = ping.tick() => {
                if let Err(reason) = write_frame(&mut sink, Message::Ping(Bytes::new()), write_wait).await {
                    return reason;
                }
            }
        }
    }
}

/// Counts consecutive frames that could not be acted on
struct MalformedCounter {
    consecutive: u32,
    limit: u32,
}

impl MalformedCounter {
    fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit,
        }
    }

    /// Record a bad frame; true once the limit is exceeded
    fn strike(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive > self.limit
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    session: Session,
    config: HubConfig,
) -> CloseReason {
    let mut deadline = Instant::now() + config.pong_wait;
    let mut malformed = MalformedCounter::new(config.max_malformed_frames);

    loop {
        let message = match tokio::time::timeout_at(deadline, stream.next()).await {
            Err(_) => return CloseReason::IdleTimeout,
            Ok(None) => return CloseReason::PeerClosed,
            Ok(Some(Err(e))) => {
                tracing::debug!("WebSocket read failed on {}: {:?}", session.connection_id, e);
                return CloseReason::TransportError;
            }
            Ok(Some(Ok(message))) => message,
        };

        let text = match &message {
            Message::Text(text) => Some(text.as_str()),
            Message::Binary(bytes) => std::str::from_utf8(bytes).ok(),
            Message::Pong(_) => {
                deadline = Instant::now() + config.pong_wait;
                continue;
            }
            // Pings are answered by the transport
            Message::Ping(_) => continue,
            Message::Close(_) => return CloseReason::PeerClosed,
        };

        let payload_len = match &message {
            Message::Text(text) => text.as_str().len(),
            Message::Binary(bytes) => bytes.len(),
            _ => 0,
        };
        if payload_len > config.max_message_bytes {
            tracing::warn!(
                "Connection {} sent a {} byte frame, limit is {}",
                session.connection_id,
                payload_len,
                config.max_message_bytes
            );
            return CloseReason::OversizeFrame;
        }

        let outcome = match text {
            Some(text) => match ClientEvent::decode(text) {
                Ok(event) => dispatch(&session, event).await,
                Err(e) => Err(e),
            },
            None => Err(SharedError::protocol("binary frame is not UTF-8")),
        };

        match outcome {
            Ok(()) => malformed.reset(),
            Err(e) => {
                tracing::warn!(
                    "Ignoring frame from connection {}: {}",
                    session.connection_id,
                    e
                );
                if malformed.strike() {
                    return CloseReason::MalformedFrames;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_counter_trips_after_limit() {
        let mut counter = MalformedCounter::new(2);
        assert!(!counter.strike());
        assert!(!counter.strike());
        assert!(counter.strike());
    }

    #[test]
    fn test_malformed_counter_resets() {
        let mut counter = MalformedCounter::new(1);
        assert!(!counter.strike());
        counter.reset();
        assert!(!counter.strike());
        assert!(counter.strike());
    }

    #[test]
    fn test_connection_walks_lifecycle() {
        let mut connection = Connection {
            id: uuid::Uuid::new_v4(),
            user_id: 1,
            state: ConnectionState::Connecting,
        };
        for next in [
            ConnectionState::Active,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            connection.transition(next);
            assert_eq!(connection.state, next);
        }
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::IdleTimeout.to_string(), "idle timeout");
        assert_eq!(CloseReason::QueueClosed.to_string(), "outbound queue closed");
    }
}
