use crate::config::WsConfig;
use crate::registry::{ConnectionRegistry, Payload, Subscription};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant, MissedTickBehavior};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
}

/// Why a session ended without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ClientClosed,
    Evicted,
    /// Nothing received, pongs included, within the idle timeout.
    Unresponsive,
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state.registry, state.ws))
}

/// Drive one subscriber from handshake to removal.
pub async fn run_session(socket: WebSocket, registry: Arc<ConnectionRegistry>, config: WsConfig) {
    let Subscription { id, outbound } = registry.register();
    let (mut sink, mut stream) = socket.split();

    let outcome = drive(&mut sink, &mut stream, outbound, &config).await;

    registry.unregister(id);

    match outcome {
        Ok(SessionEnd::ClientClosed) => tracing::debug!(connection_id = %id, "Subscriber closed connection"),
        Ok(end) => {
            tracing::debug!(connection_id = %id, reason = ?end, "Dropping subscriber, closing socket");
            let _ = timeout(config.write_timeout, sink.close()).await;
        }
        Err(e) => tracing::debug!(connection_id = %id, error = %e, "Subscriber session failed"),
    }
}

/// Session loop over any message sink and stream.
///
/// Queued payloads go out as text frames, each write bounded by
/// `write_timeout`. Inbound frames carry no meaning; they only prove the
/// peer is alive. Every `ping_interval` a ping is sent, and the session ends
/// once nothing has arrived for `idle_timeout`.
pub async fn drive<S, R>(
    sink: &mut S,
    stream: &mut R,
    mut outbound: mpsc::Receiver<Payload>,
    config: &WsConfig,
) -> Result<SessionEnd, SessionError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut keepalive = tokio::time::interval(config.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately.
    keepalive.tick().await;

    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(payload) => send_frame(sink, Message::Text(payload.to_string().into()), config.write_timeout).await?,
                None => return Ok(SessionEnd::Evicted),
            },
            frame = stream.next() => match frame {
                None | Some(Ok(Message::Close(_))) => return Ok(SessionEnd::ClientClosed),
                Some(Ok(_)) => last_seen = Instant::now(),
                Some(Err(e)) => return Err(e.into()),
            },
            _ = keepalive.tick() => {
                if last_seen.elapsed() >= config.idle_timeout {
                    return Ok(SessionEnd::Unresponsive);
                }
                send_frame(sink, Message::Ping(Bytes::new()), config.write_timeout).await?;
            }
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: Message, limit: Duration) -> Result<(), SessionError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    timeout(limit, sink.send(frame))
        .await
        .map_err(|_| SessionError::WriteTimeout(limit))??;
    Ok(())
}
