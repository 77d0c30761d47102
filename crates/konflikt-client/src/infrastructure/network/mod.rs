//! The peer connection to the coordinator: one `/ws` WebSocket carrying the
//! `handshake_request`/`handshake_response` exchange, `client_registration`,
//! and the steady-state traffic of `layout_assignment`/`activate_client`/
//! `input_event` inbound and `heartbeat`/`deactivation_request` outbound.
//!
//! One task runs the connect/handshake/serve/reconnect loop and drives the
//! injected [`ClientCoordinator`] directly, so there is never a second task
//! racing it for access to activation state.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use konflikt_core::domain::layout::InstanceId;
use konflikt_core::protocol::codec::{decode_message, encode_message};
use konflikt_core::protocol::envelope::{now_epoch_millis, Envelope};
use konflikt_core::protocol::messages::Message;
use konflikt_core::protocol::session::{
    reconnect_backoff, SessionState, HANDSHAKE_TIMEOUT, HEARTBEAT_INTERVAL,
};

use crate::application::coordinator::ClientCoordinator;
use crate::application::report_screens::ScreenEnumerator;

pub mod discovery;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed before the handshake completed")]
    HandshakeIncomplete,
    #[error("handshake timed out")]
    HandshakeTimedOut,
    #[error("coordinator rejected the handshake: {0}")]
    Rejected(String),
}

/// Static identity this client presents during handshake and registration.
pub struct ClientIdentity {
    pub instance_id: InstanceId,
    pub instance_name: String,
    pub machine_id: String,
    pub version: String,
    pub git_commit: String,
    pub capabilities: Vec<String>,
}

/// What happened when a connection attempt ended, so the caller's reconnect
/// loop knows whether to back off or stop entirely.
enum SessionOutcome {
    /// The transport dropped or the coordinator sent `disconnect`; reconnect
    /// with backoff.
    Disconnected,
    /// `running` was cleared; tear down and return.
    ShuttingDown,
}

/// What to do with one decoded inbound message.
enum Dispatch {
    /// Nothing to send back.
    None,
    /// Send this message in reply.
    Reply(Message),
    /// Send this message, then exit the process with this code — used for
    /// `update_required`, where a stale client has no correct way to keep
    /// running.
    SendThenExit(Message, i32),
}

/// Runs the connect/handshake/serve loop against `server_addr` until
/// `running` is cleared, reconnecting with [`reconnect_backoff`] between
/// attempts.
pub async fn run(
    server_addr: SocketAddr,
    identity: ClientIdentity,
    screens: Arc<dyn ScreenEnumerator>,
    mut coordinator: ClientCoordinator,
    running: Arc<AtomicBool>,
) {
    let url = format!("ws://{server_addr}/ws");
    let mut attempt: u32 = 0;

    while running.load(Ordering::Relaxed) {
        info!(%url, attempt, "connecting to coordinator");
        match connect_and_serve(&url, &identity, screens.as_ref(), &mut coordinator, &running).await {
            Ok(SessionOutcome::ShuttingDown) => break,
            Ok(SessionOutcome::Disconnected) => {
                let delay = reconnect_backoff(attempt);
                attempt = attempt.saturating_add(1);
                info!(delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(error = %e, "session ended with an error");
                let delay = reconnect_backoff(attempt);
                attempt = attempt.saturating_add(1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn connect_and_serve(
    url: &str,
    identity: &ClientIdentity,
    screens: &dyn ScreenEnumerator,
    coordinator: &mut ClientCoordinator,
    running: &Arc<AtomicBool>,
) -> Result<SessionOutcome, NetworkError> {
    let (mut ws, _response) = tokio_tungstenite::connect_async(url).await?;
    let mut session = konflikt_core::protocol::session::PeerSession::new();
    session.transition(SessionState::Open).expect("Connecting -> Open always succeeds");

    let screen_geometry = screens.enumerate_screen().ok();

    let handshake_request = Message::HandshakeRequest {
        envelope: Envelope::new(identity.instance_id.clone()),
        instance_id: identity.instance_id.clone(),
        instance_name: identity.instance_name.clone(),
        version: identity.version.clone(),
        capabilities: identity.capabilities.clone(),
        screen_geometry,
        git_commit: Some(identity.git_commit.clone()),
    };
    send(&mut ws, &handshake_request).await?;
    session.transition(SessionState::HandshakeSent).expect("Open -> HandshakeSent always succeeds");

    let accepted = match tokio::time::timeout(HANDSHAKE_TIMEOUT, ws.next()).await {
        Ok(Some(Ok(WsMessage::Text(frame)))) => frame,
        Ok(Some(Ok(_))) | Ok(None) => return Err(NetworkError::HandshakeIncomplete),
        Ok(Some(Err(e))) => return Err(e.into()),
        Err(_) => return Err(NetworkError::HandshakeTimedOut),
    };
    match decode_message(&accepted) {
        Ok(Message::HandshakeResponse { accepted: true, .. }) => {}
        Ok(Message::HandshakeResponse { accepted: false, reason, .. }) => {
            return Err(NetworkError::Rejected(reason.unwrap_or_default()))
        }
        Ok(other) => {
            warn!(message_type = other.type_name(), "expected handshake_response, got something else");
            return Err(NetworkError::HandshakeIncomplete);
        }
        Err(e) => {
            warn!(error = %e, "failed to decode handshake_response");
            return Err(NetworkError::HandshakeIncomplete);
        }
    }
    session.transition(SessionState::Ready).expect("HandshakeSent -> Ready always succeeds");
    info!("handshake accepted, registering with the coordinator");

    let geometry = screens.enumerate_screen().map_err(|e| {
        warn!(error = %e, "failed to read screen geometry for registration");
        NetworkError::HandshakeIncomplete
    })?;
    send(
        &mut ws,
        &Message::ClientRegistration {
            instance_id: identity.instance_id.clone(),
            display_name: identity.instance_name.clone(),
            machine_id: identity.machine_id.clone(),
            screen_width: geometry.width,
            screen_height: geometry.height,
        },
    )
    .await?;

    let mut last_heartbeat = Instant::now();
    loop {
        if !running.load(Ordering::Relaxed) {
            let _ = send(
                &mut ws,
                &Message::Disconnect {
                    envelope: Envelope::new(identity.instance_id.clone()),
                    reason: Some("shutting down".to_string()),
                },
            )
            .await;
            return Ok(SessionOutcome::ShuttingDown);
        }

        if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            send(&mut ws, &Message::Heartbeat { envelope: Envelope::new(identity.instance_id.clone()) }).await?;
            last_heartbeat = Instant::now();
        }

        let next = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
        let frame = match next {
            Ok(Some(Ok(WsMessage::Text(frame)))) => frame,
            Ok(Some(Ok(WsMessage::Close(_)))) | Ok(None) => return Ok(SessionOutcome::Disconnected),
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(e))) => {
                warn!(error = %e, "transport error, reconnecting");
                return Ok(SessionOutcome::Disconnected);
            }
            Err(_) => continue, // poll timed out, re-check `running`/heartbeat
        };

        let message = match decode_message(&frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "failed to decode inbound frame, ignoring");
                continue;
            }
        };

        match dispatch(coordinator, message, &identity.instance_id) {
            Dispatch::None => {}
            Dispatch::Reply(reply) => send(&mut ws, &reply).await?,
            Dispatch::SendThenExit(reply, code) => {
                let _ = send(&mut ws, &reply).await;
                std::process::exit(code);
            }
        }
    }
}

/// Routes one decoded inbound [`Message`] to the coordinator and decides
/// what, if anything, to send back.
fn dispatch(coordinator: &mut ClientCoordinator, message: Message, my_instance_id: &InstanceId) -> Dispatch {
    match message {
        Message::Heartbeat { .. } => {
            debug!("heartbeat");
            Dispatch::Reply(Message::Heartbeat { envelope: Envelope::new(my_instance_id.clone()) })
        }
        Message::LayoutAssignment { position, full_layout, .. } => {
            debug!(x = position.x, y = position.y, screens = full_layout.len(), "received layout assignment");
            Dispatch::None
        }
        Message::LayoutUpdate { screens, .. } => {
            debug!(screens = screens.len(), "received layout update");
            Dispatch::None
        }
        Message::ActivateClient { target_instance_id, cursor_x, cursor_y, .. } => {
            if coordinator.handle_activate_client(&target_instance_id, cursor_x, cursor_y) {
                info!("activated as the input-forwarding target");
            }
            Dispatch::None
        }
        Message::InputEvent { source_instance_id, event_type, event_data, .. } => {
            match coordinator.handle_input_event(&source_instance_id, event_type, &event_data) {
                Some(reply) => Dispatch::Reply(reply),
                None => Dispatch::None,
            }
        }
        Message::UpdateRequired { server_commit, client_commit, .. } => {
            warn!(server_commit, client_commit, "coordinator reports a version mismatch, restarting");
            let restart_request = Message::RestartRequest {
                reason: "version mismatch".to_string(),
                client_commit,
                server_commit,
                timestamp: now_epoch_millis(),
            };
            Dispatch::SendThenExit(restart_request, 42)
        }
        Message::Disconnect { reason, .. } => {
            info!(?reason, "coordinator closed the session");
            Dispatch::None
        }
        Message::Error { code, message, .. } => {
            warn!(?code, %message, "coordinator sent an error");
            Dispatch::None
        }
        Message::Unknown => {
            warn!("received an unrecognized message type");
            Dispatch::None
        }
        other => {
            warn!(message_type = other.type_name(), "unexpected message type on /ws, ignoring");
            Dispatch::None
        }
    }
}

async fn send(ws: &mut WsStream, message: &Message) -> Result<(), NetworkError> {
    let frame = encode_message(message).unwrap_or_default();
    ws.send(WsMessage::Text(frame)).await?;
    Ok(())
}
