//! The Server Endpoint: one listening TCP port carrying two logical
//! channels distinguished by request path — `/ws` for the peer protocol and
//! `/console` for the administrative channel — plus port autoprobing and
//! the per-session sender table that backs
//! [`crate::application::coordinator::Broadcast`].
//!
//! Each accepted connection gets its own Tokio task: the accept loop never
//! blocks on a single session, and a session's own read/write tasks race
//! each other with `tokio::select!` so the connection tears down the moment
//! either direction fails.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{Callback, ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, trace, warn};

use konflikt_core::domain::layout::InstanceId;
use konflikt_core::protocol::codec::{decode_console_message, decode_message, encode_console_message, encode_message};
use konflikt_core::protocol::envelope::{now_epoch_millis, Envelope};
use konflikt_core::protocol::messages::{ConsoleMessage, Message};
use konflikt_core::protocol::session::HANDSHAKE_TIMEOUT;

use crate::application::console::ConsoleOutcome;
use crate::application::coordinator::Broadcast;
use crate::application::coordinator_loop::CoordinatorCommand;

#[derive(Debug, Error)]
pub enum ServerEndpointError {
    #[error("no free port found starting at {start}")]
    NoFreePort { start: u16 },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Binds the listening socket. If `preferred_port` is given, binds exactly
/// that port and fails on `address in use`; otherwise starts at 3000 and
/// increments to the first free port &le; 65535.
pub async fn bind_with_autoprobe(
    bind_addr: IpAddr,
    preferred_port: Option<u16>,
) -> Result<TcpListener, ServerEndpointError> {
    if let Some(port) = preferred_port {
        let addr = SocketAddr::new(bind_addr, port);
        return TcpListener::bind(addr).await.map_err(|source| ServerEndpointError::Bind { addr, source });
    }

    let mut port: u16 = 3000;
    loop {
        let addr = SocketAddr::new(bind_addr, port);
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(_) if port < 65535 => port += 1,
            Err(_) => return Err(ServerEndpointError::NoFreePort { start: 3000 }),
        }
    }
}

/// The table backing outbound delivery: one unbounded sender per `Ready`
/// peer session, keyed by the instance id it identified itself with during
/// handshake. Mutated only by the session task that owns that instance id
/// (insert on successful handshake, remove on teardown) — plumbing, not
/// domain state; the single-owner rule is about `ServerCoordinator`,
/// not this routing table.
pub type SessionTable = Arc<Mutex<HashMap<InstanceId, mpsc::UnboundedSender<Message>>>>;

pub fn new_session_table() -> SessionTable {
    Arc::new(Mutex::new(HashMap::new()))
}

/// [`Broadcast`] implementation over a [`SessionTable`].
pub struct EndpointBroadcast {
    sessions: SessionTable,
}

impl EndpointBroadcast {
    pub fn new(sessions: SessionTable) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Broadcast for EndpointBroadcast {
    async fn broadcast(&self, message: Message) {
        let senders: Vec<_> = self.sessions.lock().expect("lock poisoned").values().cloned().collect();
        for sender in senders {
            let _ = sender.send(message.clone());
        }
    }

    async fn send_to(&self, instance_id: &str, message: Message) {
        let sender = self.sessions.lock().expect("lock poisoned").get(instance_id).cloned();
        if let Some(sender) = sender {
            let _ = sender.send(message);
        } else {
            debug!(%instance_id, "send_to target has no live session, dropping");
        }
    }
}

/// Callback that records the HTTP upgrade request's path so the accept loop
/// can route the resulting WebSocket stream to the `/ws` or `/console`
/// handler.
struct RecordPath(Arc<Mutex<String>>);

impl Callback for RecordPath {
    fn on_request(self, request: &Request, response: Response) -> Result<Response, ErrorResponse> {
        *self.0.lock().expect("lock poisoned") = request.uri().path().to_string();
        Ok(response)
    }
}

/// Runs the accept loop until `running` is cleared. A short accept timeout
/// lets the loop periodically recheck the shutdown flag instead of blocking
/// forever in `accept()`.
pub async fn run(
    listener: TcpListener,
    commands: mpsc::Sender<CoordinatorCommand>,
    sessions: SessionTable,
    my_instance_id: InstanceId,
    my_instance_name: String,
    my_git_commit: String,
    log_tx: tokio::sync::broadcast::Sender<ConsoleMessage>,
    running: Arc<AtomicBool>,
) {
    info!(addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(), "server endpoint listening");

    loop {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        let accepted = timeout(Duration::from_millis(200), listener.accept()).await;
        match accepted {
            Ok(Ok((stream, peer_addr))) => {
                let commands = commands.clone();
                let sessions = sessions.clone();
                let my_instance_id = my_instance_id.clone();
                let my_instance_name = my_instance_name.clone();
                let my_git_commit = my_git_commit.clone();
                let log_tx = log_tx.clone();
                tokio::spawn(async move {
                    accept_one(
                        stream,
                        peer_addr,
                        commands,
                        sessions,
                        my_instance_id,
                        my_instance_name,
                        my_git_commit,
                        log_tx,
                    )
                    .await;
                });
            }
            Ok(Err(e)) => warn!(error = %e, "accept error"),
            Err(_) => {} // timed out, loop back to recheck `running`
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn accept_one(
    stream: TcpStream,
    peer_addr: SocketAddr,
    commands: mpsc::Sender<CoordinatorCommand>,
    sessions: SessionTable,
    my_instance_id: InstanceId,
    my_instance_name: String,
    my_git_commit: String,
    log_tx: tokio::sync::broadcast::Sender<ConsoleMessage>,
) {
    let path_holder = Arc::new(Mutex::new(String::new()));
    let callback = RecordPath(path_holder.clone());
    let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer_addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    let path = path_holder.lock().expect("lock poisoned").clone();

    match path.as_str() {
        "/ws" => {
            run_peer_session(ws_stream, peer_addr, commands, sessions, my_instance_id, my_instance_name, my_git_commit)
                .await
        }
        "/console" => run_console_session(ws_stream, peer_addr, commands, log_tx.subscribe()).await,
        other => {
            warn!(%peer_addr, path = %other, "unknown upgrade path, closing");
        }
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

async fn run_peer_session(
    ws_stream: WsStream,
    peer_addr: SocketAddr,
    commands: mpsc::Sender<CoordinatorCommand>,
    sessions: SessionTable,
    my_instance_id: InstanceId,
    my_instance_name: String,
    my_git_commit: String,
) {
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let frame = match encode_message(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "failed to encode outbound message");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let Some(instance_id) =
        handshake(&mut ws_rx, &outbound_tx, &my_instance_id, &my_instance_name, &my_git_commit).await
    else {
        writer.abort();
        return;
    };

    sessions.lock().expect("lock poisoned").insert(instance_id.clone(), outbound_tx.clone());
    info!(%peer_addr, %instance_id, "peer session ready");

    loop {
        match ws_rx.next().await {
            Some(Ok(WsMessage::Text(frame))) => {
                handle_peer_frame(&frame, &instance_id, &commands, &outbound_tx).await;
            }
            Some(Ok(WsMessage::Close(_))) | None => break,
            Some(Ok(WsMessage::Binary(_))) => {
                warn!(%instance_id, "unexpected binary frame on /ws, closing session");
                break;
            }
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
            Some(Err(e)) => {
                warn!(%instance_id, error = %e, "peer session error");
                break;
            }
        }
    }

    sessions.lock().expect("lock poisoned").remove(&instance_id);
    let _ = commands.send(CoordinatorCommand::ClientDisconnected { instance_id }).await;
    writer.abort();
}

/// Waits up to [`HANDSHAKE_TIMEOUT`] for the peer's `handshake_request`,
/// replies with an accepting `handshake_response`, and — on a `gitCommit`
/// mismatch — follows it with `update_required`. Returns the
/// peer's instance id on success.
async fn handshake(
    ws_rx: &mut futures_util::stream::SplitStream<WsStream>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    my_instance_id: &str,
    my_instance_name: &str,
    my_git_commit: &str,
) -> Option<InstanceId> {
    let first = timeout(HANDSHAKE_TIMEOUT, ws_rx.next()).await;
    let frame = match first {
        Ok(Some(Ok(WsMessage::Text(frame)))) => frame,
        Ok(Some(Ok(_))) => {
            warn!("expected a text handshake frame");
            return None;
        }
        Ok(Some(Err(e))) => {
            warn!(error = %e, "transport error awaiting handshake");
            return None;
        }
        Ok(None) => {
            warn!("connection closed before handshake");
            return None;
        }
        Err(_) => {
            warn!("handshake timed out");
            return None;
        }
    };

    let message = match decode_message(&frame) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "failed to decode handshake frame");
            return None;
        }
    };

    let Message::HandshakeRequest { instance_id, instance_name, version, capabilities, git_commit, .. } = message
    else {
        warn!("first frame on /ws was not a handshake_request");
        return None;
    };

    let response = Message::HandshakeResponse {
        envelope: Envelope::new(my_instance_id.to_string()),
        accepted: true,
        instance_id: my_instance_id.to_string(),
        instance_name: my_instance_name.to_string(),
        version,
        capabilities,
        reason: None,
        git_commit: Some(my_git_commit.to_string()),
    };
    let _ = outbound_tx.send(response);

    if let Some(ref their_commit) = git_commit {
        if their_commit != my_git_commit {
            info!(%instance_id, their_commit, my_git_commit, "version skew detected, requesting update");
            let _ = outbound_tx.send(Message::UpdateRequired {
                server_commit: my_git_commit.to_string(),
                client_commit: their_commit.clone(),
                timestamp: now_epoch_millis(),
            });
        }
    }

    info!(%instance_id, %instance_name, "handshake accepted");
    Some(instance_id)
}

async fn handle_peer_frame(
    frame: &str,
    instance_id: &str,
    commands: &mpsc::Sender<CoordinatorCommand>,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) {
    let message = match decode_message(frame) {
        Ok(message) => message,
        Err(e) => {
            let _ = outbound_tx.send(Message::Error {
                envelope: Envelope::new(instance_id.to_string()),
                code: e.error_code(),
                message: e.to_string(),
                details: None,
            });
            return;
        }
    };

    match message {
        Message::ClientRegistration { instance_id: reg_id, display_name, machine_id, screen_width, screen_height } => {
            let _ = commands
                .send(CoordinatorCommand::ClientRegistration {
                    instance_id: reg_id,
                    display_name,
                    machine_id,
                    screen_width,
                    screen_height,
                })
                .await;
        }
        Message::DeactivationRequest { instance_id: req_id, .. } => {
            let _ = commands.send(CoordinatorCommand::DeactivationRequest { instance_id: req_id }).await;
        }
        Message::Heartbeat { .. } => {
            trace!(%instance_id, "heartbeat");
            let _ = outbound_tx.send(Message::Heartbeat { envelope: Envelope::new(instance_id.to_string()) });
        }
        Message::Disconnect { reason, .. } => {
            debug!(%instance_id, ?reason, "peer requested disconnect");
        }
        Message::RestartRequest { reason, .. } => {
            info!(%instance_id, %reason, "client signalled a server restart, exiting with code 43");
            std::process::exit(43);
        }
        Message::Unknown => {
            warn!(%instance_id, "unknown message type, replying with error");
            let _ = outbound_tx.send(Message::Error {
                envelope: Envelope::new(instance_id.to_string()),
                code: konflikt_core::protocol::messages::ErrorCode::UnknownMessageType,
                message: "unrecognized message type".to_string(),
                details: None,
            });
        }
        other => {
            warn!(%instance_id, message_type = other.type_name(), "unexpected message type on /ws, ignoring");
        }
    }
}

/// Runs one `/console` session: decodes `console_command` frames, routes
/// them to the coordinator loop via a `oneshot` reply channel, and encodes
/// the resulting outcome back onto the wire.
async fn run_console_session(ws_stream: WsStream, peer_addr: SocketAddr, commands: mpsc::Sender<CoordinatorCommand>) {
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    info!(%peer_addr, "console session opened");

    while let Some(frame) = ws_rx.next().await {
        let frame = match frame {
            Ok(WsMessage::Text(frame)) => frame,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(%peer_addr, error = %e, "console session error");
                break;
            }
        };

        let console_message = match decode_console_message(&frame) {
            Ok(message) => message,
            Err(e) => {
                let _ = send_console(&mut ws_tx, &ConsoleMessage::ConsoleError { error: e.to_string() }).await;
                continue;
            }
        };

        let ConsoleMessage::ConsoleCommand { command, args, timestamp } = console_message else {
            let _ = send_console(&mut ws_tx, &ConsoleMessage::ConsoleError { error: "expected a console_command".into() })
                .await;
            continue;
        };

        if command == "ping" {
            let now = timestamp.unwrap_or_else(now_epoch_millis);
            let _ = send_console(&mut ws_tx, &ConsoleMessage::Pong { timestamp: now }).await;
            continue;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = commands
            .send(CoordinatorCommand::ConsoleCommand {
                command,
                args,
                now: timestamp.unwrap_or_else(now_epoch_millis),
                reply: reply_tx,
            })
            .await;
        if sent.is_err() {
            break; // coordinator loop has already shut down
        }

        let Ok(outcome) = reply_rx.await else { break };
        let reply = match outcome {
            ConsoleOutcome::Response(output) => ConsoleMessage::ConsoleResponse { output },
            ConsoleOutcome::Error(error) => ConsoleMessage::ConsoleError { error },
            ConsoleOutcome::Pong(timestamp) => ConsoleMessage::Pong { timestamp },
            ConsoleOutcome::Quit(output) => {
                let _ = send_console(&mut ws_tx, &ConsoleMessage::ConsoleResponse { output }).await;
                break;
            }
        };
        if send_console(&mut ws_tx, &reply).await.is_err() {
            break;
        }
    }

    info!(%peer_addr, "console session closed");
}

async fn send_console(
    ws_tx: &mut futures_util::stream::SplitSink<WsStream, WsMessage>,
    message: &ConsoleMessage,
) -> Result<(), ()> {
    let frame = encode_console_message(message).map_err(|_| ())?;
    ws_tx.send(WsMessage::Text(frame)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn autoprobe_finds_a_free_port_when_none_is_preferred() {
        let listener = bind_with_autoprobe("127.0.0.1".parse().unwrap(), None).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.port() >= 3000);
    }

    #[tokio::test]
    async fn preferred_port_is_honored_when_free() {
        let listener = bind_with_autoprobe("127.0.0.1".parse().unwrap(), Some(0)).await.unwrap();
        assert!(listener.local_addr().is_ok());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_session() {
        let sessions = new_session_table();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        sessions.lock().unwrap().insert("a".to_string(), tx_a);
        sessions.lock().unwrap().insert("b".to_string(), tx_b);

        let broadcast = EndpointBroadcast::new(sessions);
        broadcast.broadcast(Message::Heartbeat { envelope: Envelope::new("srv".into()) }).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn send_to_reaches_only_the_named_session() {
        let sessions = new_session_table();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        sessions.lock().unwrap().insert("a".to_string(), tx_a);
        sessions.lock().unwrap().insert("b".to_string(), tx_b);

        let broadcast = EndpointBroadcast::new(sessions);
        broadcast.send_to("a", Message::Heartbeat { envelope: Envelope::new("srv".into()) }).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_an_unknown_instance_is_a_silent_no_op() {
        let sessions = new_session_table();
        let broadcast = EndpointBroadcast::new(sessions);
        broadcast.send_to("ghost", Message::Heartbeat { envelope: Envelope::new("srv".into()) }).await;
    }
}
