//! Drives the single-task owner of the [`ServerCoordinator`], receiving
//! every network- and input-sourced event through one channel so all state
//! mutation happens from one place, per the concurrency model: "all
//! mutation of `CoordinatorState`... happens on that loop... native capture
//! threads marshal into the loop" via `tokio::sync::mpsc`, never through a
//! shared `Mutex`-guarded `ServerCoordinator`.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use konflikt_core::domain::layout::{InstanceId, LayoutFile};
use konflikt_core::protocol::envelope::EpochMillis;
use konflikt_core::protocol::messages::InputEventType;

use crate::application::console::{handle_console_command, ConsoleOutcome, ServerStatus};
use crate::application::coordinator::ServerCoordinator;

/// Persists a [`LayoutFile`] snapshot after a mutation, per the Layout
/// Manager's "write after every persistent mutation" contract. Implemented
/// by an infrastructure adapter over the platform config directory; kept as
/// a trait here so the application layer never imports infrastructure
/// directly, mirroring [`crate::application::coordinator::Broadcast`].
pub trait LayoutPersistence: Send + Sync {
    fn save(&self, file: &LayoutFile);
}

/// One event destined for the coordinator loop. Everything that can change
/// [`ServerCoordinator`] state — a parsed peer message, a local input event,
/// a lost connection, or a console command — arrives as one of these.
pub enum CoordinatorCommand {
    ClientRegistration {
        instance_id: InstanceId,
        display_name: String,
        machine_id: String,
        screen_width: u32,
        screen_height: u32,
    },
    DeactivationRequest {
        instance_id: InstanceId,
    },
    ClientDisconnected {
        instance_id: InstanceId,
    },
    LocalMouseMove {
        x: i32,
        y: i32,
        modifiers: u32,
        buttons: u32,
    },
    LocalInput {
        event_type: InputEventType,
        modifiers: u32,
        buttons: u32,
        keycode: Option<u16>,
        text: Option<String>,
        button: Option<String>,
    },
    ConsoleCommand {
        command: String,
        args: Vec<String>,
        now: EpochMillis,
        reply: oneshot::Sender<ConsoleOutcome>,
    },
    Shutdown,
}

/// The identity/runtime fields `status` needs that do not live on
/// [`ServerCoordinator`] itself (it has no notion of uptime or listener
/// configuration).
pub struct StatusContext {
    pub instance_id: String,
    pub instance_name: String,
    pub version: String,
    pub started_at: Instant,
    pub discovery_enabled: bool,
    pub bind_addr: String,
    pub port: u16,
    /// Where [`CoordinatorCommand::ClientRegistration`] and
    /// `ClientDisconnected` persist the layout after mutating it.
    pub persistence: Arc<dyn LayoutPersistence>,
}

impl StatusContext {
    fn snapshot(&self, connection_count: usize) -> ServerStatus {
        ServerStatus {
            instance_id: self.instance_id.clone(),
            instance_name: self.instance_name.clone(),
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            connection_count,
            discovery_enabled: self.discovery_enabled,
            bind_addr: self.bind_addr.clone(),
            port: self.port,
        }
    }
}

/// Owns `coordinator` exclusively for the lifetime of the loop; returns once
/// a `Shutdown` command arrives, the channel closes, or a `quit` console
/// command is accepted.
pub async fn run(
    mut coordinator: ServerCoordinator,
    mut commands: mpsc::Receiver<CoordinatorCommand>,
    status: StatusContext,
) {
    while let Some(command) = commands.recv().await {
        match command {
            CoordinatorCommand::ClientRegistration {
                instance_id,
                display_name,
                machine_id,
                screen_width,
                screen_height,
            } => {
                tracing::info!(%instance_id, %display_name, "client registered");
                coordinator
                    .handle_client_registration(instance_id, display_name, machine_id, screen_width, screen_height)
                    .await;
                status.persistence.save(&coordinator.layout().to_file());
            }
            CoordinatorCommand::DeactivationRequest { instance_id } => {
                coordinator.handle_deactivation_request(&instance_id, Instant::now()).await;
            }
            CoordinatorCommand::ClientDisconnected { instance_id } => {
                tracing::info!(%instance_id, "client disconnected");
                coordinator.handle_client_disconnect(&instance_id).await;
                status.persistence.save(&coordinator.layout().to_file());
            }
            CoordinatorCommand::LocalMouseMove { x, y, modifiers, buttons } => {
                if let Err(e) = coordinator.handle_local_mouse_move(x, y, modifiers, buttons).await {
                    tracing::warn!(error = %e, "dropping local mouse move: server screen not yet installed");
                }
            }
            CoordinatorCommand::LocalInput { event_type, modifiers, buttons, keycode, text, button } => {
                coordinator.handle_local_input(event_type, modifiers, buttons, keycode, text, button).await;
            }
            CoordinatorCommand::ConsoleCommand { command, args, now, reply } => {
                let connection_count = coordinator.layout().screens().iter().filter(|s| !s.is_server).count();
                let outcome =
                    handle_console_command(&command, &args, &status.snapshot(connection_count), coordinator.layout(), now);
                let shutting_down = matches!(outcome, ConsoleOutcome::Quit(_));
                let _ = reply.send(outcome);
                if shutting_down {
                    tracing::info!("quit accepted over the console channel, stopping coordinator loop");
                    break;
                }
            }
            CoordinatorCommand::Shutdown => break,
        }
    }
}
