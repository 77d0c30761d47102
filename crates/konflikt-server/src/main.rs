//! Konflikt coordinator entry point.
//!
//! Wires the pure [`ServerCoordinator`] state machine to its infrastructure
//! collaborators and starts the Tokio async runtime.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  ├─ load layout + instance id from disk
//!  ├─ bind the Server Endpoint (autoprobed TCP port)
//!  ├─ spawn coordinator_loop::run   -- the single-task state-machine owner
//!  ├─ spawn server_endpoint::run    -- accepts /ws and /console sessions
//!  ├─ spawn the local input capture pump
//!  └─ spawn mDNS advertise + collision resolution
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use konflikt_core::discovery::ServiceDirectory;
use konflikt_core::domain::instance::machine_id;
use konflikt_core::protocol::envelope::now_epoch_millis;
use konflikt_core::protocol::messages::{InputEventType, keyboard_modifiers, mouse_buttons};
use konflikt_core::LayoutManager;

use konflikt_server::application::coordinator::ServerCoordinator;
use konflikt_server::application::coordinator_loop::{self, CoordinatorCommand, StatusContext};
use konflikt_server::infrastructure::input_capture::mock::MockInputSource;
use konflikt_server::infrastructure::input_capture::platform_io;
use konflikt_server::infrastructure::input_capture::vk_map::vk_to_hid;
use konflikt_server::infrastructure::input_capture::{InputSource, MouseButton as CapturedMouseButton, RawInputEvent};
use konflikt_server::infrastructure::network::discovery::{advertise_and_resolve_collisions, OwnAdvertisement};
use konflikt_server::infrastructure::network::server_endpoint::{
    self, bind_with_autoprobe, new_session_table, EndpointBroadcast,
};
use konflikt_server::infrastructure::{logging, storage::config};

#[cfg(target_os = "windows")]
use konflikt_server::infrastructure::input_capture::windows::WindowsInputCaptureService;
#[cfg(target_os = "windows")]
use konflikt_server::infrastructure::input_capture::platform_io::WindowsPlatformIo;

// ── CLI ────────────────────────────────────────────────────────────────────

/// Konflikt coordinator: the process every client connects to.
///
/// Owns the virtual layout, decides where the cursor belongs, and relays
/// forwarded input to whichever client currently has it.
#[derive(Debug, Parser)]
#[command(name = "konflikt-server", about = "Konflikt coordinator process", version)]
struct Cli {
    /// IP address to bind the peer/console endpoint to. `0.0.0.0` accepts
    /// connections from any interface on the LAN.
    #[arg(long, default_value = "0.0.0.0", env = "KONFLIKT_BIND_ADDR")]
    bind_addr: IpAddr,

    /// TCP port to listen on. When omitted, autoprobes starting at 3000.
    #[arg(long, env = "KONFLIKT_PORT")]
    port: Option<u16>,

    /// Name shown to operators and advertised over mDNS. Defaults to the
    /// machine's hostname.
    #[arg(long, env = "KONFLIKT_INSTANCE_NAME")]
    instance_name: Option<String>,

    /// Log level filter (`error`, `warn`, `info`, `debug`, `trace`), or any
    /// `tracing_subscriber::EnvFilter` directive string.
    #[arg(long, env = "KONFLIKT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Overrides the platform-specific config directory used to persist the
    /// layout and instance id.
    #[arg(long, env = "KONFLIKT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Disables mDNS advertising and collision resolution. Useful for tests
    /// and constrained networks that block multicast.
    #[arg(long, env = "KONFLIKT_NO_DISCOVERY")]
    no_discovery: bool,
}

/// Best-effort hostname lookup via the platform's conventional environment
/// variable, falling back to a fixed name rather than failing startup.
fn local_hostname() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "konflikt-server".to_string())
}

fn local_username() -> String {
    std::env::var("USERNAME").or_else(|_| std::env::var("USER")).unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(target_os = "windows")]
const PLATFORM_NAME: &str = "windows";
#[cfg(target_os = "linux")]
const PLATFORM_NAME: &str = "linux";
#[cfg(target_os = "macos")]
const PLATFORM_NAME: &str = "macos";
#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
const PLATFORM_NAME: &str = "unknown";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_sender = logging::init(cli.log_level.as_deref());

    let runtime = tokio::runtime::Runtime::new().context("failed to start the Tokio runtime")?;
    let exit_code = runtime.block_on(run(cli, log_sender))?;
    std::process::exit(exit_code);
}

async fn run(cli: Cli, log_sender: tokio::sync::broadcast::Sender<konflikt_core::protocol::messages::ConsoleMessage>) -> anyhow::Result<i32> {
    let hostname = local_hostname();
    let instance_name = cli.instance_name.clone().unwrap_or_else(|| hostname.clone());
    let my_machine_id = machine_id(&hostname, &local_username(), PLATFORM_NAME);

    let config_dir = config::resolve_config_dir(cli.config_dir.clone())
        .context("could not resolve a platform configuration directory")?;
    let instance_id = config::load_or_create_instance_id(&config_dir);
    let layout_file = config::load_layout(&config_dir);

    let mut layout = LayoutManager::from_file(layout_file);
    let (screen_width, screen_height) = platform_io::screen_geometry();
    layout.set_server_screen(instance_id.clone(), instance_name.clone(), my_machine_id.clone(), screen_width, screen_height);

    info!(%instance_id, %instance_name, screen_width, screen_height, "starting konflikt-server");

    let listener = bind_with_autoprobe(cli.bind_addr, cli.port)
        .await
        .context("failed to bind the server endpoint")?;
    let bound_addr = listener.local_addr().context("bound listener has no local address")?;
    info!(%bound_addr, "server endpoint listening");

    let sessions = new_session_table();
    let broadcast: Arc<dyn konflikt_server::application::coordinator::Broadcast> =
        Arc::new(EndpointBroadcast::new(sessions.clone()));

    #[cfg(target_os = "windows")]
    let platform_io: Arc<dyn konflikt_server::application::coordinator::PlatformIo> = Arc::new(WindowsPlatformIo::new());
    #[cfg(not(target_os = "windows"))]
    let platform_io: Arc<dyn konflikt_server::application::coordinator::PlatformIo> =
        Arc::new(konflikt_server::infrastructure::input_capture::platform_io::NoopPlatformIo::new());

    let coordinator = ServerCoordinator::new(instance_id.clone(), my_machine_id, layout, broadcast, platform_io);

    let (command_tx, command_rx) = tokio::sync::mpsc::channel::<CoordinatorCommand>(256);
    let status = StatusContext {
        instance_id: instance_id.clone(),
        instance_name: instance_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: Instant::now(),
        discovery_enabled: !cli.no_discovery,
        bind_addr: cli.bind_addr.to_string(),
        port: bound_addr.port(),
        persistence: Arc::new(config::FileLayoutPersistence::new(config_dir.clone())),
    };

    let running = Arc::new(AtomicBool::new(true));

    let mut coordinator_handle = tokio::spawn(coordinator_loop::run(coordinator, command_rx, status));

    let endpoint_handle = {
        let commands = command_tx.clone();
        let sessions = sessions.clone();
        let instance_id = instance_id.clone();
        let instance_name = instance_name.clone();
        let running = running.clone();
        let log_sender = log_sender.clone();
        // A real release pipeline would stamp this via a build script; the
        // crate version stands in as the update-skew signal in its absence.
        let git_commit = env!("CARGO_PKG_VERSION").to_string();
        tokio::spawn(async move {
            server_endpoint::run(listener, commands, sessions, instance_id, instance_name, git_commit, log_sender, running).await
        })
    };

    let discovery_handle = if cli.no_discovery {
        None
    } else {
        match ServiceDirectory::new() {
            Ok(directory) => {
                let own = OwnAdvertisement {
                    host_ip: local_ip_for(cli.bind_addr),
                    port: bound_addr.port(),
                    started: now_epoch_millis(),
                    pid: std::process::id(),
                };
                let instance_name = instance_name.clone();
                let hostname = hostname.clone();
                let running = running.clone();
                Some(tokio::spawn(async move {
                    if let Err(e) = advertise_and_resolve_collisions(&directory, &instance_name, &hostname, own, running).await {
                        warn!(error = %e, "discovery loop exited with an error");
                    }
                    let _ = directory.shutdown();
                }))
            }
            Err(e) => {
                error!(error = %e, "failed to start mDNS discovery; continuing without it");
                None
            }
        }
    };

    let input_handle = spawn_input_capture(command_tx.clone(), running.clone());

    // Races the OS signal against the coordinator loop itself: a `quit`
    // accepted over `/console` ends `coordinator_loop::run` on its own, and
    // that must shut the whole process down exactly as a SIGINT/SIGTERM
    // would, not leave `main` waiting on a signal that will never arrive.
    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("shutdown signal received, stopping konflikt-server");
            running.store(false, Ordering::Relaxed);
            let _ = command_tx.send(CoordinatorCommand::Shutdown).await;
            let _ = coordinator_handle.await;
        }
        _ = &mut coordinator_handle => {
            info!("console quit accepted, stopping konflikt-server");
            running.store(false, Ordering::Relaxed);
        }
    }

    let _ = endpoint_handle.await;
    if let Some(handle) = discovery_handle {
        let _ = handle.await;
    }
    input_handle.stop();

    info!("konflikt-server stopped");
    Ok(0)
}

/// Picks the IP address to advertise over mDNS: the bind address itself
/// when it is already a concrete interface, or the local address selected
/// by routing a UDP "connection" to a public address when bound to
/// `0.0.0.0` (no packets are sent; this only asks the OS to pick a route).
fn local_ip_for(bind_addr: IpAddr) -> IpAddr {
    if !bind_addr.is_unspecified() {
        return bind_addr;
    }
    std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(bind_addr)
}

#[cfg(target_os = "windows")]
fn new_input_source() -> Box<dyn InputSource> {
    Box::new(WindowsInputCaptureService::new())
}

#[cfg(not(target_os = "windows"))]
fn new_input_source() -> Box<dyn InputSource> {
    warn!("no native input capture implementation for this platform; running with a stub input source");
    Box::new(MockInputSource::new())
}

/// Wraps `source` so its owner can call `stop()` after the async consumer
/// task has been told to drain and exit.
struct InputCaptureHandle {
    source: Box<dyn InputSource>,
}

impl InputCaptureHandle {
    fn stop(&self) {
        self.source.stop();
    }
}

/// Starts local input capture and spawns the task translating
/// [`RawInputEvent`]s into [`CoordinatorCommand`]s.
fn spawn_input_capture(commands: tokio::sync::mpsc::Sender<CoordinatorCommand>, running: Arc<AtomicBool>) -> InputCaptureHandle {
    let source = new_input_source();
    let events = match source.start() {
        Ok(rx) => rx,
        Err(e) => {
            error!(error = %e, "failed to start input capture; local input will not reach the coordinator");
            return InputCaptureHandle { source };
        }
    };

    std::thread::spawn(move || {
        let mut modifiers: u32 = 0;
        let mut buttons: u32 = 0;
        while running.load(Ordering::Relaxed) {
            let event = match events.recv_timeout(std::time::Duration::from_millis(200)) {
                Ok(event) => event,
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            };
            let Some(command) = translate_raw_event(event, &mut modifiers, &mut buttons) else { continue };
            if commands.blocking_send(command).is_err() {
                break;
            }
        }
    });

    InputCaptureHandle { source }
}

fn modifier_bit(vk: u8) -> Option<u32> {
    match vk {
        0xA0 | 0xA1 => Some(keyboard_modifiers::SHIFT),
        0xA2 | 0xA3 => Some(keyboard_modifiers::CTRL),
        0xA4 | 0xA5 => Some(keyboard_modifiers::ALT),
        0x5B | 0x5C => Some(keyboard_modifiers::META),
        _ => None,
    }
}

fn button_bit(button: CapturedMouseButton) -> Option<u32> {
    match button {
        CapturedMouseButton::Left => Some(mouse_buttons::LEFT),
        CapturedMouseButton::Right => Some(mouse_buttons::RIGHT),
        CapturedMouseButton::Middle => Some(mouse_buttons::MIDDLE),
        CapturedMouseButton::X1 | CapturedMouseButton::X2 => None,
    }
}

fn button_name(button: CapturedMouseButton) -> Option<&'static str> {
    match button {
        CapturedMouseButton::Left => Some("left"),
        CapturedMouseButton::Right => Some("right"),
        CapturedMouseButton::Middle => Some("middle"),
        CapturedMouseButton::X1 | CapturedMouseButton::X2 => None,
    }
}

/// Translates one captured OS event into a [`CoordinatorCommand`], tracking
/// the running modifier/button bitmasks across calls the way the wire
/// protocol expects them reported.
fn translate_raw_event(event: RawInputEvent, modifiers: &mut u32, buttons: &mut u32) -> Option<CoordinatorCommand> {
    match event {
        RawInputEvent::KeyDown { vk_code, .. } => {
            if let Some(bit) = modifier_bit(vk_code) {
                *modifiers |= bit;
            }
            Some(CoordinatorCommand::LocalInput {
                event_type: InputEventType::KeyPress,
                modifiers: *modifiers,
                buttons: *buttons,
                keycode: Some(vk_to_hid(vk_code).as_u16()),
                text: None,
                button: None,
            })
        }
        RawInputEvent::KeyUp { vk_code, .. } => {
            if let Some(bit) = modifier_bit(vk_code) {
                *modifiers &= !bit;
            }
            Some(CoordinatorCommand::LocalInput {
                event_type: InputEventType::KeyRelease,
                modifiers: *modifiers,
                buttons: *buttons,
                keycode: Some(vk_to_hid(vk_code).as_u16()),
                text: None,
                button: None,
            })
        }
        RawInputEvent::MouseMove { x, y, .. } => {
            Some(CoordinatorCommand::LocalMouseMove { x, y, modifiers: *modifiers, buttons: *buttons })
        }
        RawInputEvent::MouseButtonDown { button, .. } => {
            if let Some(bit) = button_bit(button) {
                *buttons |= bit;
            }
            let name = button_name(button)?;
            Some(CoordinatorCommand::LocalInput {
                event_type: InputEventType::MousePress,
                modifiers: *modifiers,
                buttons: *buttons,
                keycode: None,
                text: None,
                button: Some(name.to_string()),
            })
        }
        RawInputEvent::MouseButtonUp { button, .. } => {
            if let Some(bit) = button_bit(button) {
                *buttons &= !bit;
            }
            let name = button_name(button)?;
            Some(CoordinatorCommand::LocalInput {
                event_type: InputEventType::MouseRelease,
                modifiers: *modifiers,
                buttons: *buttons,
                keycode: None,
                text: None,
                button: Some(name.to_string()),
            })
        }
        // Scroll has no place in the wire protocol's four input-event kinds; dropped.
        RawInputEvent::MouseWheel { .. } | RawInputEvent::MouseWheelH { .. } => None,
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
