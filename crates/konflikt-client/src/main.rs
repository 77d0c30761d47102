//! Konflikt client entry point.
//!
//! Wires the platform input emulator and screen enumerator to the
//! [`ClientCoordinator`] use case, then runs the connect/handshake/serve
//! loop against the coordinator's `/ws` endpoint.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  ├─ load/create a stable instance id from disk
//!  ├─ resolve the coordinator address (--server-host, or mDNS discovery)
//!  ├─ build ClientCoordinator (EmulateInputUseCase + platform emulator)
//!  └─ network::run -- connect/handshake/serve/reconnect loop
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use konflikt_core::discovery::ServiceDirectory;
use konflikt_core::domain::instance::machine_id;

use konflikt_client::application::coordinator::ClientCoordinator;
use konflikt_client::application::emulate_input::{EmulateInputUseCase, PlatformInputEmulator};
use konflikt_client::application::report_screens::ScreenEnumerator;
use konflikt_client::infrastructure::network::discovery::discover_server;
use konflikt_client::infrastructure::network::{self, ClientIdentity};
use konflikt_client::infrastructure::screen_info::MockScreenEnumerator;
use konflikt_client::infrastructure::storage;

#[cfg(target_os = "windows")]
use konflikt_client::infrastructure::input_emulation::windows::WindowsInputEmulator;
#[cfg(target_os = "linux")]
use konflikt_client::infrastructure::input_emulation::linux::LinuxXTestEmulator;
#[cfg(target_os = "macos")]
use konflikt_client::infrastructure::input_emulation::macos::MacosInputEmulator;
#[cfg(target_os = "windows")]
use konflikt_client::infrastructure::screen_info::windows::WindowsScreenEnumerator;
#[cfg(target_os = "linux")]
use konflikt_client::infrastructure::screen_info::linux::LinuxScreenEnumerator;
#[cfg(target_os = "macos")]
use konflikt_client::infrastructure::screen_info::macos::MacosScreenEnumerator;

/// How long to wait for an mDNS-advertised coordinator before giving up,
/// when no `--server-host` was given.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Konflikt client: connects to a coordinator and forwards keyboard/mouse
/// input while this machine's screen is active.
#[derive(Debug, Parser)]
#[command(name = "konflikt-client", about = "Konflikt client process", version)]
struct Cli {
    /// Coordinator host/address to dial directly (`host:port` or an IP).
    /// When omitted, the client browses mDNS for a coordinator instead.
    #[arg(long, env = "KONFLIKT_SERVER_HOST")]
    server_host: Option<String>,

    /// Name shown to the coordinator. Defaults to the machine's hostname.
    #[arg(long, env = "KONFLIKT_INSTANCE_NAME")]
    instance_name: Option<String>,

    /// Log level filter (`error`, `warn`, `info`, `debug`, `trace`), or any
    /// `tracing_subscriber::EnvFilter` directive string.
    #[arg(long, env = "KONFLIKT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Overrides the platform-specific config directory used to persist
    /// the instance id.
    #[arg(long, env = "KONFLIKT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

fn local_hostname() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "konflikt-client".to_string())
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
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_deref().unwrap_or("info"))),
        )
        .init();

    let runtime = tokio::runtime::Runtime::new().context("failed to start the Tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let hostname = local_hostname();
    let instance_name = cli.instance_name.clone().unwrap_or_else(|| hostname.clone());
    let machine_id = machine_id(&hostname, &local_username(), PLATFORM_NAME);

    let config_dir = storage::resolve_config_dir(cli.config_dir.clone())
        .context("could not resolve a platform configuration directory")?;
    let instance_id = storage::load_or_create_instance_id(&config_dir);

    info!(%instance_id, %instance_name, "starting konflikt-client");

    let server_addr = resolve_server_addr(&cli).await.context("could not locate a coordinator to connect to")?;
    info!(%server_addr, "connecting to coordinator");

    let screens: Arc<dyn ScreenEnumerator> = new_screen_enumerator();
    let emulator: Arc<dyn PlatformInputEmulator> = new_input_emulator()?;
    let use_case = EmulateInputUseCase::new(emulator);
    let coordinator = ClientCoordinator::new(instance_id.clone(), use_case);

    let identity = ClientIdentity {
        instance_id,
        instance_name,
        machine_id,
        version: env!("CARGO_PKG_VERSION").to_string(),
        // A real release pipeline would stamp this via a build script; the
        // crate version stands in as the update-skew signal in its absence.
        git_commit: env!("CARGO_PKG_VERSION").to_string(),
        capabilities: vec!["input_event".to_string()],
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_for_signal = running.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received, stopping konflikt-client");
        running_for_signal.store(false, Ordering::Relaxed);
    });

    network::run(server_addr, identity, screens, coordinator, running).await;

    info!("konflikt-client stopped");
    Ok(())
}

/// Resolves the coordinator address: `--server-host` if given (appending
/// the default port 3000 when the flag carries no port), otherwise an
/// mDNS browse.
async fn resolve_server_addr(cli: &Cli) -> anyhow::Result<SocketAddr> {
    if let Some(host) = &cli.server_host {
        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }
        let with_port = format!("{host}:3000");
        return with_port.parse::<SocketAddr>().with_context(|| format!("invalid --server-host value: {host}"));
    }

    let directory = ServiceDirectory::new().context("failed to start mDNS discovery")?;
    let found = discover_server(&directory, DISCOVERY_TIMEOUT).await;
    let _ = directory.shutdown();
    found.context("no coordinator found via mDNS within the discovery timeout; pass --server-host instead")
}

#[cfg(target_os = "windows")]
fn new_input_emulator() -> anyhow::Result<Arc<dyn PlatformInputEmulator>> {
    Ok(Arc::new(WindowsInputEmulator::new()))
}

#[cfg(target_os = "linux")]
fn new_input_emulator() -> anyhow::Result<Arc<dyn PlatformInputEmulator>> {
    Ok(Arc::new(LinuxXTestEmulator::new()?))
}

#[cfg(target_os = "macos")]
fn new_input_emulator() -> anyhow::Result<Arc<dyn PlatformInputEmulator>> {
    Ok(Arc::new(MacosInputEmulator::new()?))
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
fn new_input_emulator() -> anyhow::Result<Arc<dyn PlatformInputEmulator>> {
    warn!("no native input emulation implementation for this platform; running with a mock emulator");
    Ok(Arc::new(konflikt_client::infrastructure::input_emulation::mock::MockInputEmulator::new()))
}

#[cfg(target_os = "windows")]
fn new_screen_enumerator() -> Arc<dyn ScreenEnumerator> {
    Arc::new(WindowsScreenEnumerator::new())
}

#[cfg(target_os = "linux")]
fn new_screen_enumerator() -> Arc<dyn ScreenEnumerator> {
    Arc::new(LinuxScreenEnumerator::new())
}

#[cfg(target_os = "macos")]
fn new_screen_enumerator() -> Arc<dyn ScreenEnumerator> {
    Arc::new(MacosScreenEnumerator::new())
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
fn new_screen_enumerator() -> Arc<dyn ScreenEnumerator> {
    warn!("no native screen enumeration implementation for this platform; reporting a fixed 1920x1080 geometry");
    Arc::new(MockScreenEnumerator::single_1080p())
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
