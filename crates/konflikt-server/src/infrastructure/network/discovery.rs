//! Service-discovery integration for the coordinator: advertises this
//! process over mDNS and resolves the case where two coordinators end up
//! running on the same host at once.
//!
//! The collision rule itself ([`konflikt_core::discovery::candidate_wins`])
//! is pure and lives in `konflikt-core`; this module is the infrastructure
//! wrapper that drives it from a live `mdns-sd` browse stream and acts on
//! the result by dialing the loser's `/console` channel and sending it a
//! `quit` command — the only channel allowed to shut a running instance
//! down remotely.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::SinkExt;
use konflikt_core::discovery::{candidate_wins, DiscoveredService, ServiceDirectory, SERVICE_TYPE};
use konflikt_core::protocol::envelope::EpochMillis;
use mdns_sd::ServiceEvent;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// What this process registered itself as, kept around so the browse loop
/// can recognize its own advertisement (filtered out by `pid`) and run the
/// collision rule against everyone else.
#[derive(Debug, Clone)]
pub struct OwnAdvertisement {
    pub host_ip: IpAddr,
    pub port: u16,
    pub started: EpochMillis,
    pub pid: u32,
}

impl OwnAdvertisement {
    fn as_discovered(&self) -> DiscoveredService {
        DiscoveredService {
            instance_name: String::new(),
            addr: self.host_ip,
            port: self.port,
            started: self.started,
            pid: self.pid,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Advertises this process as a coordinator and runs the browse loop until
/// `running` is cleared. Exits early (without error) once the loop notices
/// `running` has gone false; the mDNS daemon itself is shut down by the
/// caller afterward via [`ServiceDirectory::shutdown`].
pub async fn advertise_and_resolve_collisions(
    directory: &ServiceDirectory,
    instance_name: &str,
    hostname: &str,
    own: OwnAdvertisement,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    directory.advertise(
        instance_name,
        hostname,
        own.host_ip,
        own.port,
        own.started,
        own.pid,
        env!("CARGO_PKG_VERSION"),
    )?;
    info!(port = own.port, "advertising coordinator over mDNS under {SERVICE_TYPE}");

    let receiver = directory.browse()?;
    let mine = own.as_discovered();

    loop {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        let event = match tokio::time::timeout(std::time::Duration::from_millis(500), receiver.recv_async()).await {
            Ok(Ok(event)) => event,
            Ok(Err(_)) => break, // browse channel closed
            Err(_) => continue, // timed out, loop back to re-check `running`
        };

        let ServiceEvent::ServiceResolved(info) = event else { continue };
        let Some(discovered) = DiscoveredService::from_service_info(&info) else { continue };

        if discovered.pid == mine.pid {
            continue; // our own advertisement, echoed back by the daemon
        }
        if discovered.addr != mine.addr {
            continue; // different host: not a collision, just a peer coordinator
        }

        if candidate_wins(&mine, &discovered) {
            info!(
                their_pid = discovered.pid,
                their_started = discovered.started,
                "newer coordinator on this host outranks an existing one; asking it to quit"
            );
            quit_via_console(SocketAddr::new(discovered.addr, discovered.port)).await;
        } else {
            debug!(their_pid = discovered.pid, "an existing coordinator on this host outranks us; yielding");
        }
    }

    Ok(())
}

/// Opens a short-lived `/console` connection to `addr` and sends a `quit`
/// command. Best-effort: the target may already be gone, in which case this
/// silently does nothing.
async fn quit_via_console(addr: SocketAddr) {
    let url = format!("ws://{addr}/console");
    let (mut ws, _) = match tokio_tungstenite::connect_async(&url).await {
        Ok(pair) => pair,
        Err(e) => {
            warn!(%addr, error = %e, "failed to connect to losing coordinator's console channel");
            return;
        }
    };

    let command = serde_json::json!({ "type": "console_command", "command": "quit", "args": [] });
    if let Err(e) = ws.send(WsMessage::Text(command.to_string())).await {
        warn!(%addr, error = %e, "failed to send quit command over console channel");
    }
    let _ = ws.close(None).await;
}
