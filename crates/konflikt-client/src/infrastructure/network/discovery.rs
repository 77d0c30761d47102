//! Client-side half of mDNS service discovery: browses for the coordinator
//! so an operator never has to type an IP address. Bypassed
//! entirely when `--server-host` is given.

use std::net::SocketAddr;
use std::time::Duration;

use konflikt_core::discovery::{DiscoveredService, ServiceDirectory};
use mdns_sd::ServiceEvent;
use tracing::{debug, info};

/// Browses for a coordinator for up to `timeout`, returning the address of
/// the first one resolved. `None` if the timeout elapses with nothing
/// found.
pub async fn discover_server(directory: &ServiceDirectory, timeout: Duration) -> Option<SocketAddr> {
    let receiver = match directory.browse() {
        Ok(receiver) => receiver,
        Err(e) => {
            tracing::warn!(error = %e, "failed to start mDNS browse");
            return None;
        }
    };

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return None;
        }
        let event = match tokio::time::timeout(remaining, receiver.recv_async()).await {
            Ok(Ok(event)) => event,
            Ok(Err(_)) => return None, // browse channel closed
            Err(_) => return None,     // overall timeout elapsed
        };

        let ServiceEvent::ServiceResolved(info) = event else {
            debug!("ignoring a non-resolved mDNS event while discovering the coordinator");
            continue;
        };
        let Some(service) = DiscoveredService::from_service_info(&info) else { continue };

        info!(addr = %service.addr, port = service.port, name = %service.instance_name, "discovered coordinator");
        return Some(SocketAddr::new(service.addr, service.port));
    }
}
