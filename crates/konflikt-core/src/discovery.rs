//! mDNS-based discovery of the Konflikt coordinator ("server") instance on
//! the local network, and the collision-resolution rule used when two
//! coordinators advertise themselves on the same network at once.

use std::collections::HashMap;
use std::net::IpAddr;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use thiserror::Error;

use crate::protocol::EpochMillis;

/// The mDNS service type Konflikt coordinators advertise under.
pub const SERVICE_TYPE: &str = "_konflikt._tcp.local.";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("mDNS daemon error: {0}")]
    Daemon(#[from] mdns_sd::Error),
}

/// One coordinator advertisement observed on the network, with just the
/// fields the collision rule and the client's connect step need.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredService {
    pub instance_name: String,
    pub addr: IpAddr,
    pub port: u16,
    pub started: EpochMillis,
    pub pid: u32,
    pub version: String,
}

impl DiscoveredService {
    /// Builds a [`DiscoveredService`] from a resolved mDNS record, or
    /// `None` if it is missing the TXT keys Konflikt coordinators always
    /// set (i.e. it is some other, unrelated `_konflikt._tcp` advertiser).
    pub fn from_service_info(info: &ServiceInfo) -> Option<Self> {
        let props = info.get_properties();
        let started = props.get_property_val_str("started")?.parse().ok()?;
        let pid = props.get_property_val_str("pid")?.parse().ok()?;
        let version = props
            .get_property_val_str("version")
            .unwrap_or("unknown")
            .to_string();
        let addr = info.get_addresses().iter().next().copied()?;
        Some(Self {
            instance_name: info.get_fullname().to_string(),
            addr,
            port: info.get_port(),
            started,
            pid,
            version,
        })
    }
}

/// Decides which of two simultaneously-advertising coordinators should stay
/// running: the one that started more recently wins, since it is
/// presumably the operator's freshest launch; a tie on `started` (same
/// millisecond, or a clock that hasn't advanced) is broken by the lower
/// process id so the rule is still a total order.
///
/// Returns `true` if `candidate` should survive over `incumbent`, meaning
/// the incumbent should be asked to quit.
pub fn candidate_wins(candidate: &DiscoveredService, incumbent: &DiscoveredService) -> bool {
    match candidate.started.cmp(&incumbent.started) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.pid < incumbent.pid,
    }
}

/// Thin wrapper over an [`mdns_sd::ServiceDaemon`] for advertising this
/// process as the coordinator and for browsing for other coordinators.
pub struct ServiceDirectory {
    daemon: ServiceDaemon,
}

impl ServiceDirectory {
    pub fn new() -> Result<Self, DiscoveryError> {
        Ok(Self { daemon: ServiceDaemon::new()? })
    }

    /// Advertises this process as a coordinator. `started`/`pid` go into
    /// the TXT record so a later-starting instance can run [`candidate_wins`]
    /// against this one without a side channel.
    #[allow(clippy::too_many_arguments)]
    pub fn advertise(
        &self,
        instance_name: &str,
        hostname: &str,
        host_ip: IpAddr,
        port: u16,
        started: EpochMillis,
        pid: u32,
        version: &str,
    ) -> Result<(), DiscoveryError> {
        let mut properties = HashMap::new();
        properties.insert("role".to_string(), "server".to_string());
        properties.insert("started".to_string(), started.to_string());
        properties.insert("pid".to_string(), pid.to_string());
        properties.insert("version".to_string(), version.to_string());

        let info = ServiceInfo::new(
            SERVICE_TYPE,
            instance_name,
            hostname,
            host_ip,
            port,
            Some(properties),
        )?;
        self.daemon.register(info)?;
        Ok(())
    }

    /// Starts a browse for other coordinators and returns the event
    /// channel; the caller filters `ServiceEvent::ServiceResolved` through
    /// [`DiscoveredService::from_service_info`].
    pub fn browse(&self) -> Result<mdns_sd::Receiver<ServiceEvent>, DiscoveryError> {
        Ok(self.daemon.browse(SERVICE_TYPE)?)
    }

    pub fn shutdown(&self) -> Result<(), DiscoveryError> {
        self.daemon.shutdown()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(started: EpochMillis, pid: u32) -> DiscoveredService {
        DiscoveredService {
            instance_name: "srv._konflikt._tcp.local.".into(),
            addr: "192.168.1.10".parse().unwrap(),
            port: 3000,
            started,
            pid,
            version: "1.0.0".into(),
        }
    }

    #[test]
    fn newer_start_time_wins() {
        let newer = service(2000, 100);
        let older = service(1000, 50);
        assert!(candidate_wins(&newer, &older));
        assert!(!candidate_wins(&older, &newer));
    }

    #[test]
    fn tie_on_start_time_is_broken_by_lower_pid() {
        let lower_pid = service(1000, 10);
        let higher_pid = service(1000, 20);
        assert!(candidate_wins(&lower_pid, &higher_pid));
        assert!(!candidate_wins(&higher_pid, &lower_pid));
    }

    #[test]
    fn identical_pid_and_start_time_is_not_a_win_either_way() {
        let a = service(1000, 10);
        let b = service(1000, 10);
        assert!(!candidate_wins(&a, &b));
        assert!(!candidate_wins(&b, &a));
    }
}
