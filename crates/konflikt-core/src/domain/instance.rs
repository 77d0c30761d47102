//! Process-wide instance identity: the role fixed at start, and the stable
//! machine identifier used to tell two processes on the same host apart from
//! two processes on different hosts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Whether this process is the coordinator ("server") or a redirection
/// target ("client"). Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceRole {
    Server,
    Client,
}

/// Computes a stable identifier for the current machine from its hostname,
/// the running user, and the platform name.
///
/// This is not a security primitive — it only needs to be stable across
/// restarts of the same user on the same host and distinct across hosts, so
/// that the Server Endpoint and Layout Manager can recognize "same machine"
/// without relying on IP addresses (which change on LANs with DHCP).
pub fn machine_id(hostname: &str, user: &str, platform: &str) -> String {
    let mut hasher = DefaultHasher::new();
    hostname.hash(&mut hasher);
    user.hash(&mut hasher);
    platform.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_id_is_stable_for_the_same_inputs() {
        let a = machine_id("host1", "alice", "linux");
        let b = machine_id("host1", "alice", "linux");
        assert_eq!(a, b);
    }

    #[test]
    fn machine_id_differs_across_hosts() {
        let a = machine_id("host1", "alice", "linux");
        let b = machine_id("host2", "alice", "linux");
        assert_ne!(a, b);
    }

    #[test]
    fn machine_id_is_a_fixed_width_hex_string() {
        let id = machine_id("host1", "alice", "linux");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
