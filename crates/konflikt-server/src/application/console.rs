//! Interpreter for the `/console` administrative channel.
//!
//! This is pure logic: given a command name, its arguments, and read-only
//! snapshots of server state, produce the response to send back. The Server
//! Endpoint owns the actual socket and timestamps; this module never touches
//! either.

use konflikt_core::domain::layout::ScreenEntry;
use konflikt_core::protocol::envelope::EpochMillis;

/// Narrow read-only view onto the layout, so the console interpreter does not
/// need the full `LayoutManager` (or the ability to mutate it) to answer
/// `connections`/`status`.
pub trait LayoutQuery: Send + Sync {
    fn screens(&self) -> Vec<ScreenEntry>;
}

impl LayoutQuery for konflikt_core::LayoutManager {
    fn screens(&self) -> Vec<ScreenEntry> {
        self.screens().to_vec()
    }
}

/// Read-only snapshot of process identity and runtime state, assembled by
/// the caller each time a command needs it.
#[derive(Debug, Clone)]
pub struct ServerStatus {
    pub instance_id: String,
    pub instance_name: String,
    pub version: String,
    pub uptime_secs: u64,
    pub connection_count: usize,
    pub discovery_enabled: bool,
    pub bind_addr: String,
    pub port: u16,
}

/// The result of interpreting one console command.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleOutcome {
    Response(String),
    Error(String),
    Pong(EpochMillis),
    /// The process should shut down cleanly after sending a response.
    Quit(String),
}

const HELP_TEXT: &str = "commands: help, status, config [key], server, connections, discovery, ping, quit";

/// Interprets one `console_command`. `now` is the timestamp to echo back
/// from a `ping`.
pub fn handle_console_command(
    command: &str,
    args: &[String],
    status: &ServerStatus,
    layout: &dyn LayoutQuery,
    now: EpochMillis,
) -> ConsoleOutcome {
    match command {
        "help" => ConsoleOutcome::Response(HELP_TEXT.to_string()),
        "status" => ConsoleOutcome::Response(format!(
            "instance={} name={} version={} uptime={}s connections={} discovery={}",
            status.instance_id,
            status.instance_name,
            status.version,
            status.uptime_secs,
            status.connection_count,
            if status.discovery_enabled { "on" } else { "off" },
        )),
        "config" => match args.first() {
            Some(key) => match key.as_str() {
                "bind-addr" => ConsoleOutcome::Response(status.bind_addr.clone()),
                "port" => ConsoleOutcome::Response(status.port.to_string()),
                "instance-name" => ConsoleOutcome::Response(status.instance_name.clone()),
                other => ConsoleOutcome::Error(format!("unknown config key: {other}")),
            },
            None => ConsoleOutcome::Response(format!(
                "bind-addr={} port={} instance-name={}",
                status.bind_addr, status.port, status.instance_name
            )),
        },
        "server" => ConsoleOutcome::Response(format!(
            "{} ({}) v{}",
            status.instance_name, status.instance_id, status.version
        )),
        "connections" => {
            let screens = layout.screens();
            let lines: Vec<String> = screens
                .iter()
                .filter(|s| !s.is_server)
                .map(|s| {
                    format!(
                        "{} \"{}\" {}x{} at ({},{}) {}",
                        s.instance_id,
                        s.display_name,
                        s.width,
                        s.height,
                        s.x,
                        s.y,
                        if s.online { "online" } else { "offline" }
                    )
                })
                .collect();
            if lines.is_empty() {
                ConsoleOutcome::Response("no clients registered".to_string())
            } else {
                ConsoleOutcome::Response(lines.join("\n"))
            }
        }
        "discovery" => ConsoleOutcome::Response(if status.discovery_enabled {
            "discovery: advertising".to_string()
        } else {
            "discovery: disabled".to_string()
        }),
        "ping" => ConsoleOutcome::Pong(now),
        "quit" => ConsoleOutcome::Quit("shutting down".to_string()),
        other => ConsoleOutcome::Error(format!("unknown command: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLayout(Vec<ScreenEntry>);
    impl LayoutQuery for FixedLayout {
        fn screens(&self) -> Vec<ScreenEntry> {
            self.0.clone()
        }
    }

    fn status() -> ServerStatus {
        ServerStatus {
            instance_id: "srv".into(),
            instance_name: "Desk".into(),
            version: "0.1.0".into(),
            uptime_secs: 42,
            connection_count: 1,
            discovery_enabled: true,
            bind_addr: "0.0.0.0".into(),
            port: 3000,
        }
    }

    #[test]
    fn help_lists_known_commands() {
        let out = handle_console_command("help", &[], &status(), &FixedLayout(vec![]), 0);
        assert!(matches!(out, ConsoleOutcome::Response(s) if s.contains("connections")));
    }

    #[test]
    fn ping_echoes_the_timestamp_as_pong() {
        let out = handle_console_command("ping", &[], &status(), &FixedLayout(vec![]), 12345);
        assert_eq!(out, ConsoleOutcome::Pong(12345));
    }

    #[test]
    fn quit_requests_shutdown() {
        let out = handle_console_command("quit", &[], &status(), &FixedLayout(vec![]), 0);
        assert!(matches!(out, ConsoleOutcome::Quit(_)));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let out = handle_console_command("frobnicate", &[], &status(), &FixedLayout(vec![]), 0);
        assert!(matches!(out, ConsoleOutcome::Error(_)));
    }

    #[test]
    fn config_with_no_key_lists_everything() {
        let out = handle_console_command("config", &[], &status(), &FixedLayout(vec![]), 0);
        assert!(matches!(out, ConsoleOutcome::Response(s) if s.contains("port=3000")));
    }

    #[test]
    fn config_with_unknown_key_is_an_error() {
        let out =
            handle_console_command("config", &["nope".to_string()], &status(), &FixedLayout(vec![]), 0);
        assert!(matches!(out, ConsoleOutcome::Error(_)));
    }

    #[test]
    fn connections_lists_clients_but_not_the_server_entry() {
        let screens = vec![
            ScreenEntry {
                instance_id: "srv".into(),
                display_name: "Server".into(),
                machine_id: "m0".into(),
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
                is_server: true,
                online: true,
            },
            ScreenEntry {
                instance_id: "cli".into(),
                display_name: "Client".into(),
                machine_id: "m1".into(),
                x: 1920,
                y: 0,
                width: 1920,
                height: 1080,
                is_server: false,
                online: true,
            },
        ];
        let out = handle_console_command("connections", &[], &status(), &FixedLayout(screens), 0);
        match out {
            ConsoleOutcome::Response(s) => {
                assert!(s.contains("cli"));
                assert!(!s.contains("srv \""));
            }
            other => panic!("expected Response, got {other:?}"),
        }
    }
}
