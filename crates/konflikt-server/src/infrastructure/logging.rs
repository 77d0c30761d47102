//! Structured logging setup and the bridge from `tracing` events to the
//! `/console` channel's `console_log` push messages.
//!
//! Initialization pairs `tracing_subscriber::fmt` with
//! `EnvFilter::try_from_default_env()`
//! falling back to a fixed level. On top of that we layer
//! [`ConsoleLogLayer`], which mirrors every formatted event onto a
//! `tokio::sync::broadcast` channel that connected `/console` sessions
//! subscribe to — the mechanism behind piping live server logs to an
//! attached operator without them tailing a file on the host.

use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::{EnvFilter, Layer};

use konflikt_core::protocol::envelope::now_epoch_millis;
use konflikt_core::protocol::messages::{ConsoleLogLevel, ConsoleMessage};

/// Capacity of the broadcast channel backing the `/console` log fanout. A
/// slow or absent console subscriber just misses older entries (`Lagged`),
/// it never backpressures the rest of the process.
const LOG_BROADCAST_CAPACITY: usize = 256;

/// A `tracing_subscriber::Layer` that turns every event into a
/// [`ConsoleMessage::ConsoleLog`] and publishes it to anyone subscribed via
/// [`ConsoleLogLayer::subscribe`]. Dropping every receiver is harmless:
/// `send` only fails when there are no subscribers, which this layer
/// ignores.
pub struct ConsoleLogLayer {
    sender: broadcast::Sender<ConsoleMessage>,
}

impl ConsoleLogLayer {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LOG_BROADCAST_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleMessage> {
        self.sender.subscribe()
    }
}

impl Default for ConsoleLogLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

fn console_level(level: &Level) -> ConsoleLogLevel {
    match *level {
        Level::ERROR => ConsoleLogLevel::Error,
        Level::WARN | Level::INFO => ConsoleLogLevel::Log,
        Level::DEBUG => ConsoleLogLevel::Debug,
        Level::TRACE => ConsoleLogLevel::Verbose,
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let Some(message) = visitor.message else { return };
        let _ = self.sender.send(ConsoleMessage::ConsoleLog {
            level: console_level(event.metadata().level()),
            message,
            timestamp: Some(now_epoch_millis()),
        });
    }
}

/// Initializes the global subscriber: `fmt` to stderr plus [`ConsoleLogLayer`].
/// Returns the layer's broadcast sender so the Server Endpoint can hand each
/// `/console` session its own receiver.
pub fn init(log_level: Option<&str>) -> broadcast::Sender<ConsoleMessage> {
    use tracing_subscriber::prelude::*;

    let filter = log_level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let console_layer = ConsoleLogLayer::new();
    let sender = console_layer.sender.clone();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(console_layer)
        .init();

    sender
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_level_maps_error_and_trace_to_the_expected_extremes() {
        assert_eq!(console_level(&Level::ERROR), ConsoleLogLevel::Error);
        assert_eq!(console_level(&Level::TRACE), ConsoleLogLevel::Verbose);
    }

    #[test]
    fn subscribe_returns_a_receiver_that_sees_published_messages() {
        let layer = ConsoleLogLayer::new();
        let mut rx = layer.subscribe();
        layer
            .sender
            .send(ConsoleMessage::ConsoleLog { level: ConsoleLogLevel::Log, message: "hi".into(), timestamp: None })
            .unwrap();
        assert!(rx.try_recv().is_ok());
    }
}
