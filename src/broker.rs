//! Publish-side collaborator abstraction.
//!
//! Workers hand their readings to a shared [`Broker`]. The trait returns
//! marker values rather than `()` so callers and tests can assert which
//! terminal state an operation reached without holding a live connection
//! handle. Implementations must tolerate concurrent `publish` calls; the
//! bridge does no locking around them.

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Outcome, Problem};

/// The broker accepted the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connected;

/// The broker accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Published;

/// The broker connection was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Message-bus client capability.
///
/// Contract:
/// - `publish` before a successful `connect` fails with a "not connected"
///   problem rather than panicking.
/// - `disconnect` is idempotent: disconnecting an already-disconnected
///   broker still returns [`Disconnected`].
/// - A failed publish is reported once and never retried internally;
///   retry policy belongs to the caller.
pub trait Broker: Send + Sync {
    /// Connect to the bus.
    fn connect(&self) -> Outcome<Connected>;

    /// Publish one message under a topic.
    fn publish(&self, topic: &str, message: &str) -> Outcome<Published>;

    /// Release the connection.
    fn disconnect(&self) -> Outcome<Disconnected>;
}

/// Broker that writes messages to stdout. Always succeeds.
///
/// Useful for smoke-testing a bridge configuration without a bus.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleBroker;

impl ConsoleBroker {
    /// Create a console broker.
    pub fn new() -> Self {
        Self
    }

    /// The line printed for one publish.
    pub fn line(topic: &str, message: &str) -> String {
        format!("{}: {}", topic, message)
    }
}

impl Broker for ConsoleBroker {
    fn connect(&self) -> Outcome<Connected> {
        Ok(Connected)
    }

    fn publish(&self, topic: &str, message: &str) -> Outcome<Published> {
        println!("{}", Self::line(topic, message));
        Ok(Published)
    }

    fn disconnect(&self) -> Outcome<Disconnected> {
        Ok(Disconnected)
    }
}

/// A call observed by a [`RecordingBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCall {
    Connect,
    Publish { topic: String, message: String },
    Disconnect,
}

/// Test double that records every call for later assertions.
///
/// Optionally rejects publishes to a single topic so failure paths can be
/// exercised end to end.
#[derive(Debug, Default)]
pub struct RecordingBroker {
    calls: Mutex<Vec<BrokerCall>>,
    reject_topic: Option<String>,
}

impl RecordingBroker {
    /// Create a broker that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a broker that rejects publishes to `topic`.
    pub fn rejecting_topic(topic: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reject_topic: Some(topic.into()),
        }
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<BrokerCall> {
        self.calls.lock().clone()
    }

    /// The `(topic, message)` pairs of accepted publishes, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BrokerCall::Publish { topic, message } => {
                    Some((topic.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of accepted publishes.
    pub fn publish_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, BrokerCall::Publish { .. }))
            .count()
    }
}

impl Broker for RecordingBroker {
    fn connect(&self) -> Outcome<Connected> {
        self.calls.lock().push(BrokerCall::Connect);
        Ok(Connected)
    }

    fn publish(&self, topic: &str, message: &str) -> Outcome<Published> {
        if self.reject_topic.as_deref() == Some(topic) {
            debug!(topic, "recording broker rejecting publish");
            return Err(Problem::new("publish rejected").with_detail("topic", topic));
        }
        self.calls.lock().push(BrokerCall::Publish {
            topic: topic.to_string(),
            message: message.to_string(),
        });
        Ok(Published)
    }

    fn disconnect(&self) -> Outcome<Disconnected> {
        self.calls.lock().push(BrokerCall::Disconnect);
        Ok(Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_broker_reaches_each_terminal_state() {
        let broker = ConsoleBroker::new();
        assert_eq!(broker.connect(), Ok(Connected));
        assert_eq!(broker.publish("t", "m"), Ok(Published));
        assert_eq!(broker.disconnect(), Ok(Disconnected));
    }

    #[test]
    fn console_line_joins_topic_and_message() {
        assert_eq!(ConsoleBroker::line("plant/tags", "42"), "plant/tags: 42");
    }

    #[test]
    fn console_line_passes_unicode_through() {
        assert_eq!(
            ConsoleBroker::line("topic", "Значение"),
            "topic: Значение"
        );
    }

    #[test]
    fn console_disconnect_is_idempotent() {
        let broker = ConsoleBroker::new();
        assert_eq!(broker.disconnect(), Ok(Disconnected));
        assert_eq!(broker.disconnect(), Ok(Disconnected));
    }

    #[test]
    fn recording_broker_records_calls_in_order() {
        let broker = RecordingBroker::new();
        broker.connect().expect("connect failed");
        broker.publish("t", "42").expect("publish failed");
        broker.disconnect().expect("disconnect failed");

        assert_eq!(
            broker.calls(),
            vec![
                BrokerCall::Connect,
                BrokerCall::Publish {
                    topic: "t".to_string(),
                    message: "42".to_string()
                },
                BrokerCall::Disconnect,
            ]
        );
    }

    #[test]
    fn rejected_topic_fails_with_problem_and_is_not_recorded() {
        let broker = RecordingBroker::rejecting_topic("bad");
        let problem = broker.publish("bad", "m").unwrap_err();
        assert_eq!(problem.message(), "publish rejected");
        assert_eq!(problem.detail("topic"), Some("bad"));
        assert_eq!(broker.publish_count(), 0);

        broker.publish("good", "m").expect("publish failed");
        assert_eq!(broker.publish_count(), 1);
    }
}
