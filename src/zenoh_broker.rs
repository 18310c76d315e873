//! Production broker adapter backed by a Zenoh session.

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use zenoh::{Session, Wait};

use crate::broker::{Broker, Connected, Disconnected, Published};
use crate::config::ZenohConfig;
use crate::error::{Outcome, Problem};

/// Publishes tag readings to a Zenoh bus.
///
/// The topic passed to `publish` is used directly as the key expression.
/// The session handle lives behind a lock so the adapter can be shared by
/// every worker; Zenoh itself handles the wire concurrency.
pub struct ZenohBroker {
    config: ZenohConfig,
    session: Mutex<Option<Session>>,
}

impl ZenohBroker {
    /// Create a disconnected broker for the given Zenoh settings.
    pub fn new(config: ZenohConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Whether a session is currently held.
    pub fn is_connected(&self) -> bool {
        self.session.lock().is_some()
    }

    fn build_config(&self) -> Outcome<zenoh::Config> {
        let mut config = zenoh::Config::default();

        match self.config.mode.as_str() {
            "client" | "peer" | "router" => {}
            other => {
                return Err(Problem::new("invalid Zenoh mode")
                    .with_detail("mode", other)
                    .with_detail("expected", "client, peer, or router"));
            }
        }
        config
            .insert_json5("mode", &format!("\"{}\"", self.config.mode))
            .map_err(|e| Problem::from_error("failed to set Zenoh mode", e))?;

        if !self.config.connect.is_empty() {
            let endpoints = serde_json::to_string(&self.config.connect)
                .map_err(|e| Problem::from_error("failed to serialize connect endpoints", e))?;
            config
                .insert_json5("connect/endpoints", &endpoints)
                .map_err(|e| Problem::from_error("failed to set connect endpoints", e))?;
        }

        if !self.config.listen.is_empty() {
            let endpoints = serde_json::to_string(&self.config.listen)
                .map_err(|e| Problem::from_error("failed to serialize listen endpoints", e))?;
            config
                .insert_json5("listen/endpoints", &endpoints)
                .map_err(|e| Problem::from_error("failed to set listen endpoints", e))?;
        }

        Ok(config)
    }
}

impl Broker for ZenohBroker {
    fn connect(&self) -> Outcome<Connected> {
        let mut guard = self.session.lock();
        if guard.is_some() {
            debug!("Zenoh session already open");
            return Ok(Connected);
        }

        info!(
            mode = %self.config.mode,
            connect = ?self.config.connect,
            "opening Zenoh session"
        );
        let session = zenoh::open(self.build_config()?).wait().map_err(|e| {
            Problem::from_error("Zenoh connection failed", e)
                .with_detail("mode", self.config.mode.as_str())
                .with_detail("endpoints", self.config.connect.join(","))
        })?;

        info!(zid = %session.zid(), "Zenoh session open");
        *guard = Some(session);
        Ok(Connected)
    }

    fn publish(&self, topic: &str, message: &str) -> Outcome<Published> {
        let guard = self.session.lock();
        let session = guard
            .as_ref()
            .ok_or_else(|| Problem::new("not connected").with_detail("topic", topic))?;

        session.put(topic, message).wait().map_err(|e| {
            Problem::from_error("Zenoh publish failed", e).with_detail("topic", topic)
        })?;
        Ok(Published)
    }

    fn disconnect(&self) -> Outcome<Disconnected> {
        // Take the handle first: local state is released even if the
        // close itself reports a problem.
        let session = self.session.lock().take();
        match session {
            Some(session) => {
                info!("closing Zenoh session");
                session
                    .close()
                    .wait()
                    .map_err(|e| Problem::from_error("Zenoh disconnect failed", e))?;
                Ok(Disconnected)
            }
            None => {
                warn!("disconnect on an already-disconnected Zenoh broker");
                Ok(Disconnected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disconnected_broker() -> ZenohBroker {
        ZenohBroker::new(ZenohConfig {
            mode: "peer".to_string(),
            connect: Vec::new(),
            listen: Vec::new(),
        })
    }

    #[test]
    fn publish_before_connect_reports_not_connected() {
        let broker = disconnected_broker();
        let problem = broker.publish("plant/tags", "42").unwrap_err();
        assert_eq!(problem.message(), "not connected");
        assert_eq!(problem.detail("topic"), Some("plant/tags"));
    }

    #[test]
    fn disconnect_is_idempotent_when_never_connected() {
        let broker = disconnected_broker();
        assert_eq!(broker.disconnect(), Ok(Disconnected));
        assert_eq!(broker.disconnect(), Ok(Disconnected));
        assert!(!broker.is_connected());
    }

    #[test]
    fn invalid_mode_fails_config_build() {
        let broker = ZenohBroker::new(ZenohConfig {
            mode: "broadcast".to_string(),
            connect: Vec::new(),
            listen: Vec::new(),
        });
        let problem = broker.connect().unwrap_err();
        assert_eq!(problem.message(), "invalid Zenoh mode");
        assert_eq!(problem.detail("mode"), Some("broadcast"));
    }
}
