//! Failure values for bridge operations.
//!
//! Every fallible operation in the bridge returns an [`Outcome`]: either a
//! success value or a [`Problem`] describing what went wrong, with enough
//! context (host, topic, tag, underlying error text) to diagnose it from a
//! log line. Problems are plain values; nothing in the core panics or
//! unwinds on an operational failure.

use std::collections::BTreeMap;
use std::fmt;

/// Result alias used throughout the bridge.
pub type Outcome<T> = Result<T, Problem>;

/// A structured, human-readable failure description.
///
/// Carries a message plus an ordered map of context entries. Constructed
/// with [`Problem::new`] and enriched with [`Problem::with_detail`]:
///
/// ```
/// use zenoh_bridge_opcda::error::Problem;
///
/// let problem = Problem::new("read failed")
///     .with_detail("tag", "Plant.Line1.Temp")
///     .with_detail("host", "opcsrv01");
/// assert_eq!(problem.detail("tag"), Some("Plant.Line1.Temp"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    message: String,
    context: BTreeMap<String, String>,
}

impl Problem {
    /// Create a problem with a message and no context.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Create a problem from an underlying collaborator error.
    ///
    /// The error's display text is recorded under the `error` context key.
    /// This is the single conversion boundary between foreign error types
    /// and the bridge's own failure representation; adapters use it instead
    /// of hand-rolling per-call mappings.
    pub fn from_error(message: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::new(message).with_detail("error", error.to_string())
    }

    /// Attach a context entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Look up a context entry.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    /// All context entries, in key order.
    pub fn context(&self) -> impl Iterator<Item = (&str, &str)> {
        self.context
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.context.is_empty() {
            write!(f, " [")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl std::error::Error for Problem {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_context() {
        let problem = Problem::new("connection refused");
        assert_eq!(problem.to_string(), "connection refused");
    }

    #[test]
    fn display_renders_context_in_key_order() {
        let problem = Problem::new("publish failed")
            .with_detail("topic", "plant/tags")
            .with_detail("error", "broken pipe");
        assert_eq!(
            problem.to_string(),
            "publish failed [error=broken pipe, topic=plant/tags]"
        );
    }

    #[test]
    fn from_error_records_underlying_text() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let problem = Problem::from_error("broker connect failed", io);
        assert_eq!(problem.message(), "broker connect failed");
        assert_eq!(problem.detail("error"), Some("reset by peer"));
    }

    #[test]
    fn outcome_fold_applies_exactly_one_branch() {
        let ok: Outcome<u32> = Ok(7);
        let err: Outcome<u32> = Err(Problem::new("boom"));

        // map_or_else is the fold over the two variants.
        assert_eq!(ok.map_or_else(|_| 0, |v| v), 7);
        assert_eq!(err.map_or_else(|_| 0, |v| v), 0);
    }

    #[test]
    fn problems_compare_by_value() {
        let a = Problem::new("x").with_detail("k", "v");
        let b = Problem::new("x").with_detail("k", "v");
        assert_eq!(a, b);
    }
}
