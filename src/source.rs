//! Tag-source capability consumed by the worker pool.
//!
//! The bridge does not implement the legacy tag protocol itself; it
//! consumes it through [`TagSource`] (how to open a connection) and
//! [`TagReader`] (what a held connection can do). A production deployment
//! supplies an implementation backed by its protocol binding; the built-in
//! [`SimTagSource`] serves tests and demo runs from an in-memory table.
//!
//! The underlying protocol bindings are generally not safe to share one
//! connection across threads, so a reader is handed to exactly one worker
//! and never leaves it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::domain::{TagPath, TagValue};
use crate::error::{Outcome, Problem};

/// Factory for per-worker tag-source connections.
pub trait TagSource: Send + Sync {
    /// Open a dedicated connection.
    ///
    /// Called once per worker on worker start; a failure here is fatal to
    /// that worker only.
    fn connect(&self) -> Outcome<Box<dyn TagReader>>;
}

/// A held connection to the tag source, owned by a single worker.
pub trait TagReader: Send {
    /// Read the current value of one tag.
    ///
    /// A failed read reports a [`Problem`]; it must not poison the
    /// connection for subsequent reads.
    fn read(&mut self, tag: &TagPath) -> Outcome<TagValue>;

    /// Release the connection.
    fn close(self: Box<Self>);
}

/// In-memory tag source for tests and demo runs.
///
/// Serves values from a fixed table and can be configured to fail
/// connecting or to fail reads of specific tags.
#[derive(Debug, Default)]
pub struct SimTagSource {
    readings: HashMap<String, TagValue>,
    failing_tags: HashSet<String>,
    connect_failure: Option<String>,
    connects: AtomicUsize,
}

impl SimTagSource {
    /// Create a source serving the given readings.
    pub fn new(readings: HashMap<String, TagValue>) -> Self {
        Self {
            readings,
            ..Self::default()
        }
    }

    /// Make reads of `tag` fail with a simulated problem.
    pub fn with_read_failure(mut self, tag: impl Into<String>) -> Self {
        self.failing_tags.insert(tag.into());
        self
    }

    /// Make every connection attempt fail with the given message.
    pub fn with_connect_failure(mut self, message: impl Into<String>) -> Self {
        self.connect_failure = Some(message.into());
        self
    }

    /// Number of connections opened so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl TagSource for SimTagSource {
    fn connect(&self) -> Outcome<Box<dyn TagReader>> {
        if let Some(message) = &self.connect_failure {
            return Err(Problem::new(message.clone()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimTagReader {
            readings: self.readings.clone(),
            failing_tags: self.failing_tags.clone(),
        }))
    }
}

struct SimTagReader {
    readings: HashMap<String, TagValue>,
    failing_tags: HashSet<String>,
}

impl TagReader for SimTagReader {
    fn read(&mut self, tag: &TagPath) -> Outcome<TagValue> {
        if self.failing_tags.contains(tag.as_str()) {
            return Err(Problem::new("simulated read failure").with_detail("tag", tag.as_str()));
        }
        match self.readings.get(tag.as_str()) {
            Some(value) => Ok(value.clone()),
            None => Err(Problem::new("unknown tag").with_detail("tag", tag.as_str())),
        }
    }

    fn close(self: Box<Self>) {
        debug!("simulated tag reader closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> HashMap<String, TagValue> {
        HashMap::from([
            ("Tag1".to_string(), TagValue::Integer(42)),
            ("Tag2".to_string(), TagValue::Float(7.5)),
        ])
    }

    #[test]
    fn reads_values_from_the_table() {
        let source = SimTagSource::new(readings());
        let mut reader = source.connect().expect("connect failed");
        assert_eq!(reader.read(&TagPath::new("Tag1")), Ok(TagValue::Integer(42)));
        assert_eq!(reader.read(&TagPath::new("Tag2")), Ok(TagValue::Float(7.5)));
        reader.close();
    }

    #[test]
    fn unknown_tag_reports_a_problem() {
        let source = SimTagSource::new(readings());
        let mut reader = source.connect().expect("connect failed");
        let problem = reader.read(&TagPath::new("Nope")).unwrap_err();
        assert_eq!(problem.message(), "unknown tag");
        assert_eq!(problem.detail("tag"), Some("Nope"));
    }

    #[test]
    fn injected_read_failure_does_not_poison_the_reader() {
        let source = SimTagSource::new(readings()).with_read_failure("Tag1");
        let mut reader = source.connect().expect("connect failed");
        assert!(reader.read(&TagPath::new("Tag1")).is_err());
        assert_eq!(reader.read(&TagPath::new("Tag2")), Ok(TagValue::Float(7.5)));
    }

    #[test]
    fn connect_failure_is_reported_and_not_counted() {
        let source = SimTagSource::new(readings()).with_connect_failure("server offline");
        assert!(source.connect().is_err());
        assert_eq!(source.connect_count(), 0);
    }

    #[test]
    fn each_connect_yields_an_independent_reader() {
        let source = SimTagSource::new(readings());
        let _a = source.connect().expect("connect failed");
        let _b = source.connect().expect("connect failed");
        assert_eq!(source.connect_count(), 2);
    }
}
