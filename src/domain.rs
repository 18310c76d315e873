//! Value types shared across the bridge.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address of a single data point on the tag source.
///
/// Immutable, compared and hashed by its text. The text is shared, so
/// cloning a path for each scheduled task does not copy the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagPath(Arc<str>);

impl TagPath {
    /// Wrap a tag address string.
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(Arc::from(text.as_ref()))
    }

    /// The raw address text, as the protocol expects it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TagPath {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A poll interval as a whole number of milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Milliseconds(u64);

impl Milliseconds {
    /// Wrap a millisecond count.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// The raw count.
    pub fn count(&self) -> u64 {
        self.0
    }

    /// Whether this is the zero interval.
    ///
    /// A zero interval would busy-loop the scheduler; the bridge rejects
    /// it at start.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert to a [`Duration`].
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl fmt::Display for Milliseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A value read from the tag source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// Whole-number reading.
    Integer(i64),
    /// Floating-point reading.
    Float(f64),
    /// Text reading.
    Text(String),
    /// Boolean reading.
    Boolean(bool),
}

impl From<i64> for TagValue {
    fn from(v: i64) -> Self {
        TagValue::Integer(v)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Float(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Text(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Text(v)
    }
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Boolean(v)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Integer(v) => write!(f, "{}", v),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Text(v) => f.write_str(v),
            TagValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}
