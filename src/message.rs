use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header map attached to a [`FlowMessage`].
pub type Headers = FxHashMap<String, Value>;

/// A message travelling through a flow: a JSON payload plus headers.
///
/// Messages are the unit of traffic between endpoints. Endpoint callbacks
/// declare whether they consume the payload, the headers, or the whole
/// message (see [`Callback`](crate::endpoint::Callback)); the structure
/// itself stays opaque to the composition engine.
///
/// # Examples
///
/// ```
/// use integraph::message::FlowMessage;
/// use serde_json::json;
///
/// let msg = FlowMessage::new(json!("hello"))
///     .with_header("foo", json!("bar"));
/// assert_eq!(msg.payload, json!("hello"));
/// assert_eq!(msg.header("foo"), Some(&json!("bar")));
/// ```
///
/// # Serialization
///
/// `FlowMessage` implements `Serialize`/`Deserialize`; exporting a graph
/// or its traffic to a declarative format is a downstream concern.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowMessage {
    /// Open-ended key-value metadata travelling with the payload.
    #[serde(default)]
    pub headers: Headers,
    /// The message body.
    #[serde(default)]
    pub payload: Value,
}

impl FlowMessage {
    /// Creates a message from a bare payload with no headers.
    #[must_use]
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            headers: Headers::default(),
            payload: payload.into(),
        }
    }

    /// Adds a header, returning the updated message.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Looks up a header value by key.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&Value> {
        self.headers.get(key)
    }

    /// Returns a copy of this message carrying a new payload.
    ///
    /// Headers are preserved; transformers use this so metadata survives
    /// payload replacement.
    #[must_use]
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            headers: self.headers.clone(),
            payload,
        }
    }
}
