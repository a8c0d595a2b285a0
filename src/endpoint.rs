//! Endpoint nodes and their processing capabilities.
//!
//! An [`EndpointNode`] is a single addressable processing step: it owns one
//! input channel, one output channel, and an opaque processing capability.
//! The capability is a [`Callback`] that declares which argument shape it
//! expects (payload, headers, or the whole message); the engine dispatches
//! the declared shape instead of inspecting the callable's signature.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::message::{FlowMessage, Headers};
use crate::router::{RouterRule, RoutingError};
use crate::types::{ChannelName, EndpointKind};

/// A processing capability with a declared argument shape.
///
/// Rather than inferring what a callback wants from its signature, the
/// declaration site picks a shape explicitly. `invoke` then extracts the
/// right view of the message.
///
/// # Examples
///
/// ```
/// use integraph::endpoint::Callback;
/// use integraph::message::FlowMessage;
/// use serde_json::{json, Value};
///
/// let upper: Callback<Value> = Callback::payload(|p| {
///     json!(p.as_str().unwrap_or_default().to_uppercase())
/// });
/// let msg = FlowMessage::new(json!("hello"));
/// assert_eq!(upper.invoke(&msg), json!("HELLO"));
/// ```
pub enum Callback<R> {
    /// Consumes only the payload.
    Payload(Arc<dyn Fn(&Value) -> R + Send + Sync>),
    /// Consumes only the headers.
    Headers(Arc<dyn Fn(&Headers) -> R + Send + Sync>),
    /// Consumes the whole message.
    Message(Arc<dyn Fn(&FlowMessage) -> R + Send + Sync>),
}

impl<R> Callback<R> {
    /// Wraps a payload-shaped callback.
    pub fn payload<F>(f: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
    {
        Self::Payload(Arc::new(f))
    }

    /// Wraps a headers-shaped callback.
    pub fn headers<F>(f: F) -> Self
    where
        F: Fn(&Headers) -> R + Send + Sync + 'static,
    {
        Self::Headers(Arc::new(f))
    }

    /// Wraps a message-shaped callback.
    pub fn message<F>(f: F) -> Self
    where
        F: Fn(&FlowMessage) -> R + Send + Sync + 'static,
    {
        Self::Message(Arc::new(f))
    }

    /// Invokes the callback with the argument shape it declared.
    pub fn invoke(&self, msg: &FlowMessage) -> R {
        match self {
            Self::Payload(f) => f(&msg.payload),
            Self::Headers(f) => f(&msg.headers),
            Self::Message(f) => f(msg),
        }
    }
}

impl<R> Clone for Callback<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Payload(f) => Self::Payload(Arc::clone(f)),
            Self::Headers(f) => Self::Headers(Arc::clone(f)),
            Self::Message(f) => Self::Message(Arc::clone(f)),
        }
    }
}

impl<R> fmt::Debug for Callback<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Self::Payload(_) => "payload",
            Self::Headers(_) => "headers",
            Self::Message(_) => "message",
        };
        write!(f, "Callback<{shape}>")
    }
}

/// Transformer capability: produces the replacement payload.
pub type TransformFn = Callback<Value>;

/// Filter capability: accepts or rejects the message.
pub type FilterFn = Callback<bool>;

/// Service-activator capability: `Some(payload)` forwards a reply,
/// `None` absorbs the message.
pub type HandleFn = Callback<Option<Value>>;

/// Error type router callbacks may fail with during evaluation.
pub type RouteEvalError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Router capability: evaluates the routing value for one message.
///
/// The produced [`Value`] is interpreted by the router's rule: a lookup key
/// for map/branch rules, or a destination channel name (string) /
/// recipient list (array of strings) / `null` (no destination) for dynamic
/// rules. Evaluation failures surface as
/// [`RoutingError`](crate::router::RoutingError).
pub type RouteFn = Callback<Result<Value, RouteEvalError>>;

/// The processing logic carried by an endpoint, one variant per kind.
#[derive(Clone, Debug)]
pub enum EndpointLogic {
    Transform(TransformFn),
    Filter(FilterFn),
    Handle(HandleFn),
    Route(RouterRule),
}

impl EndpointLogic {
    /// Returns the endpoint kind this logic belongs to.
    #[must_use]
    pub fn kind(&self) -> EndpointKind {
        match self {
            Self::Transform(_) => EndpointKind::Transform,
            Self::Filter(_) => EndpointKind::Filter,
            Self::Handle(_) => EndpointKind::Handle,
            Self::Route(_) => EndpointKind::Route,
        }
    }
}

/// Declaration-time attributes of an endpoint.
///
/// All fields are optional; unset channels are resolved by the chaining
/// rules during flow compilation. `link_to_next` defaults to `true` and can
/// be cleared to break the automatic declaration-order chain.
///
/// # Examples
///
/// ```
/// use integraph::endpoint::EndpointConfig;
///
/// let cfg = EndpointConfig::new()
///     .name("enrich")
///     .input_channel("orders")
///     .link_to_next(false);
/// ```
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub(crate) name: Option<String>,
    pub(crate) input_channel: Option<ChannelName>,
    pub(crate) output_channel: Option<ChannelName>,
    pub(crate) link_to_next: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            name: None,
            input_channel: None,
            output_channel: None,
            link_to_next: true,
        }
    }
}

impl EndpointConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit endpoint name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the explicit input channel.
    #[must_use]
    pub fn input_channel(mut self, channel: impl Into<ChannelName>) -> Self {
        self.input_channel = Some(channel.into());
        self
    }

    /// Sets the explicit output channel.
    #[must_use]
    pub fn output_channel(mut self, channel: impl Into<ChannelName>) -> Self {
        self.output_channel = Some(channel.into());
        self
    }

    /// Controls whether the next sibling inherits this endpoint's output
    /// channel. Clearing it breaks the declaration-order chain; the next
    /// sibling must then name its input channel explicitly.
    #[must_use]
    pub fn link_to_next(mut self, link: bool) -> Self {
        self.link_to_next = link;
        self
    }
}

/// A single resolved processing step inside a compiled flow.
///
/// Nodes are constructed by flow compilation with both channels resolved;
/// once part of a flow they are immutable.
#[derive(Clone, Debug)]
pub struct EndpointNode {
    name: String,
    input_channel: ChannelName,
    output_channel: ChannelName,
    logic: EndpointLogic,
}

impl EndpointNode {
    pub(crate) fn new(
        name: String,
        input_channel: ChannelName,
        output_channel: ChannelName,
        logic: EndpointLogic,
    ) -> Self {
        Self {
            name,
            input_channel,
            output_channel,
            logic,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> EndpointKind {
        self.logic.kind()
    }

    #[must_use]
    pub fn input_channel(&self) -> &ChannelName {
        &self.input_channel
    }

    #[must_use]
    pub fn output_channel(&self) -> &ChannelName {
        &self.output_channel
    }

    #[must_use]
    pub fn logic(&self) -> &EndpointLogic {
        &self.logic
    }

    /// Processes one message, returning the outgoing `(channel, message)`
    /// pairs. An empty result means the message was absorbed (rejected by a
    /// filter, swallowed by a terminal handler, or routed nowhere).
    ///
    /// Routing evaluation failures are returned, never swallowed; a defined
    /// "no destination" outcome is an `Ok` with no deliveries.
    pub fn process(
        &self,
        msg: &FlowMessage,
    ) -> Result<Vec<(ChannelName, FlowMessage)>, RoutingError> {
        match &self.logic {
            EndpointLogic::Transform(f) => {
                let replaced = msg.with_payload(f.invoke(msg));
                Ok(vec![(self.output_channel.clone(), replaced)])
            }
            EndpointLogic::Filter(f) => {
                if f.invoke(msg) {
                    Ok(vec![(self.output_channel.clone(), msg.clone())])
                } else {
                    tracing::debug!(endpoint = %self.name, "filter rejected message");
                    Ok(vec![])
                }
            }
            EndpointLogic::Handle(f) => match f.invoke(msg) {
                Some(payload) => Ok(vec![(self.output_channel.clone(), msg.with_payload(payload))]),
                None => Ok(vec![]),
            },
            EndpointLogic::Route(rule) => {
                let destinations = rule.resolve(&self.name, msg)?;
                Ok(destinations
                    .into_iter()
                    .map(|ch| (ch, msg.clone()))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transform_node() -> EndpointNode {
        EndpointNode::new(
            "t".into(),
            ChannelName::from("in"),
            ChannelName::from("out"),
            EndpointLogic::Transform(Callback::payload(|p| {
                json!(p.as_str().unwrap_or_default().to_uppercase())
            })),
        )
    }

    #[test]
    fn callback_shapes_extract_the_declared_view() {
        let msg = FlowMessage::new(json!("x")).with_header("h", json!(3));
        let by_payload: Callback<Value> = Callback::payload(|p| p.clone());
        let by_headers: Callback<Value> =
            Callback::headers(|h| h.get("h").cloned().unwrap_or(Value::Null));
        let by_message: Callback<Value> = Callback::message(|m| m.payload.clone());
        assert_eq!(by_payload.invoke(&msg), json!("x"));
        assert_eq!(by_headers.invoke(&msg), json!(3));
        assert_eq!(by_message.invoke(&msg), json!("x"));
    }

    #[test]
    fn transform_replaces_payload_and_keeps_headers() {
        let node = transform_node();
        let msg = FlowMessage::new(json!("hello")).with_header("id", json!(1));
        let out = node.process(&msg).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0.as_str(), "out");
        assert_eq!(out[0].1.payload, json!("HELLO"));
        assert_eq!(out[0].1.header("id"), Some(&json!(1)));
    }

    #[test]
    fn filter_absorbs_rejected_messages() {
        let node = EndpointNode::new(
            "f".into(),
            ChannelName::from("in"),
            ChannelName::from("out"),
            EndpointLogic::Filter(Callback::payload(|p| p == &json!("keep"))),
        );
        assert_eq!(node.process(&FlowMessage::new(json!("keep"))).unwrap().len(), 1);
        assert!(node.process(&FlowMessage::new(json!("drop"))).unwrap().is_empty());
    }

    #[test]
    fn handle_none_absorbs() {
        let node = EndpointNode::new(
            "h".into(),
            ChannelName::from("in"),
            ChannelName::from("out"),
            EndpointLogic::Handle(Callback::payload(|_| None)),
        );
        assert!(node.process(&FlowMessage::new(json!(1))).unwrap().is_empty());
    }

    #[test]
    fn config_defaults_link_to_next() {
        let cfg = EndpointConfig::new();
        assert!(cfg.link_to_next);
        assert!(cfg.name.is_none());
        let cfg = cfg.link_to_next(false);
        assert!(!cfg.link_to_next);
    }
}
