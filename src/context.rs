//! Composition sessions and the integration context.
//!
//! [`Composer`] collects flows during a composition session, failing fast
//! on duplicate flow names. [`IntegrationContext`] is the sealed result:
//! the registered flows, a channel→subscriber [`FlowTopology`], and the
//! [`DeliveryRuntime`] that moves messages. Topology is fixed once the
//! context exists; only message traffic varies afterwards.
//!
//! # Examples
//!
//! ```
//! use integraph::context::IntegrationContext;
//! use integraph::endpoint::Callback;
//! use integraph::flows::FlowBuilder;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> miette::Result<()> {
//! let ctx = IntegrationContext::compose(|c| {
//!     c.message_flow(
//!         FlowBuilder::named("shout")
//!             .transform(Callback::payload(|p| {
//!                 json!(p.as_str().unwrap_or_default().to_uppercase())
//!             }))
//!             .handle(Callback::payload(|p| Some(p.clone()))),
//!     )
//! })?;
//!
//! let reply = ctx.send_and_receive("shout", json!("hi")).await?;
//! assert_eq!(reply, Some(json!("HI")));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use crate::endpoint::{EndpointLogic, EndpointNode};
use crate::flows::{CompositionError, FlowBuilder, MessageFlow};
use crate::message::FlowMessage;
use crate::router::RouterRule;
use crate::runtime::{DeliveryRuntime, DispatchError, InProcessRuntime};
use crate::types::ChannelName;

/// Channel→subscriber index over every flow registered with a context.
///
/// `known` holds every channel the composition can name statically: flow
/// inputs and outputs, endpoint inputs and outputs, and the static
/// destinations of map and branch routers. Dynamic router destinations are
/// only known per message and are not indexed.
#[derive(Clone, Debug, Default)]
pub struct FlowTopology {
    subscribers: FxHashMap<ChannelName, Vec<Arc<EndpointNode>>>,
    known: FxHashSet<ChannelName>,
}

impl FlowTopology {
    pub(crate) fn from_flows(flows: &[Arc<MessageFlow>]) -> Self {
        let mut topology = Self::default();
        for flow in flows {
            topology.known.insert(flow.input_channel().clone());
            topology.known.insert(flow.output_channel().clone());
            let mut nodes = Vec::new();
            flow.collect_endpoint_arcs(&mut nodes);
            for node in nodes {
                topology.known.insert(node.input_channel().clone());
                topology.known.insert(node.output_channel().clone());
                if let EndpointLogic::Route(rule) = node.logic() {
                    topology.note_rule_destinations(rule);
                }
                topology
                    .subscribers
                    .entry(node.input_channel().clone())
                    .or_default()
                    .push(node);
            }
        }
        topology
    }

    fn note_rule_destinations(&mut self, rule: &RouterRule) {
        match rule {
            RouterRule::Dynamic { .. } => {}
            RouterRule::ChannelMap { map, otherwise, .. } => {
                self.known.extend(map.values().cloned());
                self.known.extend(otherwise.iter().cloned());
            }
            RouterRule::Branches {
                branches,
                otherwise,
                ..
            } => {
                self.known
                    .extend(branches.iter().map(|b| b.channel.clone()));
                self.known.extend(otherwise.iter().cloned());
            }
        }
    }

    /// Endpoints subscribed to a channel, in registration order.
    #[must_use]
    pub fn subscribers(&self, channel: &ChannelName) -> &[Arc<EndpointNode>] {
        self.subscribers
            .get(channel)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the channel appears anywhere in the composed topology.
    #[must_use]
    pub fn is_known(&self, channel: &ChannelName) -> bool {
        self.known.contains(channel)
    }

    /// Every statically known channel, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelName> {
        self.known.iter()
    }
}

/// A composition session: accumulates flows before the context is sealed.
#[derive(Default)]
pub struct Composer {
    flows: Vec<MessageFlow>,
    names: FxHashSet<String>,
}

impl Composer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the flow and registers it with this session.
    ///
    /// # Errors
    ///
    /// Any [`CompositionError`] from [`FlowBuilder::build`], or
    /// [`CompositionError::DuplicateFlowName`] when the name is taken.
    pub fn message_flow(&mut self, builder: FlowBuilder) -> Result<(), CompositionError> {
        self.register(builder.build()?)
    }

    /// Registers a previously built flow with this session.
    pub fn register(&mut self, flow: MessageFlow) -> Result<(), CompositionError> {
        if !self.names.insert(flow.name().to_string()) {
            return Err(CompositionError::DuplicateFlowName {
                name: flow.name().to_string(),
            });
        }
        self.flows.push(flow);
        Ok(())
    }
}

/// The sealed result of a composition session.
///
/// Holds the registered flows, the channel topology spanning them, and the
/// runtime that delivers messages. Flows registered in the same context
/// share a channel namespace, so explicitly named channels connect flows
/// to each other.
#[derive(Clone)]
pub struct IntegrationContext {
    flows: Vec<Arc<MessageFlow>>,
    index: FxHashMap<String, usize>,
    topology: FlowTopology,
    runtime: Arc<dyn DeliveryRuntime>,
}

impl fmt::Debug for IntegrationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationContext")
            .field(
                "flows",
                &self.flows.iter().map(|fl| fl.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl IntegrationContext {
    /// Runs a composition session and seals the result.
    ///
    /// # Errors
    ///
    /// Fails fast on the first [`CompositionError`]; no partially composed
    /// context escapes.
    pub fn compose<F>(session: F) -> Result<Self, CompositionError>
    where
        F: FnOnce(&mut Composer) -> Result<(), CompositionError>,
    {
        let mut composer = Composer::new();
        session(&mut composer)?;
        Self::from_flows(composer.flows)
    }

    /// Seals a context from already-built flows.
    pub fn from_flows(
        flows: impl IntoIterator<Item = MessageFlow>,
    ) -> Result<Self, CompositionError> {
        let flows: Vec<Arc<MessageFlow>> = flows.into_iter().map(Arc::new).collect();
        let mut index = FxHashMap::default();
        for (i, flow) in flows.iter().enumerate() {
            if index.insert(flow.name().to_string(), i).is_some() {
                return Err(CompositionError::DuplicateFlowName {
                    name: flow.name().to_string(),
                });
            }
        }
        let topology = FlowTopology::from_flows(&flows);
        tracing::debug!(
            flows = flows.len(),
            channels = topology.known.len(),
            "integration context sealed"
        );
        Ok(Self {
            flows,
            index,
            topology,
            runtime: Arc::new(InProcessRuntime::new()),
        })
    }

    /// Replaces the delivery runtime.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn DeliveryRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Looks up a registered flow by name.
    #[must_use]
    pub fn flow(&self, name: &str) -> Option<&MessageFlow> {
        self.index.get(name).map(|&i| self.flows[i].as_ref())
    }

    /// The registered flows, in registration order.
    pub fn flows(&self) -> impl Iterator<Item = &MessageFlow> {
        self.flows.iter().map(Arc::as_ref)
    }

    #[must_use]
    pub fn topology(&self) -> &FlowTopology {
        &self.topology
    }

    /// Sends a bare payload into the named flow, fire-and-forget.
    ///
    /// The payload is wrapped in a [`FlowMessage`] with empty headers;
    /// `send(flow, p)` and `send_message(flow, FlowMessage::new(p))` are
    /// equivalent.
    pub async fn send(
        &self,
        flow: &str,
        payload: impl Into<Value>,
    ) -> Result<(), DispatchError> {
        self.send_message(flow, FlowMessage::new(payload)).await
    }

    /// Sends a full message into the named flow, fire-and-forget.
    pub async fn send_message(
        &self,
        flow: &str,
        message: FlowMessage,
    ) -> Result<(), DispatchError> {
        let flow = self.lookup(flow)?;
        tracing::debug!(flow = %flow.name(), "send");
        self.runtime
            .dispatch(&self.topology, flow.input_channel(), message, None)
            .await
            .map(|_| ())
    }

    /// Sends a bare payload and waits for the reply payload.
    ///
    /// `Ok(None)` means the message was absorbed before reaching the flow's
    /// output channel (rejected by a filter, swallowed by a handler, or
    /// routed to no destination).
    pub async fn send_and_receive(
        &self,
        flow: &str,
        payload: impl Into<Value>,
    ) -> Result<Option<Value>, DispatchError> {
        Ok(self
            .send_and_receive_message(flow, FlowMessage::new(payload))
            .await?
            .map(|m| m.payload))
    }

    /// Sends a full message and waits for the reply message.
    pub async fn send_and_receive_message(
        &self,
        flow: &str,
        message: FlowMessage,
    ) -> Result<Option<FlowMessage>, DispatchError> {
        let flow = self.lookup(flow)?;
        tracing::debug!(flow = %flow.name(), "send_and_receive");
        self.runtime
            .dispatch(
                &self.topology,
                flow.input_channel(),
                message,
                Some(flow.output_channel()),
            )
            .await
    }

    fn lookup(&self, name: &str) -> Result<&MessageFlow, DispatchError> {
        self.flow(name).ok_or_else(|| DispatchError::UnknownFlow {
            name: name.to_string(),
        })
    }
}
