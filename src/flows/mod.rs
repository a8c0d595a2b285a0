//! Flow graphs: ordered, auto-wired compositions of endpoints.
//!
//! The main entry point is [`FlowBuilder`], a fluent declaration API that
//! compiles into an immutable [`MessageFlow`]. Compilation resolves every
//! channel name, links siblings in declaration order, splices nested flows,
//! and validates the result; [`CompositionError`] lists the failure modes.
//!
//! # Quick Start
//!
//! ```
//! use integraph::endpoint::Callback;
//! use integraph::flows::FlowBuilder;
//! use serde_json::json;
//!
//! let flow = FlowBuilder::named("greet")
//!     .transform(Callback::payload(|p| {
//!         json!(p.as_str().unwrap_or_default().to_uppercase())
//!     }))
//!     .filter(Callback::payload(|p| p == &json!("HELLO")))
//!     .handle(Callback::payload(|p| Some(p.clone())))
//!     .build()
//!     .unwrap();
//!
//! // Channels are derived deterministically from the flow name.
//! assert_eq!(flow.input_channel().as_str(), "greet.inputChannel");
//! // Siblings are linked in declaration order.
//! let nodes = flow.endpoints();
//! assert_eq!(nodes[0].output_channel(), nodes[1].input_channel());
//! ```
//!
//! # Nesting
//!
//! A flow may contain another flow as a child. The nested flow splices as a
//! single composite node: its first input becomes the composite's input,
//! its last output the composite's output. Previously built flows can also
//! be spliced by reference with [`FlowBuilder::exec`], which records only
//! the splice point (the flow itself must be registered with the same
//! integration context to receive traffic).

mod builder;
mod compilation;

pub use builder::FlowBuilder;
pub use compilation::CompositionError;

use std::sync::Arc;

use crate::endpoint::EndpointNode;
use crate::types::ChannelName;

/// One child of a flow: an endpoint, a nested flow, or a splice point of a
/// flow built elsewhere.
#[derive(Clone, Debug)]
pub enum FlowChild {
    Endpoint(Arc<EndpointNode>),
    Flow(MessageFlow),
    /// Reference to a flow that lives outside this one; only the channel
    /// endpoints are recorded here.
    Splice {
        name: String,
        input: ChannelName,
        output: ChannelName,
    },
}

/// An ordered, auto-wired composition of endpoints and nested flows.
///
/// Built by [`FlowBuilder::build`]; topology (node order, channel wiring)
/// is immutable afterwards, only message traffic varies at dispatch time.
#[derive(Clone, Debug)]
pub struct MessageFlow {
    name: String,
    input_channel: ChannelName,
    output_channel: ChannelName,
    children: Vec<FlowChild>,
}

impl MessageFlow {
    pub(crate) fn from_parts(
        name: String,
        input_channel: ChannelName,
        output_channel: ChannelName,
        children: Vec<FlowChild>,
    ) -> Self {
        Self {
            name,
            input_channel,
            output_channel,
            children,
        }
    }

    /// The flow's name, explicit or generated.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The channel this flow consumes from.
    #[must_use]
    pub fn input_channel(&self) -> &ChannelName {
        &self.input_channel
    }

    /// The channel this flow's reply (if any) is produced to.
    #[must_use]
    pub fn output_channel(&self) -> &ChannelName {
        &self.output_channel
    }

    /// The ordered children of this flow.
    #[must_use]
    pub fn children(&self) -> &[FlowChild] {
        &self.children
    }

    /// Every endpoint node in this flow, in declaration order, descending
    /// into nested flows. Splice references contribute nothing (their
    /// endpoints belong to the referenced flow).
    #[must_use]
    pub fn endpoints(&self) -> Vec<&EndpointNode> {
        let mut out = Vec::new();
        self.collect_endpoints(&mut out);
        out
    }

    fn collect_endpoints<'a>(&'a self, out: &mut Vec<&'a EndpointNode>) {
        for child in &self.children {
            match child {
                FlowChild::Endpoint(node) => out.push(node.as_ref()),
                FlowChild::Flow(flow) => flow.collect_endpoints(out),
                FlowChild::Splice { .. } => {}
            }
        }
    }

    pub(crate) fn collect_endpoint_arcs(&self, out: &mut Vec<Arc<EndpointNode>>) {
        for child in &self.children {
            match child {
                FlowChild::Endpoint(node) => out.push(Arc::clone(node)),
                FlowChild::Flow(flow) => flow.collect_endpoint_arcs(out),
                FlowChild::Splice { .. } => {}
            }
        }
    }
}
