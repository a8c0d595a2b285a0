//! Fluent declaration API for message flows.
//!
//! `FlowBuilder` accumulates child declarations in order; all channel
//! resolution, chaining, and validation happens in
//! [`build`](FlowBuilder::build) (see the `compilation` module).

use crate::endpoint::{EndpointConfig, EndpointLogic, FilterFn, HandleFn, TransformFn};
use crate::router::RouterBuilder;
use crate::types::ChannelName;
use crate::utils::IdGenerator;

use super::MessageFlow;

/// A child declaration as written, before channel resolution.
#[derive(Clone, Debug)]
pub(crate) enum ChildDecl {
    Endpoint {
        config: EndpointConfig,
        logic: EndpointLogic,
    },
    Router {
        config: EndpointConfig,
        router: RouterBuilder,
    },
    Flow(MessageFlow),
    Splice {
        name: String,
        input: ChannelName,
        output: ChannelName,
    },
}

/// Builder for [`MessageFlow`] with a fluent, declaration-order API.
///
/// Each declaration appends one child; siblings are linked in declaration
/// order unless an [`EndpointConfig`] overrides the wiring. Composition is
/// synchronous and single-threaded; the builder holds no shared state.
///
/// # Examples
///
/// ```
/// use integraph::endpoint::{Callback, EndpointConfig};
/// use integraph::flows::FlowBuilder;
/// use serde_json::json;
///
/// let flow = FlowBuilder::named("orders")
///     .transform(Callback::payload(|p| json!(p.as_str().unwrap_or_default().trim())))
///     .handle_with(
///         EndpointConfig::new().name("archive"),
///         Callback::payload(|p| Some(p.clone())),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(flow.endpoints()[1].name(), "archive");
/// ```
#[derive(Clone, Debug)]
pub struct FlowBuilder {
    pub(crate) name: String,
    pub(crate) input_channel: Option<ChannelName>,
    pub(crate) output_channel: Option<ChannelName>,
    pub(crate) decls: Vec<ChildDecl>,
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowBuilder {
    /// Creates an anonymous flow. The generated name is assigned here so
    /// channel derivations stay stable for the life of the flow.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: IdGenerator::new().next_flow_name(),
            input_channel: None,
            output_channel: None,
            decls: Vec::new(),
        }
    }

    /// Creates a named flow; channels derive from this name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_channel: None,
            output_channel: None,
            decls: Vec::new(),
        }
    }

    /// Declares the flow's input channel explicitly (e.g. to receive from
    /// another flow by a shared name).
    #[must_use]
    pub fn input_channel(mut self, channel: impl Into<ChannelName>) -> Self {
        self.input_channel = Some(channel.into());
        self
    }

    /// Declares the flow's output channel explicitly.
    #[must_use]
    pub fn output_channel(mut self, channel: impl Into<ChannelName>) -> Self {
        self.output_channel = Some(channel.into());
        self
    }

    /// Appends a transformer with default configuration.
    #[must_use]
    pub fn transform(self, logic: TransformFn) -> Self {
        self.transform_with(EndpointConfig::new(), logic)
    }

    /// Appends a transformer with explicit configuration.
    #[must_use]
    pub fn transform_with(mut self, config: EndpointConfig, logic: TransformFn) -> Self {
        self.decls.push(ChildDecl::Endpoint {
            config,
            logic: EndpointLogic::Transform(logic),
        });
        self
    }

    /// Appends a filter with default configuration.
    #[must_use]
    pub fn filter(self, logic: FilterFn) -> Self {
        self.filter_with(EndpointConfig::new(), logic)
    }

    /// Appends a filter with explicit configuration.
    #[must_use]
    pub fn filter_with(mut self, config: EndpointConfig, logic: FilterFn) -> Self {
        self.decls.push(ChildDecl::Endpoint {
            config,
            logic: EndpointLogic::Filter(logic),
        });
        self
    }

    /// Appends a service activator with default configuration.
    #[must_use]
    pub fn handle(self, logic: HandleFn) -> Self {
        self.handle_with(EndpointConfig::new(), logic)
    }

    /// Appends a service activator with explicit configuration.
    #[must_use]
    pub fn handle_with(mut self, config: EndpointConfig, logic: HandleFn) -> Self {
        self.decls.push(ChildDecl::Endpoint {
            config,
            logic: EndpointLogic::Handle(logic),
        });
        self
    }

    /// Appends a router with default configuration.
    ///
    /// Branch flows declared on the router are registered with this flow
    /// when it compiles; their input channels become the branch
    /// destinations.
    #[must_use]
    pub fn route(self, router: RouterBuilder) -> Self {
        self.route_with(EndpointConfig::new(), router)
    }

    /// Appends a router with explicit configuration.
    #[must_use]
    pub fn route_with(mut self, config: EndpointConfig, router: RouterBuilder) -> Self {
        self.decls.push(ChildDecl::Router { config, router });
        self
    }

    /// Appends a nested flow, spliced as a single composite node: its first
    /// input is the composite's input, its last output the composite's
    /// output.
    #[must_use]
    pub fn message_flow(mut self, flow: MessageFlow) -> Self {
        self.decls.push(ChildDecl::Flow(flow));
        self
    }

    /// Splices a previously built flow as a single step by its channel
    /// endpoints. Unlike [`message_flow`](Self::message_flow) the flow is
    /// not owned here; register it with the same integration context so
    /// its endpoints receive traffic.
    #[must_use]
    pub fn exec(mut self, flow: &MessageFlow) -> Self {
        self.decls.push(ChildDecl::Splice {
            name: flow.name().to_string(),
            input: flow.input_channel().clone(),
            output: flow.output_channel().clone(),
        });
        self
    }
}
