//! Message delivery runtimes.
//!
//! Dispatch is decoupled from composition behind [`DeliveryRuntime`]: the
//! context hands the runtime a compiled topology, an entry channel, and a
//! message, and the runtime drives deliveries until no traffic remains.
//! Callers must not assume synchronous delivery; the trait is async and a
//! runtime is free to interleave or defer individual hops.
//!
//! [`InProcessRuntime`] is the default: a breadth-first, in-memory walker
//! that processes one delivery per hop and yields to the executor between
//! hops.

use std::collections::VecDeque;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::context::FlowTopology;
use crate::message::FlowMessage;
use crate::router::RoutingError;
use crate::types::ChannelName;

/// Errors raised while dispatching a message.
#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    /// The named flow is not registered with the context.
    #[error("unknown flow '{name}'")]
    #[diagnostic(
        code(integraph::dispatch::unknown_flow),
        help("Flows are addressed by the name they were composed under.")
    )]
    UnknownFlow { name: String },

    /// The entry channel does not belong to the composed topology.
    #[error("channel '{channel}' is not part of the composed topology")]
    #[diagnostic(code(integraph::dispatch::unknown_channel))]
    UnknownChannel { channel: ChannelName },

    /// A router failed while resolving a destination.
    #[error(transparent)]
    #[diagnostic(code(integraph::dispatch::routing))]
    Routing(#[from] RoutingError),

    /// The hop budget ran out before traffic drained.
    #[error("delivery budget of {limit} hops exhausted")]
    #[diagnostic(
        code(integraph::dispatch::delivery_limit),
        help("A channel cycle is the usual cause; check router destinations.")
    )]
    DeliveryLimitExceeded { limit: usize },
}

/// Delivers messages across a compiled topology.
///
/// `reply_channel`, when given, asks the runtime to capture the first
/// message that arrives on that channel and return it once traffic drains.
/// `Ok(None)` means the message was absorbed before reaching it.
#[async_trait]
pub trait DeliveryRuntime: Send + Sync {
    async fn dispatch(
        &self,
        topology: &FlowTopology,
        channel: &ChannelName,
        message: FlowMessage,
        reply_channel: Option<&ChannelName>,
    ) -> Result<Option<FlowMessage>, DispatchError>;
}

/// Default in-memory runtime: breadth-first delivery over a work queue.
///
/// Each hop takes one `(channel, message)` pair off the queue, hands the
/// message to every subscriber of that channel, and enqueues whatever they
/// produce. The hop budget bounds total deliveries per dispatch so channel
/// cycles fail instead of spinning.
#[derive(Clone, Debug)]
pub struct InProcessRuntime {
    hop_budget: usize,
}

impl InProcessRuntime {
    const DEFAULT_HOP_BUDGET: usize = 10_000;

    #[must_use]
    pub fn new() -> Self {
        Self {
            hop_budget: Self::DEFAULT_HOP_BUDGET,
        }
    }

    /// Overrides the per-dispatch hop budget.
    #[must_use]
    pub fn with_hop_budget(hop_budget: usize) -> Self {
        Self { hop_budget }
    }
}

impl Default for InProcessRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryRuntime for InProcessRuntime {
    async fn dispatch(
        &self,
        topology: &FlowTopology,
        channel: &ChannelName,
        message: FlowMessage,
        reply_channel: Option<&ChannelName>,
    ) -> Result<Option<FlowMessage>, DispatchError> {
        if !topology.is_known(channel) {
            return Err(DispatchError::UnknownChannel {
                channel: channel.clone(),
            });
        }

        let mut reply: Option<FlowMessage> = None;
        let mut queue: VecDeque<(ChannelName, FlowMessage)> = VecDeque::new();
        queue.push_back((channel.clone(), message));
        let mut hops = 0usize;

        while let Some((channel, message)) = queue.pop_front() {
            hops += 1;
            if hops > self.hop_budget {
                return Err(DispatchError::DeliveryLimitExceeded {
                    limit: self.hop_budget,
                });
            }

            if reply.is_none() && reply_channel == Some(&channel) {
                reply = Some(message.clone());
            }

            let subscribers = topology.subscribers(&channel);
            if subscribers.is_empty() {
                tracing::debug!(channel = %channel, "message at rest; no subscribers");
            }
            for node in subscribers {
                tracing::trace!(
                    endpoint = %node.name(),
                    kind = %node.kind().label(),
                    channel = %channel,
                    "delivering message"
                );
                queue.extend(node.process(&message)?);
            }

            tokio::task::yield_now().await;
        }

        Ok(reply)
    }
}
