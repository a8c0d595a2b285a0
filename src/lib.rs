//! Declarative message-flow composition.
//!
//! integraph builds integration-style message pipelines from fluent
//! declarations: transformers, filters, routers, and service activators
//! wired over named channels. Channels resolve deterministically at build
//! time: siblings chain in declaration order, anonymous channels get
//! stable derived names, and explicit names connect flows to each other.
//! Dispatch is asynchronous and pluggable behind a runtime trait.
//!
//! # Quick Start
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
//!         FlowBuilder::named("greet")
//!             .transform(Callback::payload(|p| {
//!                 json!(p.as_str().unwrap_or_default().to_uppercase())
//!             }))
//!             .filter(Callback::payload(|p| p == &json!("HELLO")))
//!             .handle(Callback::payload(|p| Some(p.clone()))),
//!     )
//! })?;
//!
//! assert_eq!(
//!     ctx.send_and_receive("greet", json!("hello")).await?,
//!     Some(json!("HELLO"))
//! );
//! // Filtered out: absorbed, not an error.
//! assert_eq!(ctx.send_and_receive("greet", json!("bye")).await?, None);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Map
//!
//! - [`types`]: channel names, roles, endpoint kinds
//! - [`message`]: the message structure travelling through flows
//! - [`channels`]: deterministic channel naming and the registry
//! - [`endpoint`]: endpoint nodes and their processing callbacks
//! - [`router`]: routing rules and per-message resolution
//! - [`flows`]: the flow builder and compiled flows
//! - [`context`]: composition sessions and the integration context
//! - [`runtime`]: message delivery runtimes

pub mod channels;
pub mod context;
pub mod endpoint;
pub mod flows;
pub mod message;
pub mod router;
pub mod runtime;
pub mod types;
pub mod utils;
