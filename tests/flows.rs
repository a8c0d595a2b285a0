//! Composition-time behavior: channel derivation, chaining, nesting,
//! splicing, and the failure modes of `FlowBuilder::build`.

mod common;

use common::{reply_identity, uppercase};
use integraph::endpoint::{Callback, EndpointConfig};
use integraph::flows::{CompositionError, FlowBuilder};

#[test]
fn channels_derive_from_flow_and_endpoint_names() {
    common::init_tracing();
    let flow = FlowBuilder::named("f").transform(uppercase()).build().unwrap();
    assert_eq!(flow.input_channel().as_str(), "f.inputChannel");
    assert_eq!(flow.output_channel().as_str(), "f.transform1.outputChannel");
}

#[test]
fn siblings_chain_in_declaration_order() {
    let flow = FlowBuilder::named("f")
        .transform(uppercase())
        .filter(Callback::payload(|_| true))
        .handle(reply_identity())
        .build()
        .unwrap();
    let nodes = flow.endpoints();
    assert_eq!(nodes.len(), 3);
    for pair in nodes.windows(2) {
        assert_eq!(pair[0].output_channel(), pair[1].input_channel());
    }
}

#[test]
fn anonymous_flows_get_stable_generated_names() {
    let flow = FlowBuilder::new().transform(uppercase()).build().unwrap();
    let name = flow.name().to_string();
    assert!(name.starts_with("flow"));
    assert_eq!(
        flow.input_channel().as_str(),
        format!("{name}.inputChannel")
    );
}

#[test]
fn two_anonymous_flows_never_share_a_name() {
    let a = FlowBuilder::new().transform(uppercase()).build().unwrap();
    let b = FlowBuilder::new().transform(uppercase()).build().unwrap();
    assert_ne!(a.name(), b.name());
}

#[test]
fn explicit_endpoint_names_feed_channel_derivation() {
    let flow = FlowBuilder::named("orders")
        .transform_with(EndpointConfig::new().name("enrich"), uppercase())
        .build()
        .unwrap();
    assert_eq!(
        flow.output_channel().as_str(),
        "orders.enrich.outputChannel"
    );
}

#[test]
fn nested_flow_splices_as_a_single_step() {
    let inner = FlowBuilder::named("inner").transform(uppercase()).build().unwrap();
    let outer = FlowBuilder::named("outer")
        .transform(Callback::payload(|p| p.clone()))
        .message_flow(inner)
        .handle(reply_identity())
        .build()
        .unwrap();
    let nodes = outer.endpoints();
    assert_eq!(nodes.len(), 3);
    // The previous sibling's auto output is rewritten to the nested input.
    assert_eq!(nodes[0].output_channel().as_str(), "inner.inputChannel");
    // The next sibling consumes the nested flow's output.
    assert_eq!(
        nodes[2].input_channel().as_str(),
        "inner.transform1.outputChannel"
    );
}

#[test]
fn sole_nested_flow_exposes_its_channels() {
    let inner = FlowBuilder::named("core").transform(uppercase()).build().unwrap();
    let outer = FlowBuilder::named("wrap").message_flow(inner).build().unwrap();
    assert_eq!(outer.input_channel().as_str(), "core.inputChannel");
    assert_eq!(
        outer.output_channel().as_str(),
        "core.transform1.outputChannel"
    );
}

#[test]
fn exec_splices_by_reference_without_owning_endpoints() {
    let shared = FlowBuilder::named("shared").transform(uppercase()).build().unwrap();
    let outer = FlowBuilder::named("outer")
        .transform(Callback::payload(|p| p.clone()))
        .exec(&shared)
        .build()
        .unwrap();
    assert_eq!(outer.output_channel(), shared.output_channel());
    let nodes = outer.endpoints();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].output_channel(), shared.input_channel());
}

#[test]
fn broken_chain_with_explicit_input_compiles() {
    let flow = FlowBuilder::named("f")
        .transform_with(EndpointConfig::new().link_to_next(false), uppercase())
        .handle_with(
            EndpointConfig::new().input_channel("sideChannel"),
            reply_identity(),
        )
        .build()
        .unwrap();
    let nodes = flow.endpoints();
    assert_ne!(nodes[0].output_channel(), nodes[1].input_channel());
    assert_eq!(nodes[1].input_channel().as_str(), "sideChannel");
}

#[test]
fn broken_chain_without_explicit_input_fails() {
    let err = FlowBuilder::named("f")
        .transform_with(EndpointConfig::new().link_to_next(false), uppercase())
        .handle(reply_identity())
        .build()
        .unwrap_err();
    assert!(matches!(err, CompositionError::MissingInputChannel { .. }));
}

#[test]
fn explicit_output_conflicting_with_nested_input_fails() {
    let inner = FlowBuilder::named("inner").transform(uppercase()).build().unwrap();
    let err = FlowBuilder::named("outer")
        .transform_with(EndpointConfig::new().output_channel("elsewhere"), uppercase())
        .message_flow(inner)
        .build()
        .unwrap_err();
    assert!(matches!(err, CompositionError::ChannelMismatch { .. }));
}

#[test]
fn flow_input_conflicting_with_first_endpoint_input_fails() {
    let err = FlowBuilder::named("f")
        .input_channel("declared")
        .transform_with(EndpointConfig::new().input_channel("other"), uppercase())
        .build()
        .unwrap_err();
    assert!(matches!(err, CompositionError::ChannelMismatch { .. }));
}

#[test]
fn flow_level_channels_override_the_derived_names() {
    let flow = FlowBuilder::named("f")
        .input_channel("requests")
        .output_channel("replies")
        .transform(uppercase())
        .build()
        .unwrap();
    assert_eq!(flow.input_channel().as_str(), "requests");
    assert_eq!(flow.output_channel().as_str(), "replies");
    let nodes = flow.endpoints();
    assert_eq!(nodes[0].input_channel().as_str(), "requests");
    assert_eq!(nodes[0].output_channel().as_str(), "replies");
}
