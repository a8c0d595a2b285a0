//! Property tests over flow composition.

mod common;

use integraph::endpoint::EndpointConfig;
use integraph::flows::FlowBuilder;
use proptest::prelude::*;

proptest! {
    // However many siblings are declared, each consumes exactly the
    // channel its predecessor produces to.
    #[test]
    fn chained_siblings_always_share_channels(n in 1usize..8) {
        let mut builder = FlowBuilder::named("p");
        for _ in 0..n {
            builder = builder.transform(common::uppercase());
        }
        let flow = builder.build().unwrap();
        let nodes = flow.endpoints();
        prop_assert_eq!(nodes.len(), n);
        for pair in nodes.windows(2) {
            prop_assert_eq!(pair[0].output_channel(), pair[1].input_channel());
        }
        prop_assert_eq!(flow.input_channel().as_str(), "p.inputChannel");
    }

    // Channel derivation only depends on flow and endpoint names, so
    // building the same declarations twice yields identical wiring.
    #[test]
    fn composition_is_deterministic(name in "[a-z]{1,12}") {
        let build = || {
            FlowBuilder::named(name.clone())
                .transform_with(EndpointConfig::new().name("step"), common::uppercase())
                .handle(common::reply_identity())
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();
        prop_assert_eq!(a.input_channel(), b.input_channel());
        prop_assert_eq!(a.output_channel(), b.output_channel());
        let (na, nb) = (a.endpoints(), b.endpoints());
        for (x, y) in na.iter().zip(nb.iter()) {
            prop_assert_eq!(x.name(), y.name());
            prop_assert_eq!(x.input_channel(), y.input_channel());
            prop_assert_eq!(x.output_channel(), y.output_channel());
        }
    }
}
