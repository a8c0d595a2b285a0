//! Router rules and the per-message resolution engine.
//!
//! A router is an endpoint whose destination is computed per message from a
//! *rule*. The rule is fully resolved during composition; only its
//! evaluation happens at dispatch time. Three rule shapes exist:
//!
//! - [`RouterRule::Dynamic`]: the callback itself names the destination:
//!   a single channel name, a recipient list (array of names), or `null`
//!   for "no destination".
//! - [`RouterRule::ChannelMap`]: the callback produces a lookup key that is
//!   matched against a static value→channel map.
//! - [`RouterRule::Branches`]: `when`/`otherwise` branch sets; each branch
//!   holds a nested flow and the discriminant is matched against branch
//!   labels by exact string equality.
//!
//! A message that matches nothing and has no `otherwise` simply has no
//! destination; that is a defined outcome, not an error. A callback that
//! *fails* during evaluation is a [`RoutingError`] and is surfaced to the
//! dispatch caller, never swallowed.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::endpoint::{RouteEvalError, RouteFn};
use crate::flows::MessageFlow;
use crate::message::FlowMessage;
use crate::types::ChannelName;

/// Errors raised while resolving a route at dispatch time.
#[derive(Debug, Error, Diagnostic)]
pub enum RoutingError {
    /// The discriminant or key-extraction callback failed.
    #[error("route evaluation failed in router '{router}'")]
    #[diagnostic(
        code(integraph::router::evaluation),
        help("The router's discriminant/key callback returned an error; inspect the source.")
    )]
    Evaluation {
        router: String,
        #[source]
        source: RouteEvalError,
    },

    /// A dynamic rule produced something that is not a channel name,
    /// a list of channel names, or null.
    #[error("router '{router}' produced a non-channel destination: {value}")]
    #[diagnostic(
        code(integraph::router::invalid_destination),
        help("Dynamic route callbacks must return a string, an array of strings, or null.")
    )]
    InvalidDestination { router: String, value: Value },
}

/// One `when` branch of a branch-set router, compiled to its destination.
#[derive(Clone, Debug)]
pub struct RouterBranch {
    pub label: String,
    pub channel: ChannelName,
}

/// A compiled routing rule, evaluated once per message.
#[derive(Clone, Debug)]
pub enum RouterRule {
    /// The callback names the destination(s) directly.
    Dynamic { eval: RouteFn },
    /// Static value→channel dispatch on an extracted key.
    ChannelMap {
        key: RouteFn,
        map: FxHashMap<String, ChannelName>,
        otherwise: Option<ChannelName>,
    },
    /// `when`/`otherwise` branch set.
    Branches {
        discriminant: RouteFn,
        branches: Vec<RouterBranch>,
        otherwise: Option<ChannelName>,
    },
}

impl RouterRule {
    /// Resolves the destination channels for one message.
    ///
    /// Returns zero, one, or many channel names. Zero destinations means
    /// the message is dropped by this router (logged, not an error).
    pub fn resolve(
        &self,
        router: &str,
        msg: &FlowMessage,
    ) -> Result<Vec<ChannelName>, RoutingError> {
        match self {
            RouterRule::ChannelMap {
                key,
                map,
                otherwise,
            } => {
                let value = Self::eval(router, key, msg)?;
                let hit = value.as_str().and_then(|k| map.get(k));
                Ok(Self::fallback(router, hit, otherwise.as_ref()))
            }
            RouterRule::Branches {
                discriminant,
                branches,
                otherwise,
            } => {
                let value = Self::eval(router, discriminant, msg)?;
                let hit = value.as_str().and_then(|label| {
                    branches
                        .iter()
                        .find(|b| b.label == label)
                        .map(|b| &b.channel)
                });
                Ok(Self::fallback(router, hit, otherwise.as_ref()))
            }
            RouterRule::Dynamic { eval } => {
                let value = Self::eval(router, eval, msg)?;
                match value {
                    Value::Null => {
                        tracing::debug!(router, "dynamic route yielded no destination");
                        Ok(vec![])
                    }
                    Value::String(name) => Ok(vec![ChannelName::from(name)]),
                    Value::Array(items) => {
                        let mut channels = Vec::with_capacity(items.len());
                        for item in items {
                            match item {
                                Value::String(name) => channels.push(ChannelName::from(name)),
                                other => {
                                    return Err(RoutingError::InvalidDestination {
                                        router: router.to_string(),
                                        value: other,
                                    });
                                }
                            }
                        }
                        Ok(channels)
                    }
                    other => Err(RoutingError::InvalidDestination {
                        router: router.to_string(),
                        value: other,
                    }),
                }
            }
        }
    }

    fn eval(router: &str, f: &RouteFn, msg: &FlowMessage) -> Result<Value, RoutingError> {
        f.invoke(msg).map_err(|source| RoutingError::Evaluation {
            router: router.to_string(),
            source,
        })
    }

    fn fallback(
        router: &str,
        hit: Option<&ChannelName>,
        otherwise: Option<&ChannelName>,
    ) -> Vec<ChannelName> {
        match hit.or(otherwise) {
            Some(channel) => vec![channel.clone()],
            None => {
                tracing::debug!(router, "no matching route and no otherwise; dropping");
                vec![]
            }
        }
    }
}

/// Declaration-time accumulator for a router.
///
/// Duplicate branch labels and repeated `otherwise` declarations are
/// detected when the enclosing flow compiles, failing the whole
/// composition.
///
/// # Examples
///
/// ```
/// use integraph::endpoint::Callback;
/// use integraph::flows::FlowBuilder;
/// use integraph::router::RouterBuilder;
/// use serde_json::json;
///
/// let by_kind = RouterBuilder::channel_map(
///     Callback::headers(|h| Ok(h.get("kind").cloned().unwrap_or(json!(null)))),
///     [("bar", "barChannel"), ("baz", "bazChannel")],
/// );
/// let flow = FlowBuilder::named("f").route(by_kind).build().unwrap();
/// assert_eq!(flow.input_channel().as_str(), "f.inputChannel");
/// ```
#[derive(Clone, Debug)]
pub struct RouterBuilder {
    pub(crate) mode: RouterMode,
}

#[derive(Clone, Debug)]
pub(crate) enum RouterMode {
    Dynamic {
        eval: RouteFn,
    },
    ChannelMap {
        key: RouteFn,
        entries: Vec<(String, ChannelName)>,
        otherwise: Option<ChannelName>,
    },
    Branches {
        discriminant: RouteFn,
        whens: Vec<(String, MessageFlow)>,
        otherwise: Vec<MessageFlow>,
    },
}

impl RouterBuilder {
    /// A rule whose callback names the destination(s) directly.
    #[must_use]
    pub fn dynamic(eval: RouteFn) -> Self {
        Self {
            mode: RouterMode::Dynamic { eval },
        }
    }

    /// A static value→channel map keyed by the extraction callback.
    #[must_use]
    pub fn channel_map<L, C>(key: RouteFn, entries: impl IntoIterator<Item = (L, C)>) -> Self
    where
        L: Into<String>,
        C: Into<ChannelName>,
    {
        Self {
            mode: RouterMode::ChannelMap {
                key,
                entries: entries
                    .into_iter()
                    .map(|(label, channel)| (label.into(), channel.into()))
                    .collect(),
                otherwise: None,
            },
        }
    }

    /// A `when`/`otherwise` branch set keyed by the discriminant callback.
    #[must_use]
    pub fn branches(discriminant: RouteFn) -> Self {
        Self {
            mode: RouterMode::Branches {
                discriminant,
                whens: Vec::new(),
                otherwise: Vec::new(),
            },
        }
    }

    /// Adds a labelled branch holding a nested flow.
    ///
    /// The nested flow's input channel becomes the branch destination and
    /// the flow itself is registered with the enclosing flow at compile
    /// time. Only valid on a [`branches`](Self::branches) router.
    #[must_use]
    pub fn when(mut self, label: impl Into<String>, flow: MessageFlow) -> Self {
        if let RouterMode::Branches { whens, .. } = &mut self.mode {
            whens.push((label.into(), flow));
        } else {
            tracing::warn!("when() ignored on a non-branch router");
        }
        self
    }

    /// Declares the default branch taken when no `when` label matches.
    ///
    /// At most one `otherwise` is allowed; a second declaration fails the
    /// composition. Only valid on a [`branches`](Self::branches) router.
    #[must_use]
    pub fn otherwise(mut self, flow: MessageFlow) -> Self {
        if let RouterMode::Branches { otherwise, .. } = &mut self.mode {
            otherwise.push(flow);
        } else {
            tracing::warn!("otherwise() ignored on a non-branch router");
        }
        self
    }

    /// Declares the fallback channel of a [`channel_map`](Self::channel_map)
    /// router, used when the extracted key matches no entry.
    #[must_use]
    pub fn otherwise_channel(mut self, channel: impl Into<ChannelName>) -> Self {
        if let RouterMode::ChannelMap { otherwise, .. } = &mut self.mode {
            *otherwise = Some(channel.into());
        } else {
            tracing::warn!("otherwise_channel() ignored on a non-map router");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Callback;
    use serde_json::json;

    fn key_on_header(header: &'static str) -> RouteFn {
        Callback::headers(move |h| Ok(h.get(header).cloned().unwrap_or(Value::Null)))
    }

    fn map_rule(otherwise: Option<&str>) -> RouterRule {
        let mut map = FxHashMap::default();
        map.insert("bar".to_string(), ChannelName::from("barChannel"));
        map.insert("baz".to_string(), ChannelName::from("bazChannel"));
        RouterRule::ChannelMap {
            key: key_on_header("foo"),
            map,
            otherwise: otherwise.map(ChannelName::from),
        }
    }

    #[test]
    fn channel_map_matches_header_key() {
        let rule = map_rule(None);
        let msg = FlowMessage::new(json!(1)).with_header("foo", json!("bar"));
        let dests = rule.resolve("r", &msg).unwrap();
        assert_eq!(dests, vec![ChannelName::from("barChannel")]);
    }

    #[test]
    fn channel_map_unmatched_key_drops_without_otherwise() {
        let rule = map_rule(None);
        let msg = FlowMessage::new(json!(1)).with_header("foo", json!("qux"));
        assert!(rule.resolve("r", &msg).unwrap().is_empty());
    }

    #[test]
    fn channel_map_unmatched_key_uses_otherwise() {
        let rule = map_rule(Some("fallback"));
        let msg = FlowMessage::new(json!(1)).with_header("foo", json!("qux"));
        assert_eq!(
            rule.resolve("r", &msg).unwrap(),
            vec![ChannelName::from("fallback")]
        );
    }

    #[test]
    fn branches_match_by_exact_label_equality() {
        let rule = RouterRule::Branches {
            discriminant: Callback::payload(|p| Ok(p.clone())),
            branches: vec![RouterBranch {
                label: "hot".into(),
                channel: ChannelName::from("hot.inputChannel"),
            }],
            otherwise: Some(ChannelName::from("cold.inputChannel")),
        };
        let hot = rule.resolve("r", &FlowMessage::new(json!("hot"))).unwrap();
        assert_eq!(hot, vec![ChannelName::from("hot.inputChannel")]);
        let other = rule.resolve("r", &FlowMessage::new(json!("warm"))).unwrap();
        assert_eq!(other, vec![ChannelName::from("cold.inputChannel")]);
    }

    #[test]
    fn dynamic_string_array_and_null() {
        let single = RouterRule::Dynamic {
            eval: Callback::payload(|_| Ok(json!("a"))),
        };
        assert_eq!(
            single.resolve("r", &FlowMessage::default()).unwrap(),
            vec![ChannelName::from("a")]
        );

        let many = RouterRule::Dynamic {
            eval: Callback::payload(|_| Ok(json!(["a", "b"]))),
        };
        assert_eq!(many.resolve("r", &FlowMessage::default()).unwrap().len(), 2);

        let none = RouterRule::Dynamic {
            eval: Callback::payload(|_| Ok(Value::Null)),
        };
        assert!(none.resolve("r", &FlowMessage::default()).unwrap().is_empty());
    }

    #[test]
    fn dynamic_non_string_destination_is_an_error() {
        let rule = RouterRule::Dynamic {
            eval: Callback::payload(|_| Ok(json!(42))),
        };
        let err = rule.resolve("r", &FlowMessage::default()).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidDestination { .. }));
    }

    #[test]
    fn evaluation_failure_is_surfaced() {
        let rule = RouterRule::Dynamic {
            eval: Callback::payload(|_| Err("discriminant blew up".into())),
        };
        let err = rule.resolve("r", &FlowMessage::default()).unwrap_err();
        match err {
            RoutingError::Evaluation { router, source } => {
                assert_eq!(router, "r");
                assert_eq!(source.to_string(), "discriminant blew up");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
