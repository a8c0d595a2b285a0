//! Flow compilation: channel resolution, chaining, and validation.
//!
//! [`FlowBuilder::build`] turns the declaration list into an immutable
//! [`MessageFlow`]. The rules, in declaration order:
//!
//! - The first child's input is its explicit channel, else the flow's
//!   declared input, else the auto-generated `"{flow}.inputChannel"`.
//! - Every later child inherits the previous sibling's output channel,
//!   unless the sibling declared `link_to_next(false)`; then the child
//!   must name its input explicitly or composition fails.
//! - Endpoint outputs default to `"{flow}.{endpoint}.outputChannel"`.
//! - A nested flow or splice carries fixed channels; linking into it
//!   rewrites the previous sibling's auto-generated output to match
//!   (a conflicting explicit output is a [`CompositionError`]).
//! - Router branch flows are registered as additional, unlinked children;
//!   each branch destination is the branch flow's input channel.
//!
//! Composition errors fail fast: no partially built flow escapes.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::channels::{ChannelError, ChannelRegistry};
use crate::endpoint::{EndpointConfig, EndpointLogic, EndpointNode};
use crate::router::{RouterBranch, RouterBuilder, RouterMode, RouterRule};
use crate::types::{ChannelName, ChannelRole, EndpointKind};

use super::builder::{ChildDecl, FlowBuilder};
use super::{FlowChild, MessageFlow};

/// Errors raised while compiling a flow or a composition session.
#[derive(Debug, Error, Diagnostic)]
pub enum CompositionError {
    /// A flow was declared without any children.
    #[error("flow '{flow}' has no children")]
    #[diagnostic(code(integraph::compose::empty_flow))]
    EmptyFlow { flow: String },

    /// Two top-level flows share a name within one composition session.
    #[error("duplicate flow name '{name}' in composition")]
    #[diagnostic(
        code(integraph::compose::duplicate_flow),
        help("Flow names are the lookup keys of the integration context; rename one flow.")
    )]
    DuplicateFlowName { name: String },

    /// Two endpoints in the same flow share a name.
    #[error("duplicate endpoint name '{endpoint}' in flow '{flow}'")]
    #[diagnostic(code(integraph::compose::duplicate_endpoint))]
    DuplicateEndpointName { flow: String, endpoint: String },

    /// The chain was broken with `link_to_next(false)` and the next child
    /// did not name its input channel.
    #[error("endpoint '{endpoint}' in flow '{flow}' has no input channel after a broken chain")]
    #[diagnostic(
        code(integraph::compose::missing_input),
        help("After link_to_next(false), the next child must declare input_channel explicitly.")
    )]
    MissingInputChannel { flow: String, endpoint: String },

    /// A router declared the same branch label (or map key) twice.
    #[error("duplicate branch label '{label}' in router '{router}' of flow '{flow}'")]
    #[diagnostic(code(integraph::compose::duplicate_branch))]
    DuplicateBranchLabel {
        flow: String,
        router: String,
        label: String,
    },

    /// A router declared more than one `otherwise` branch.
    #[error("router '{router}' in flow '{flow}' declares more than one otherwise branch")]
    #[diagnostic(code(integraph::compose::duplicate_otherwise))]
    DuplicateOtherwise { flow: String, router: String },

    /// Declared wiring contradicts the declaration-order chain.
    #[error(
        "channel mismatch at '{child}' in flow '{flow}': expected '{expected}', found '{found}'"
    )]
    #[diagnostic(
        code(integraph::compose::channel_mismatch),
        help("Explicit channels must agree with the chain they participate in.")
    )]
    ChannelMismatch {
        flow: String,
        child: String,
        expected: ChannelName,
        found: ChannelName,
    },

    /// Channel registry rejected a name.
    #[error(transparent)]
    #[diagnostic(code(integraph::compose::channel))]
    Channel(#[from] ChannelError),
}

/// A child after channel resolution, before final node construction.
///
/// Endpoint outputs stay mutable here so that linking into a fixed-channel
/// child (nested flow, splice) can rewrite the previous auto-generated
/// output.
enum Pending {
    Endpoint {
        name: String,
        input: ChannelName,
        output: ChannelName,
        output_explicit: bool,
        logic: EndpointLogic,
    },
    Fixed {
        child: FlowChild,
        input: ChannelName,
        output: ChannelName,
    },
}

impl Pending {
    fn input(&self) -> &ChannelName {
        match self {
            Pending::Endpoint { input, .. } | Pending::Fixed { input, .. } => input,
        }
    }

    fn output(&self) -> &ChannelName {
        match self {
            Pending::Endpoint { output, .. } | Pending::Fixed { output, .. } => output,
        }
    }
}

impl FlowBuilder {
    /// Compiles the declarations into an immutable [`MessageFlow`].
    ///
    /// # Errors
    ///
    /// Any [`CompositionError`]; composition fails fast and no partially
    /// built flow is returned.
    pub fn build(self) -> Result<MessageFlow, CompositionError> {
        let FlowBuilder {
            name: flow_name,
            input_channel: flow_input_decl,
            output_channel: flow_output_decl,
            decls,
        } = self;

        if decls.is_empty() {
            return Err(CompositionError::EmptyFlow { flow: flow_name });
        }

        let mut registry = ChannelRegistry::new();
        let mut kind_counts: FxHashMap<EndpointKind, usize> = FxHashMap::default();
        let mut used_names: FxHashSet<String> = FxHashSet::default();
        let mut main: Vec<Pending> = Vec::new();
        let mut aux: Vec<MessageFlow> = Vec::new();
        // Some(channel) while the declaration-order chain is open.
        let mut chain: Option<ChannelName> = None;
        let total = decls.len();

        for (i, decl) in decls.into_iter().enumerate() {
            let is_first = i == 0;
            let is_last = i + 1 == total;
            match decl {
                ChildDecl::Endpoint { config, logic } => {
                    let pending = resolve_endpoint(
                        &flow_name,
                        &flow_input_decl,
                        flow_output_decl.as_ref().filter(|_| is_last),
                        is_first,
                        None,
                        config,
                        logic,
                        &mut registry,
                        &mut kind_counts,
                        &mut used_names,
                        &mut chain,
                    )?;
                    main.push(pending);
                }
                ChildDecl::Router { config, router } => {
                    let name = endpoint_name(
                        &flow_name,
                        config.name.clone(),
                        EndpointKind::Route,
                        &mut kind_counts,
                        &mut used_names,
                    )?;
                    let rule =
                        compile_router(&flow_name, &name, router, &mut registry, &mut aux)?;
                    let pending = resolve_endpoint(
                        &flow_name,
                        &flow_input_decl,
                        flow_output_decl.as_ref().filter(|_| is_last),
                        is_first,
                        Some(name),
                        config,
                        EndpointLogic::Route(rule),
                        &mut registry,
                        &mut kind_counts,
                        &mut used_names,
                        &mut chain,
                    )?;
                    main.push(pending);
                }
                ChildDecl::Flow(sub) => {
                    let input = sub.input_channel().clone();
                    let output = sub.output_channel().clone();
                    let child_name = sub.name().to_string();
                    link_fixed_child(
                        &flow_name,
                        &flow_input_decl,
                        is_first,
                        &child_name,
                        &input,
                        &mut main,
                        &mut chain,
                    )?;
                    chain = Some(output.clone());
                    main.push(Pending::Fixed {
                        child: FlowChild::Flow(sub),
                        input,
                        output,
                    });
                }
                ChildDecl::Splice {
                    name,
                    input,
                    output,
                } => {
                    link_fixed_child(
                        &flow_name,
                        &flow_input_decl,
                        is_first,
                        &name,
                        &input,
                        &mut main,
                        &mut chain,
                    )?;
                    chain = Some(output.clone());
                    main.push(Pending::Fixed {
                        child: FlowChild::Splice {
                            name,
                            input: input.clone(),
                            output: output.clone(),
                        },
                        input,
                        output,
                    });
                }
            }
        }

        let (flow_input, flow_output) = match (main.first(), main.last()) {
            (Some(first), Some(last)) => (first.input().clone(), last.output().clone()),
            _ => return Err(CompositionError::EmptyFlow { flow: flow_name }),
        };

        if let Some(declared) = flow_output_decl {
            if declared != flow_output {
                return Err(CompositionError::ChannelMismatch {
                    flow: flow_name,
                    child: "<flow output>".to_string(),
                    expected: declared,
                    found: flow_output,
                });
            }
        }

        let mut children: Vec<FlowChild> = Vec::with_capacity(main.len() + aux.len());
        for pending in main {
            children.push(match pending {
                Pending::Endpoint {
                    name,
                    input,
                    output,
                    logic,
                    ..
                } => FlowChild::Endpoint(Arc::new(EndpointNode::new(name, input, output, logic))),
                Pending::Fixed { child, .. } => child,
            });
        }
        children.extend(aux.into_iter().map(FlowChild::Flow));

        tracing::debug!(
            flow = %flow_name,
            input = %flow_input,
            output = %flow_output,
            children = children.len(),
            "compiled message flow"
        );

        Ok(MessageFlow::from_parts(
            flow_name,
            flow_input,
            flow_output,
            children,
        ))
    }
}

/// Picks the endpoint name: explicit, else `"{kind}{ordinal}"`.
fn endpoint_name(
    flow: &str,
    explicit: Option<String>,
    kind: EndpointKind,
    kind_counts: &mut FxHashMap<EndpointKind, usize>,
    used_names: &mut FxHashSet<String>,
) -> Result<String, CompositionError> {
    let name = explicit.unwrap_or_else(|| {
        let n = kind_counts.entry(kind).or_insert(0);
        *n += 1;
        format!("{}{}", kind.label(), n)
    });
    if !used_names.insert(name.clone()) {
        return Err(CompositionError::DuplicateEndpointName {
            flow: flow.to_string(),
            endpoint: name,
        });
    }
    Ok(name)
}

#[allow(clippy::too_many_arguments)]
fn resolve_endpoint(
    flow: &str,
    flow_input_decl: &Option<ChannelName>,
    flow_output_decl: Option<&ChannelName>,
    is_first: bool,
    resolved_name: Option<String>,
    config: EndpointConfig,
    logic: EndpointLogic,
    registry: &mut ChannelRegistry,
    kind_counts: &mut FxHashMap<EndpointKind, usize>,
    used_names: &mut FxHashSet<String>,
    chain: &mut Option<ChannelName>,
) -> Result<Pending, CompositionError> {
    let name = match resolved_name {
        // Routers resolve their name before rule compilation; re-inserting
        // it here would trip the duplicate check.
        Some(name) => name,
        None => endpoint_name(flow, config.name.clone(), logic.kind(), kind_counts, used_names)?,
    };

    let input = match config.input_channel {
        Some(explicit) => {
            if is_first {
                if let Some(declared) = flow_input_decl {
                    if *declared != explicit {
                        return Err(CompositionError::ChannelMismatch {
                            flow: flow.to_string(),
                            child: name,
                            expected: declared.clone(),
                            found: explicit,
                        });
                    }
                }
            }
            registry.resolve(Some(explicit), flow, ChannelRole::Input)?
        }
        None if is_first => registry.resolve(flow_input_decl.clone(), flow, ChannelRole::Input)?,
        None => match chain.clone() {
            Some(previous_output) => previous_output,
            None => {
                return Err(CompositionError::MissingInputChannel {
                    flow: flow.to_string(),
                    endpoint: name,
                });
            }
        },
    };

    let (output, output_explicit) = match config.output_channel {
        Some(explicit) => (registry.resolve(Some(explicit), flow, ChannelRole::Output)?, true),
        None => match flow_output_decl {
            Some(declared) => (
                registry.resolve(Some(declared.clone()), flow, ChannelRole::Output)?,
                true,
            ),
            None => {
                let base = format!("{flow}.{name}");
                (registry.resolve(None, &base, ChannelRole::Output)?, false)
            }
        },
    };

    *chain = if config.link_to_next {
        Some(output.clone())
    } else {
        None
    };

    Ok(Pending::Endpoint {
        name,
        input,
        output,
        output_explicit,
        logic,
    })
}

/// Links a fixed-channel child (nested flow or splice) into the chain.
///
/// The previous sibling's auto-generated output is rewritten to the fixed
/// input; an explicit previous output must already agree.
fn link_fixed_child(
    flow: &str,
    flow_input_decl: &Option<ChannelName>,
    is_first: bool,
    child_name: &str,
    fixed_input: &ChannelName,
    main: &mut [Pending],
    chain: &mut Option<ChannelName>,
) -> Result<(), CompositionError> {
    if is_first {
        if let Some(declared) = flow_input_decl {
            if declared != fixed_input {
                return Err(CompositionError::ChannelMismatch {
                    flow: flow.to_string(),
                    child: child_name.to_string(),
                    expected: declared.clone(),
                    found: fixed_input.clone(),
                });
            }
        }
        return Ok(());
    }

    if chain.take().is_none() {
        // Chain broken: the child is reachable only through its own input.
        return Ok(());
    }

    match main.last_mut() {
        Some(Pending::Endpoint {
            output,
            output_explicit,
            ..
        }) => {
            if *output_explicit {
                if output != fixed_input {
                    return Err(CompositionError::ChannelMismatch {
                        flow: flow.to_string(),
                        child: child_name.to_string(),
                        expected: fixed_input.clone(),
                        found: output.clone(),
                    });
                }
            } else {
                *output = fixed_input.clone();
            }
        }
        Some(Pending::Fixed { output, .. }) => {
            if output != fixed_input {
                return Err(CompositionError::ChannelMismatch {
                    flow: flow.to_string(),
                    child: child_name.to_string(),
                    expected: fixed_input.clone(),
                    found: output.clone(),
                });
            }
        }
        None => {}
    }
    Ok(())
}

/// Compiles a router declaration into its rule, pushing branch flows onto
/// the enclosing flow's auxiliary children.
fn compile_router(
    flow: &str,
    router: &str,
    builder: RouterBuilder,
    registry: &mut ChannelRegistry,
    aux: &mut Vec<MessageFlow>,
) -> Result<RouterRule, CompositionError> {
    match builder.mode {
        RouterMode::Dynamic { eval } => Ok(RouterRule::Dynamic { eval }),
        RouterMode::ChannelMap {
            key,
            entries,
            otherwise,
        } => {
            let mut map = FxHashMap::default();
            for (label, channel) in entries {
                let channel = registry.resolve(Some(channel), flow, ChannelRole::Output)?;
                if map.insert(label.clone(), channel).is_some() {
                    return Err(CompositionError::DuplicateBranchLabel {
                        flow: flow.to_string(),
                        router: router.to_string(),
                        label,
                    });
                }
            }
            let otherwise = match otherwise {
                Some(channel) => Some(registry.resolve(Some(channel), flow, ChannelRole::Output)?),
                None => None,
            };
            Ok(RouterRule::ChannelMap {
                key,
                map,
                otherwise,
            })
        }
        RouterMode::Branches {
            discriminant,
            whens,
            otherwise,
        } => {
            let mut branches = Vec::with_capacity(whens.len());
            let mut seen: FxHashSet<String> = FxHashSet::default();
            for (label, branch_flow) in whens {
                if !seen.insert(label.clone()) {
                    return Err(CompositionError::DuplicateBranchLabel {
                        flow: flow.to_string(),
                        router: router.to_string(),
                        label,
                    });
                }
                branches.push(RouterBranch {
                    label,
                    channel: branch_flow.input_channel().clone(),
                });
                aux.push(branch_flow);
            }
            if otherwise.len() > 1 {
                return Err(CompositionError::DuplicateOtherwise {
                    flow: flow.to_string(),
                    router: router.to_string(),
                });
            }
            let otherwise = otherwise.into_iter().next().map(|branch_flow| {
                let channel = branch_flow.input_channel().clone();
                aux.push(branch_flow);
                channel
            });
            Ok(RouterRule::Branches {
                discriminant,
                branches,
                otherwise,
            })
        }
    }
}
