//! Core types for the integraph composition model.
//!
//! This module defines the fundamental identifiers used throughout the
//! crate: channel names, the roles that drive automatic channel naming,
//! and the closed set of endpoint kinds.
//!
//! # Key Types
//!
//! - [`ChannelName`]: the identity of a logical message pipe
//! - [`ChannelRole`]: input/output role suffixes for auto-generated names
//! - [`EndpointKind`]: the closed set of endpoint node kinds
//!
//! # Examples
//!
//! ```rust
//! use integraph::types::{ChannelName, ChannelRole, EndpointKind};
//!
//! let explicit = ChannelName::from("orders");
//! assert_eq!(explicit.as_str(), "orders");
//!
//! assert_eq!(ChannelRole::Input.suffix(), "inputChannel");
//! assert_eq!(EndpointKind::Transform.to_string(), "transform");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a logical message pipe.
///
/// Within one composition a channel name resolves to exactly one logical
/// pipe. Names are either explicit (user supplied, shareable across flows
/// to connect them) or auto-generated from an owning element's name plus
/// a [`ChannelRole`] suffix, e.g. `"f.inputChannel"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Creates a channel name from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChannelName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Role suffix used when a channel name is auto-generated.
///
/// Auto-generated names follow the pattern `"{base}.{role}"`, where the
/// base is the owning flow or endpoint name. The suffixes are stable so
/// that callers can look channels up later (`flow.inputChannel`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    /// The channel an element consumes from.
    Input,
    /// The channel an element produces to.
    Output,
}

impl ChannelRole {
    /// Returns the naming suffix for this role.
    #[must_use]
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Input => "inputChannel",
            Self::Output => "outputChannel",
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// The closed set of endpoint node kinds.
///
/// Declarations are resolved through static constructors on the flow
/// builder rather than a name-keyed factory lookup, so an "unknown kind"
/// is unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Replaces the message payload with the callback's result.
    Transform,
    /// Forwards the message unchanged when the predicate accepts it,
    /// otherwise absorbs it.
    Filter,
    /// Computes zero, one, or many destination channels per message.
    Route,
    /// Service activator: terminal or reply-producing processing step.
    Handle,
}

impl EndpointKind {
    /// Returns the lowercase label used in default endpoint names.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Filter => "filter",
            Self::Route => "route",
            Self::Handle => "handle",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_round_trips_strings() {
        let a = ChannelName::from("orders");
        let b = ChannelName::new(String::from("orders"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "orders");
        assert_eq!(a.to_string(), "orders");
    }

    #[test]
    fn role_suffixes_are_stable() {
        assert_eq!(ChannelRole::Input.suffix(), "inputChannel");
        assert_eq!(ChannelRole::Output.suffix(), "outputChannel");
    }

    #[test]
    fn kind_labels() {
        assert_eq!(EndpointKind::Transform.label(), "transform");
        assert_eq!(EndpointKind::Filter.label(), "filter");
        assert_eq!(EndpointKind::Route.label(), "route");
        assert_eq!(EndpointKind::Handle.label(), "handle");
    }

    #[test]
    fn channel_name_serde_is_transparent() {
        let name = ChannelName::from("f.inputChannel");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"f.inputChannel\"");
        let back: ChannelName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
