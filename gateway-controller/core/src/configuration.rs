//! The data-plane configuration compiled from the graph of Gateway API
//! resources.
//!
//! Every collection here is sorted when it is built, so compiling unchanged
//! input twice yields equal values.

use crate::{
    http_route::{Filters, HttpRouteMatch, PathType},
    ObjectRef, ResourceId,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Servers for the HTTP listeners, sorted by hostname.
    pub http_servers: Vec<VirtualServer>,
    /// Servers for the HTTPS listeners, sorted by hostname.
    pub ssl_servers: Vec<VirtualServer>,
    /// Sorted by name.
    pub upstreams: Vec<Upstream>,
    /// Unique backend groups referenced by the servers, sorted by source and
    /// rule index.
    pub backend_groups: Vec<BackendGroup>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VirtualServer {
    /// The catch-all server for the listener's protocol.
    pub is_default: bool,
    pub hostname: String,
    /// Sorted by path, then path type.
    pub path_rules: Vec<PathRule>,
    pub ssl: Option<Ssl>,
    /// Directives generated from policies attached to the Gateway.
    pub directives: Vec<Directive>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathRule {
    pub path: String,
    pub path_type: PathType,
    /// Ordered by route creation timestamp, namespace, then name. Matches of a
    /// single route keep their relative order.
    pub match_rules: Vec<MatchRule>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchRule {
    pub match_idx: usize,
    pub rule_idx: usize,
    pub source: ObjectRef,
    pub route_match: HttpRouteMatch,
    pub filters: Filters,
    pub backend_group: BackendGroup,
    /// Directives generated from policies attached to the route.
    pub directives: Vec<Directive>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Ssl {
    pub certificate_path: String,
}

/// The weighted backends of a single route rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BackendGroup {
    pub source: ResourceId,
    pub rule_idx: usize,
    pub backends: Vec<Backend>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Backend {
    /// The upstream name. Empty when the reference is invalid.
    pub upstream_name: String,
    pub weight: u32,
    pub valid: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Upstream {
    pub name: String,
    pub endpoints: Vec<Endpoint>,
    /// Why endpoints couldn't be resolved, if they couldn't.
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

/// A single configuration directive with its parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Directive {
    pub name: &'static str,
    pub params: Vec<String>,
}

// === impl BackendGroup ===

impl BackendGroup {
    /// The group name, unique across all routes. Used as the name of the
    /// traffic-splitting variable.
    pub fn name(&self) -> String {
        format!(
            "{}__{}_rule{}",
            self.source.namespace, self.source.name, self.rule_idx
        )
    }

    pub fn needs_split(&self) -> bool {
        self.backends.len() > 1
    }
}

// === impl Directive ===

impl Directive {
    pub fn new<I, S>(name: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_group_name() {
        let group = BackendGroup {
            source: ResourceId::new("test-ns", "cafe-route"),
            rule_idx: 2,
            backends: vec![],
        };
        assert_eq!(group.name(), "test-ns__cafe-route_rule2");
        assert!(!group.needs_split());
    }
}
