//! Compiles a [`Graph`] into the data-plane [`Configuration`].

use crate::{
    graph::{Graph, Listener, ListenerProtocol, PolicyKey, Route},
    policies::PolicyRegistry,
    resolver::ServiceResolver,
};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use ngx_gateway_controller_core::{
    http_route::{Filters, PathType},
    Configuration, Directive, MatchRule, PathRule, ResourceId, Ssl, Upstream, VirtualServer,
};

/// The hostname of the server catching requests for any hostname.
pub const WILDCARD_HOSTNAME: &str = "~^";

/// Builds the configuration for the winning Gateway.
///
/// The configuration is empty unless the GatewayClass is valid and a Gateway
/// exists.
pub fn build_configuration(
    graph: &Graph,
    resolver: &dyn ServiceResolver,
    policies: &PolicyRegistry,
) -> Configuration {
    let (Some(gateway_class), Some(gateway)) = (&graph.gateway_class, &graph.gateway) else {
        return Configuration::default();
    };
    if !gateway_class.valid {
        return Configuration::default();
    }

    let mut listeners = gateway.listeners.values().collect::<Vec<_>>();
    listeners.sort_by(|a, b| a.name().cmp(b.name()));

    let server_directives = generate(policies, graph, &gateway.policies);
    let mut http = HostPathRules::new(server_directives.clone());
    let mut https = HostPathRules::new(server_directives);
    for listener in &listeners {
        match listener.protocol {
            ListenerProtocol::Http => http.upsert_listener(listener, graph, policies),
            ListenerProtocol::Https => https.upsert_listener(listener, graph, policies),
            ListenerProtocol::Unsupported(_) => {}
        }
    }

    let http_servers = http.build_servers(false);
    let ssl_servers = https.build_servers(true);

    let mut seen = HashSet::new();
    let mut backend_groups = http_servers
        .iter()
        .chain(&ssl_servers)
        .flat_map(|server| &server.path_rules)
        .flat_map(|rule| &rule.match_rules)
        .map(|mr| &mr.backend_group)
        .filter(|group| seen.insert((group.source.clone(), group.rule_idx)))
        .cloned()
        .collect::<Vec<_>>();
    backend_groups.sort_by(|a, b| (&a.source, a.rule_idx).cmp(&(&b.source, b.rule_idx)));

    Configuration {
        http_servers,
        ssl_servers,
        upstreams: build_upstreams(graph, &listeners, resolver),
        backend_groups,
    }
}

/// Resolves each upstream referenced through a valid listener exactly once.
fn build_upstreams(
    graph: &Graph,
    listeners: &[&Listener],
    resolver: &dyn ServiceResolver,
) -> Vec<Upstream> {
    let mut upstreams = HashMap::<String, Upstream>::default();

    for listener in listeners.iter().filter(|l| l.valid) {
        for route in sorted_routes(graph, listener) {
            let backends = route
                .rules
                .iter()
                .flat_map(|rule| &rule.backend_group.backends);
            for backend in backends {
                let Some(service) = backend.service.as_ref() else {
                    continue;
                };
                if backend.name.is_empty() || upstreams.contains_key(&backend.name) {
                    continue;
                }

                let upstream = match resolver.resolve(service, backend.port) {
                    Ok(mut endpoints) => {
                        endpoints.sort();
                        endpoints.dedup();
                        Upstream {
                            name: backend.name.clone(),
                            endpoints,
                            error: None,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            service = %service,
                            port = backend.port,
                            %error,
                            "Failed to resolve upstream endpoints"
                        );
                        Upstream {
                            name: backend.name.clone(),
                            endpoints: vec![],
                            error: Some(error.to_string()),
                        }
                    }
                };
                upstreams.insert(backend.name.clone(), upstream);
            }
        }
    }

    let mut upstreams = upstreams.into_values().collect::<Vec<_>>();
    upstreams.sort_by(|a, b| a.name.cmp(&b.name));
    upstreams
}

/// The routes bound to a listener, ordered by identity.
fn sorted_routes<'g>(graph: &'g Graph, listener: &Listener) -> Vec<&'g Route> {
    let mut ids = listener.routes.iter().collect::<Vec<_>>();
    ids.sort();
    ids.into_iter()
        .filter_map(|id| graph.routes.get(id))
        .collect()
}

fn generate(policies: &PolicyRegistry, graph: &Graph, keys: &[PolicyKey]) -> Vec<Directive> {
    keys.iter()
        .filter_map(|key| graph.policies.get(key))
        .flat_map(|policy| policies.generate(&policy.source))
        .collect()
}

/// Aggregates the match rules of a protocol's listeners by hostname and path.
struct HostPathRules<'g> {
    rules_per_host: HashMap<String, HashMap<(String, PathType), PathRule>>,
    /// The listener that first accepted each hostname; it provides the
    /// hostname's certificate.
    listeners_for_host: HashMap<String, &'g Listener>,
    /// Hosts each route's matches were added to.
    routes_per_host: HashSet<(String, ResourceId)>,
    listeners: Vec<&'g Listener>,
    listeners_exist: bool,
    server_directives: Vec<Directive>,
}

// === impl HostPathRules ===

impl<'g> HostPathRules<'g> {
    fn new(server_directives: Vec<Directive>) -> Self {
        Self {
            rules_per_host: HashMap::default(),
            listeners_for_host: HashMap::default(),
            routes_per_host: HashSet::default(),
            listeners: vec![],
            listeners_exist: false,
            server_directives,
        }
    }

    fn upsert_listener(&mut self, listener: &'g Listener, graph: &'g Graph, policies: &PolicyRegistry) {
        self.listeners_exist = true;
        if !listener.valid {
            return;
        }
        self.listeners.push(listener);

        for route in sorted_routes(graph, listener) {
            if !route.valid {
                continue;
            }
            let route_directives = generate(policies, graph, &route.policies);

            let hostnames = route
                .hostnames()
                .iter()
                .filter(|h| listener.accepted_hostnames.contains(*h));
            for hostname in hostnames {
                self.listeners_for_host
                    .entry(hostname.clone())
                    .or_insert(listener);
                // A route bound to several listeners accepting the same
                // hostname contributes its matches once.
                if !self
                    .routes_per_host
                    .insert((hostname.clone(), route.id.clone()))
                {
                    continue;
                }
                self.add_route(hostname, route, &route_directives);
            }
        }
    }

    fn add_route(&mut self, hostname: &str, route: &Route, directives: &[Directive]) {
        let source = route.object_ref();
        let path_rules = self.rules_per_host.entry(hostname.to_string()).or_default();

        for (rule_idx, rule) in route.rules.iter().enumerate() {
            if !rule.valid_matches {
                continue;
            }
            let filters = if rule.valid_filters {
                rule.filters.clone()
            } else {
                Filters {
                    invalid: true,
                    request_redirect: None,
                }
            };
            let backend_group = rule.backend_group.to_dataplane();

            for (match_idx, route_match) in rule.matches.iter().enumerate() {
                let path = route_match.path.path().to_string();
                let path_type = route_match.path.path_type();
                path_rules
                    .entry((path.clone(), path_type))
                    .or_insert_with(|| PathRule {
                        path,
                        path_type,
                        match_rules: vec![],
                    })
                    .match_rules
                    .push(MatchRule {
                        match_idx,
                        rule_idx,
                        source: source.clone(),
                        route_match: route_match.clone(),
                        filters: filters.clone(),
                        backend_group: backend_group.clone(),
                        directives: directives.to_vec(),
                    });
            }
        }
    }

    fn build_servers(self, ssl: bool) -> Vec<VirtualServer> {
        let Self {
            rules_per_host,
            listeners_for_host,
            listeners,
            listeners_exist,
            server_directives,
            ..
        } = self;

        let mut servers = vec![];
        for (hostname, rules) in rules_per_host {
            let mut path_rules = rules.into_values().collect::<Vec<_>>();
            for rule in &mut path_rules {
                // Stable, so each route's matches keep their order.
                rule.match_rules.sort_by(|a, b| a.source.cmp(&b.source));
            }
            path_rules.sort_by(|a, b| (&a.path, a.path_type).cmp(&(&b.path, b.path_type)));

            let ssl = if ssl {
                listeners_for_host
                    .get(&hostname)
                    .and_then(|l| l.secret_path.clone())
                    .map(|certificate_path| Ssl { certificate_path })
            } else {
                None
            };
            servers.push(VirtualServer {
                is_default: false,
                hostname,
                path_rules,
                ssl,
                directives: server_directives.clone(),
            });
        }

        // TLS listeners without routes, or accepting any hostname, still get
        // a server so that their certificate is served.
        if ssl {
            for listener in listeners {
                if !listener.routes.is_empty() && !listener.hostname().is_empty() {
                    continue;
                }
                let hostname = match listener.hostname() {
                    "" => WILDCARD_HOSTNAME.to_string(),
                    hostname => hostname.to_string(),
                };
                if servers.iter().any(|s| s.hostname == hostname) {
                    continue;
                }
                servers.push(VirtualServer {
                    is_default: false,
                    hostname,
                    path_rules: vec![],
                    ssl: listener.secret_path.clone().map(|certificate_path| Ssl {
                        certificate_path,
                    }),
                    directives: server_directives.clone(),
                });
            }
        }

        servers.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        if listeners_exist {
            servers.insert(
                0,
                VirtualServer {
                    is_default: true,
                    ..Default::default()
                },
            );
        }
        servers
    }
}
