use super::{BackendGroup, Gateway, PolicyKey};
use crate::{
    conditions::{self, Condition},
    validation, Store,
};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use anyhow::{anyhow, bail, Result};
use ngx_gateway_controller_core::{
    http_route::{
        Filters, HeaderMatch, HttpRouteMatch, Method, PathMatch, QueryParamMatch,
        RequestRedirectFilter, Scheme, StatusCode,
    },
    ObjectRef, ResourceId,
};
use ngx_gateway_controller_k8s_api::{gateway as k8s, Service};
use std::{num::NonZeroU16, sync::Arc};

const SUPPORTED_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"];

#[derive(Clone, Debug)]
pub struct Route {
    pub source: Arc<k8s::HttpRoute>,
    pub id: ResourceId,
    pub valid: bool,
    /// Route-level conditions, e.g. why some or all of its rules are invalid.
    pub conditions: Vec<Condition>,
    pub rules: Vec<Rule>,
    /// Listeners the route is attached to.
    pub valid_parent_refs: HashSet<ParentRef>,
    /// Parent references that could not be attached, with the reason.
    pub invalid_parent_refs: HashMap<ParentRef, Condition>,
    /// Policies attached to the route, ordered by precedence.
    pub policies: Vec<PolicyKey>,
}

/// A listener of a Gateway, as referenced by a route.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParentRef {
    pub gateway: ResourceId,
    pub section_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub matches: Vec<HttpRouteMatch>,
    pub valid_matches: bool,
    pub filters: Filters,
    pub valid_filters: bool,
    pub backend_group: BackendGroup,
}

// === impl Route ===

impl Route {
    fn build(source: Arc<k8s::HttpRoute>, services: &HashMap<ResourceId, Arc<Service>>) -> Self {
        let id = ResourceId::of(source.as_ref());
        let mut valid = true;
        let mut conditions = vec![];

        let hostname_errors = source
            .spec
            .hostnames
            .iter()
            .flatten()
            .enumerate()
            .filter_map(|(idx, hostname)| {
                validation::hostname(hostname)
                    .err()
                    .map(|error| format!("spec.hostnames[{idx}]: {error}"))
            })
            .collect::<Vec<_>>();
        if !hostname_errors.is_empty() {
            valid = false;
            conditions.push(Condition::route_unsupported_value(hostname_errors.join("; ")));
        }

        let mut rules = vec![];
        let mut rule_errors = vec![];
        let mut any_valid_rule = false;
        for (idx, rule) in source.spec.rules.iter().flatten().enumerate() {
            let (rule, errors) = Rule::build(&id, idx, rule, services);
            if errors.is_empty() {
                any_valid_rule = true;
            }
            rule_errors.extend(
                errors
                    .into_iter()
                    .map(|error| format!("spec.rules[{idx}]: {error}")),
            );
            rules.push(rule);
        }

        if valid && !rule_errors.is_empty() {
            if any_valid_rule {
                conditions.push(Condition::route_partially_invalid(format!(
                    "Some rules are invalid: {}",
                    rule_errors.join("; ")
                )));
            } else {
                valid = false;
                conditions.push(Condition::route_unsupported_value(format!(
                    "All rules are invalid: {}",
                    rule_errors.join("; ")
                )));
            }
        }

        Self {
            source,
            id,
            valid,
            conditions,
            rules,
            valid_parent_refs: HashSet::default(),
            invalid_parent_refs: HashMap::default(),
            policies: vec![],
        }
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::of(self.source.as_ref())
    }

    pub fn hostnames(&self) -> &[String] {
        self.source.spec.hostnames.as_deref().unwrap_or_default()
    }

    /// The condition explaining why the route cannot be attached.
    fn invalid_condition(&self) -> Condition {
        self.conditions
            .iter()
            .find(|c| c.type_ == conditions::ACCEPTED && !c.status)
            .cloned()
            .unwrap_or_else(|| Condition::route_unsupported_value("The route is invalid"))
    }

    fn bind(&mut self, gateway: &mut Gateway, section_name: &str) -> Result<(), Condition> {
        let listener = gateway
            .listeners
            .get_mut(section_name)
            .ok_or_else(|| Condition::route_no_matching_parent(section_name))?;
        if !listener.valid {
            return Err(Condition::route_invalid_listener());
        }
        if !self.valid {
            return Err(self.invalid_condition());
        }

        let accepted = accepted_hostnames(listener.hostname(), self.hostnames());
        if accepted.is_empty() {
            return Err(Condition::route_no_matching_listener_hostname());
        }
        listener.accepted_hostnames.extend(accepted);
        listener.routes.insert(self.id.clone());
        Ok(())
    }
}

/// Binds each route to the listeners of the winning Gateway.
///
/// Only routes that reference the winning Gateway or an ignored Gateway are
/// returned; routes without parent references are left out entirely.
pub(super) fn bind_routes(
    store: &Store,
    mut gateway: Option<&mut Gateway>,
    ignored: &HashMap<ResourceId, Arc<k8s::Gateway>>,
) -> HashMap<ResourceId, Route> {
    let mut routes = HashMap::default();

    for source in store.http_routes.values() {
        let parent_refs = source.spec.parent_refs.as_deref().unwrap_or_default();
        if parent_refs.is_empty() {
            continue;
        }

        let mut route = Route::build(source.clone(), &store.services);
        let route_ns = route.id.namespace.clone();
        let mut processed = false;

        for parent in parent_refs {
            if parent.kind.as_deref().map_or(false, |kind| kind != "Gateway") {
                continue;
            }
            let Some(section_name) = parent.section_name.as_deref().filter(|s| !s.is_empty())
            else {
                continue;
            };
            let parent_ref = ParentRef {
                gateway: ResourceId::new(
                    parent.namespace.clone().unwrap_or_else(|| route_ns.clone()),
                    parent.name.clone(),
                ),
                section_name: section_name.to_string(),
            };

            match gateway.as_deref_mut() {
                Some(gw) if gw.id == parent_ref.gateway => {
                    processed = true;
                    match route.bind(gw, section_name) {
                        Ok(()) => {
                            route.valid_parent_refs.insert(parent_ref);
                        }
                        Err(condition) => {
                            route.invalid_parent_refs.insert(parent_ref, condition);
                        }
                    }
                }
                _ if ignored.contains_key(&parent_ref.gateway) => {
                    processed = true;
                    route
                        .invalid_parent_refs
                        .insert(parent_ref, Condition::route_gateway_ignored());
                }
                _ => {}
            }
        }

        if processed {
            routes.insert(route.id.clone(), route);
        }
    }

    routes
}

/// The route hostnames accepted by a listener. A listener without a hostname
/// accepts every hostname.
fn accepted_hostnames(listener_hostname: &str, route_hostnames: &[String]) -> Vec<String> {
    route_hostnames
        .iter()
        .filter(|h| listener_hostname.is_empty() || h.as_str() == listener_hostname)
        .cloned()
        .collect()
}

// === impl Rule ===

impl Rule {
    fn build(
        route: &ResourceId,
        idx: usize,
        rule: &k8s::HttpRouteRule,
        services: &HashMap<ResourceId, Arc<Service>>,
    ) -> (Self, Vec<String>) {
        let mut errors = vec![];

        let matches = match rule.matches.as_deref() {
            None | Some([]) => Ok(vec![HttpRouteMatch::default()]),
            Some(matches) => matches.iter().map(try_match).collect::<Result<Vec<_>>>(),
        };
        let (matches, valid_matches) = match matches {
            Ok(matches) => (matches, true),
            Err(error) => {
                errors.push(error.to_string());
                (vec![], false)
            }
        };

        let (filters, valid_filters) =
            match try_filters(rule.filters.as_deref().unwrap_or_default()) {
                Ok(filters) => (filters, true),
                Err(error) => {
                    errors.push(error.to_string());
                    (Filters::default(), false)
                }
            };

        let backend_group = BackendGroup::build(
            route.clone(),
            idx,
            rule.backend_refs.as_deref().unwrap_or_default(),
            services,
        );

        let rule = Self {
            matches,
            valid_matches,
            filters,
            valid_filters,
            backend_group,
        };
        (rule, errors)
    }
}

fn try_match(
    k8s::HttpRouteMatch {
        path,
        headers,
        query_params,
        method,
    }: &k8s::HttpRouteMatch,
) -> Result<HttpRouteMatch> {
    let path = match path {
        None => PathMatch::default(),
        Some(k8s::HttpPathMatch::Exact { value }) => {
            validation::path(value)?;
            PathMatch::Exact(value.clone())
        }
        Some(k8s::HttpPathMatch::PathPrefix { value }) => {
            validation::path(value)?;
            PathMatch::Prefix(value.clone())
        }
        Some(k8s::HttpPathMatch::RegularExpression { .. }) => {
            bail!("path type RegularExpression is not supported, use PathPrefix or Exact")
        }
    };

    let headers = headers
        .iter()
        .flatten()
        .map(|header| -> Result<HeaderMatch> {
            match header {
                k8s::HttpHeaderMatch::Exact { name, value } => {
                    validation::header_part("header name", name)?;
                    validation::header_part("header value", value)?;
                    Ok(HeaderMatch {
                        name: name.clone(),
                        value: value.clone(),
                    })
                }
                k8s::HttpHeaderMatch::RegularExpression { .. } => {
                    bail!("header match type RegularExpression is not supported, use Exact")
                }
            }
        })
        .collect::<Result<_>>()?;

    let query_params = query_params
        .iter()
        .flatten()
        .map(|param| -> Result<QueryParamMatch> {
            match param {
                k8s::HttpQueryParamMatch::Exact { name, value } => {
                    validation::match_part("query param name", name)?;
                    validation::match_part("query param value", value)?;
                    Ok(QueryParamMatch {
                        name: name.clone(),
                        value: value.clone(),
                    })
                }
                k8s::HttpQueryParamMatch::RegularExpression { .. } => {
                    bail!("query param match type RegularExpression is not supported, use Exact")
                }
            }
        })
        .collect::<Result<_>>()?;

    let method = method.as_deref().map(try_method).transpose()?;

    Ok(HttpRouteMatch {
        path,
        headers,
        query_params,
        method,
    })
}

fn try_method(method: &str) -> Result<Method> {
    if !SUPPORTED_METHODS.contains(&method) {
        bail!(
            "method {method:?} is not supported, use one of {}",
            SUPPORTED_METHODS.join(", ")
        );
    }
    Ok(Method::from_bytes(method.as_bytes())?)
}

/// Only the RequestRedirect filter is supported. When several are given,
/// the first one applies.
fn try_filters(filters: &[k8s::HttpRouteFilter]) -> Result<Filters> {
    let mut request_redirect = None;
    for filter in filters {
        match filter {
            k8s::HttpRouteFilter::RequestRedirect { request_redirect: f } => {
                if request_redirect.is_none() {
                    request_redirect = Some(try_redirect(f)?);
                }
            }
            k8s::HttpRouteFilter::RequestHeaderModifier { .. } => {
                bail!("filter type RequestHeaderModifier is not supported")
            }
            k8s::HttpRouteFilter::UrlRewrite { .. } => {
                bail!("filter type URLRewrite is not supported")
            }
        }
    }
    Ok(Filters {
        invalid: false,
        request_redirect,
    })
}

fn try_redirect(
    k8s::HttpRequestRedirectFilter {
        scheme,
        hostname,
        path,
        port,
        status_code,
    }: &k8s::HttpRequestRedirectFilter,
) -> Result<RequestRedirectFilter> {
    if path.is_some() {
        bail!("requestRedirect.path is not supported");
    }

    let scheme = scheme
        .as_deref()
        .map(|scheme| match scheme {
            "http" => Ok(Scheme::HTTP),
            "https" => Ok(Scheme::HTTPS),
            other => Err(anyhow!(
                "requestRedirect.scheme {other:?} is not supported, use \"http\" or \"https\""
            )),
        })
        .transpose()?;

    if let Some(hostname) = hostname {
        validation::hostname(hostname)?;
    }

    let port = port
        .map(|port| {
            NonZeroU16::new(port).ok_or_else(|| anyhow!("requestRedirect.port must not be zero"))
        })
        .transpose()?;

    let status = status_code
        .map(|code| -> Result<StatusCode> {
            match code {
                301 | 302 => Ok(StatusCode::from_u16(code)?),
                other => bail!("requestRedirect.statusCode {other} is not supported, use 301 or 302"),
            }
        })
        .transpose()?;

    Ok(RequestRedirectFilter {
        scheme,
        host: hostname.clone(),
        port,
        status,
    })
}
