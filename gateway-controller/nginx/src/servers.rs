use crate::{format::Formatter, split_clients, NGINX_500_SERVER, NGINX_502_SERVER};
use ahash::AHashSet as HashSet;
use ngx_gateway_controller_core::{
    http_route::{HttpRouteMatch, PathType, RequestRedirectFilter},
    Directive, MatchRule, PathRule, VirtualServer, HTTPS_PORT, HTTP_PORT,
};
use serde_json::{json, Map, Value};

const ROOT_PATH: &str = "/";

/// What a location does with the requests it receives.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Action {
    Proxy(String),
    Return { code: u16, url: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Location {
    path: String,
    exact: bool,
    internal: bool,
    directives: Vec<Directive>,
    /// Set on the location that dispatches to the match locations.
    http_matches: Option<String>,
    action: Option<Action>,
}

pub(crate) fn write(fmt: &mut Formatter<'_>, http: &[VirtualServer], ssl: &[VirtualServer]) {
    for server in http {
        write_server(fmt, server, false);
    }
    for server in ssl {
        write_server(fmt, server, true);
    }
    for (socket, code) in [(NGINX_502_SERVER, "502"), (NGINX_500_SERVER, "500")] {
        fmt.block("server", |fmt| {
            fmt.directive("listen", [socket]);
            fmt.directive("access_log", ["off"]);
            fmt.directive("return", [code]);
        });
        fmt.blank();
    }
}

fn write_server(fmt: &mut Formatter<'_>, server: &VirtualServer, ssl: bool) {
    fmt.block("server", |fmt| {
        match (server.is_default, ssl) {
            (true, false) => {
                fmt.directive("listen", [HTTP_PORT.to_string().as_str(), "default_server"]);
                fmt.directive("default_type", ["text/html"]);
                fmt.directive("return", ["404"]);
                return;
            }
            (true, true) => {
                fmt.directive("listen", [HTTPS_PORT.to_string().as_str(), "ssl", "default_server"]);
                fmt.directive("ssl_reject_handshake", ["on"]);
                return;
            }
            (false, false) => fmt.directive("listen", [HTTP_PORT.to_string()]),
            (false, true) => {
                fmt.directive("listen", [HTTPS_PORT.to_string().as_str(), "ssl"]);
                if let Some(cert) = &server.ssl {
                    fmt.directive("ssl_certificate", [&cert.certificate_path]);
                    fmt.directive("ssl_certificate_key", [&cert.certificate_path]);
                }
                fmt.block("if ($ssl_server_name != $host)", |fmt| {
                    fmt.directive("return", ["421"]);
                });
            }
        }

        fmt.directive("server_name", [&server.hostname]);
        write_directives(fmt, &server.directives);

        let port = if ssl { HTTPS_PORT } else { HTTP_PORT };
        for location in locations(&server.path_rules, port) {
            write_location(fmt, &location);
        }
    });
    fmt.blank();
}

fn write_location(fmt: &mut Formatter<'_>, location: &Location) {
    let header = if location.exact {
        format!("location = {}", location.path)
    } else {
        format!("location {}", location.path)
    };
    fmt.block(&header, |fmt| {
        if location.internal {
            fmt.directive("internal", std::iter::empty::<&str>());
        }
        if let Some(matches) = &location.http_matches {
            fmt.directive("set", ["$http_matches", quote(matches).as_str()]);
            fmt.directive("js_content", ["httpmatches.redirect"]);
        }
        match &location.action {
            Some(Action::Return { code, url }) => {
                let mut params = vec![code.to_string()];
                params.extend(url.clone());
                fmt.directive("return", params);
            }
            Some(Action::Proxy(target)) => {
                write_directives(fmt, &location.directives);
                fmt.directive("proxy_http_version", ["1.1"]);
                fmt.directive("proxy_pass", [format!("http://{target}")]);
            }
            None => {}
        }
    });
}

/// Quotes a value as an nginx double-quoted string.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn write_directives(fmt: &mut Formatter<'_>, directives: &[Directive]) {
    for directive in directives {
        fmt.directive(directive.name, &directive.params);
    }
}

/// Builds the locations of a server.
///
/// A path served by a single path-only match gets one location. Otherwise
/// each match gets an internal location and the path's location dispatches
/// requests to them with the `httpmatches` njs module. A server without a
/// prefix root location answers 404 for unmatched paths.
fn locations(path_rules: &[PathRule], port: u16) -> Vec<Location> {
    let mut locations = vec![];
    let mut root_exists = false;

    for rule in path_rules {
        let exact = rule.path_type == PathType::Exact;
        // An exact root only matches "/" itself.
        if rule.path == ROOT_PATH && !exact {
            root_exists = true;
        }

        if let [single] = rule.match_rules.as_slice() {
            if single.route_match.is_path_only() {
                locations.push(Location {
                    path: rule.path.clone(),
                    exact,
                    ..match_location(single, port)
                });
                continue;
            }
        }

        let mut matches = Vec::with_capacity(rule.match_rules.len());
        for (idx, match_rule) in rule.match_rules.iter().enumerate() {
            let path = format!("{}_route{idx}", rule.path);
            matches.push(http_match(&match_rule.route_match, &path));
            locations.push(Location {
                path,
                internal: true,
                ..match_location(match_rule, port)
            });
        }
        locations.push(Location {
            path: rule.path.clone(),
            exact,
            internal: false,
            directives: vec![],
            http_matches: Some(Value::Array(matches).to_string()),
            action: None,
        });
    }

    if !root_exists {
        locations.push(Location {
            path: ROOT_PATH.to_string(),
            exact: false,
            internal: false,
            directives: vec![],
            http_matches: None,
            action: Some(Action::Return {
                code: 404,
                url: None,
            }),
        });
    }
    locations
}

/// The location serving a single match. Redirects and proxying are mutually
/// exclusive; invalid filters answer 500.
fn match_location(rule: &MatchRule, port: u16) -> Location {
    let action = if rule.filters.invalid {
        Action::Return {
            code: 500,
            url: None,
        }
    } else if let Some(redirect) = &rule.filters.request_redirect {
        redirect_action(redirect, port)
    } else {
        Action::Proxy(split_clients::proxy_target(&rule.backend_group))
    };

    Location {
        path: String::new(),
        exact: false,
        internal: false,
        directives: rule.directives.clone(),
        http_matches: None,
        action: Some(action),
    }
}

fn redirect_action(redirect: &RequestRedirectFilter, listener_port: u16) -> Action {
    let scheme = redirect
        .scheme
        .as_ref()
        .map_or("$scheme", |scheme| scheme.as_str());
    let host = redirect.host.as_deref().unwrap_or("$host");
    let port = redirect.port.map_or(listener_port, |port| port.get());
    let code = redirect.status.map_or(302, |status| status.as_u16());
    Action::Return {
        code,
        url: Some(format!("{scheme}://{host}:{port}$request_uri")),
    }
}

/// Encodes a match for the `httpmatches` njs module, which redirects a
/// request to `redirectPath` when the request satisfies the match.
///
/// Header names are case-insensitive; only the first header of each name is
/// kept.
fn http_match(route_match: &HttpRouteMatch, redirect_path: &str) -> Value {
    let mut encoded = Map::new();
    if let Some(method) = &route_match.method {
        encoded.insert("method".to_string(), json!(method.as_str()));
    }
    encoded.insert("redirectPath".to_string(), json!(redirect_path));

    if route_match.is_path_only() {
        encoded.insert("any".to_string(), json!(true));
        return Value::Object(encoded);
    }

    let mut names = HashSet::new();
    let headers = route_match
        .headers
        .iter()
        .filter(|h| names.insert(h.name.to_lowercase()))
        .map(|h| format!("{}:{}", h.name, h.value))
        .collect::<Vec<_>>();
    if !headers.is_empty() {
        encoded.insert("headers".to_string(), json!(headers));
    }

    let params = route_match
        .query_params
        .iter()
        .map(|p| format!("{}={}", p.name, p.value))
        .collect::<Vec<_>>();
    if !params.is_empty() {
        encoded.insert("params".to_string(), json!(params));
    }

    Value::Object(encoded)
}

#[cfg(test)]
mod tests;
