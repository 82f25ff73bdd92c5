use super::*;
use ngx_gateway_controller_core::{
    http_route::{Filters, HeaderMatch, Method, PathMatch, QueryParamMatch, Scheme, StatusCode},
    Backend, BackendGroup, ObjectRef, ResourceId, Ssl,
};
use pretty_assertions::assert_eq;
use std::num::NonZeroU16;

fn group(upstream: &str) -> BackendGroup {
    BackendGroup {
        source: ResourceId::new("test", "cafe"),
        rule_idx: 0,
        backends: vec![Backend {
            upstream_name: upstream.to_string(),
            weight: 1,
            valid: true,
        }],
    }
}

fn match_rule(match_idx: usize, route_match: HttpRouteMatch) -> MatchRule {
    MatchRule {
        match_idx,
        rule_idx: 0,
        source: ObjectRef {
            id: ResourceId::new("test", "cafe"),
            created: None,
        },
        route_match,
        filters: Filters::default(),
        backend_group: group("test_coffee_80"),
        directives: vec![],
    }
}

fn path_rule(path: &str, path_type: PathType, match_rules: Vec<MatchRule>) -> PathRule {
    PathRule {
        path: path.to_string(),
        path_type,
        match_rules,
    }
}

fn render(server: &VirtualServer, ssl: bool) -> String {
    let mut out = String::new();
    write_server(&mut Formatter::new(&mut out), server, ssl);
    out
}

#[test]
fn dispatches_conditional_matches() {
    let get = HttpRouteMatch {
        path: PathMatch::Prefix("/coffee".to_string()),
        method: Some(Method::GET),
        headers: vec![
            HeaderMatch {
                name: "Version".to_string(),
                value: "v2".to_string(),
            },
            HeaderMatch {
                name: "version".to_string(),
                value: "v3".to_string(),
            },
        ],
        query_params: vec![QueryParamMatch {
            name: "flavor".to_string(),
            value: "mocha".to_string(),
        }],
    };
    let any = HttpRouteMatch {
        path: PathMatch::Prefix("/coffee".to_string()),
        ..Default::default()
    };
    let rules = vec![path_rule(
        "/coffee",
        PathType::Prefix,
        vec![match_rule(0, get), match_rule(0, any)],
    )];

    let locations = locations(&rules, 80);
    let paths = locations
        .iter()
        .map(|l| (l.path.as_str(), l.internal))
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec![
            ("/coffee_route0", true),
            ("/coffee_route1", true),
            ("/coffee", false),
            ("/", false),
        ]
    );
    assert_eq!(
        locations[2].http_matches.as_deref(),
        Some(
            r#"[{"method":"GET","redirectPath":"/coffee_route0","headers":["Version:v2"],"params":["flavor=mocha"]},{"redirectPath":"/coffee_route1","any":true}]"#
        )
    );
    assert_eq!(
        locations[0].action,
        Some(Action::Proxy("test_coffee_80".to_string()))
    );
}

#[test]
fn redirects_instead_of_proxying() {
    let mut redirect = match_rule(0, HttpRouteMatch::default());
    redirect.filters.request_redirect = Some(RequestRedirectFilter {
        scheme: Some(Scheme::HTTPS),
        host: None,
        port: None,
        status: Some(StatusCode::MOVED_PERMANENTLY),
    });
    let mut defaults = match_rule(0, HttpRouteMatch::default());
    defaults.filters.request_redirect = Some(RequestRedirectFilter {
        port: NonZeroU16::new(8443),
        host: Some("cafe.example.com".to_string()),
        ..Default::default()
    });

    assert_eq!(
        match_location(&redirect, 80).action,
        Some(Action::Return {
            code: 301,
            url: Some("https://$host:80$request_uri".to_string()),
        })
    );
    assert_eq!(
        match_location(&defaults, 443).action,
        Some(Action::Return {
            code: 302,
            url: Some("$scheme://cafe.example.com:8443$request_uri".to_string()),
        })
    );
}

#[test]
fn invalid_filters_answer_500() {
    let mut rule = match_rule(0, HttpRouteMatch::default());
    rule.filters.invalid = true;
    assert_eq!(
        match_location(&rule, 80).action,
        Some(Action::Return {
            code: 500,
            url: None,
        })
    );
}

#[test]
fn renders_ssl_server_with_exact_path() {
    let mut rule = match_rule(
        0,
        HttpRouteMatch {
            path: PathMatch::Exact("/".to_string()),
            ..Default::default()
        },
    );
    rule.directives = vec![Directive::new("client_max_body_size", ["1m"])];
    let server = VirtualServer {
        is_default: false,
        hostname: "cafe.example.com".to_string(),
        path_rules: vec![path_rule("/", PathType::Exact, vec![rule])],
        ssl: Some(Ssl {
            certificate_path: "/etc/nginx/secrets/test_cafe-secret".to_string(),
        }),
        directives: vec![Directive::new("keepalive_requests", ["100"])],
    };

    assert_eq!(
        render(&server, true),
        "\
server {
    listen 443 ssl;
    ssl_certificate /etc/nginx/secrets/test_cafe-secret;
    ssl_certificate_key /etc/nginx/secrets/test_cafe-secret;
    if ($ssl_server_name != $host) {
        return 421;
    }
    server_name cafe.example.com;
    keepalive_requests 100;
    location = / {
        client_max_body_size 1m;
        proxy_http_version 1.1;
        proxy_pass http://test_coffee_80;
    }
    location / {
        return 404;
    }
}

"
    );
}

#[test]
fn exact_root_still_gets_prefix_404() {
    let rule = match_rule(
        0,
        HttpRouteMatch {
            path: PathMatch::Exact("/".to_string()),
            ..Default::default()
        },
    );
    let locations = locations(&[path_rule("/", PathType::Exact, vec![rule])], 80);
    let paths = locations
        .iter()
        .map(|l| (l.path.as_str(), l.exact))
        .collect::<Vec<_>>();
    assert_eq!(paths, vec![("/", true), ("/", false)]);
    assert_eq!(
        locations[1].action,
        Some(Action::Return {
            code: 404,
            url: None,
        })
    );
}

#[test]
fn prefix_root_replaces_404() {
    let rule = match_rule(0, HttpRouteMatch::default());
    let locations = locations(&[path_rule("/", PathType::Prefix, vec![rule])], 80);
    assert_eq!(locations.len(), 1);
    assert_eq!(
        locations[0].action,
        Some(Action::Proxy("test_coffee_80".to_string()))
    );
}

#[test]
fn escapes_match_descriptors() {
    let rule = match_rule(
        0,
        HttpRouteMatch {
            path: PathMatch::Prefix("/coffee".to_string()),
            headers: vec![HeaderMatch {
                name: "x-note".to_string(),
                value: r#"it's "a\b""#.to_string(),
            }],
            ..Default::default()
        },
    );
    let server = VirtualServer {
        hostname: "cafe.example.com".to_string(),
        path_rules: vec![path_rule("/coffee", PathType::Prefix, vec![rule])],
        ..Default::default()
    };

    let out = render(&server, false);
    let set = out
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with("set "))
        .expect("dispatch location must set $http_matches");
    assert_eq!(
        set,
        r#"set $http_matches "[{\"redirectPath\":\"/coffee_route0\",\"headers\":[\"x-note:it's \\\"a\\\\b\\\"\"]}]";"#
    );
}

#[test]
fn servers_without_paths_answer_404() {
    let server = VirtualServer {
        hostname: "~^".to_string(),
        ..Default::default()
    };
    assert_eq!(
        render(&server, false),
        "\
server {
    listen 80;
    server_name ~^;
    location / {
        return 404;
    }
}

"
    );
}

#[test]
fn renders_default_servers() {
    let default = VirtualServer {
        is_default: true,
        ..Default::default()
    };
    assert_eq!(
        render(&default, true),
        "server {\n    listen 443 ssl default_server;\n    ssl_reject_handshake on;\n}\n\n"
    );
}
