use super::*;
use crate::{build_configuration, policies::PolicyRegistry, GraphBuilder, Resource, Store};
use ngx_gateway_controller_core::{
    http_route::{Filters, PathType},
    Backend, Configuration, Directive, Ssl,
};
use ngx_gateway_controller_k8s_api::{
    gateway::{HttpRequestRedirectFilter, HttpRouteFilter},
    policy::{ClientBody, ClientSettingsPolicy, ClientSettingsPolicySpec, LocalPolicyTargetReference},
    GATEWAY_API_GROUP,
};
use pretty_assertions::assert_eq;

fn compile(
    resources: impl IntoIterator<Item = Resource>,
    secrets: &StaticSecrets,
    resolver: &StaticResolver,
) -> Configuration {
    let mut store = Store::default();
    for resource in resources {
        store.upsert(resource);
    }
    let policies = PolicyRegistry::with_defaults();
    let graph = GraphBuilder {
        controller_name: DEFAULT_CONTROLLER_NAME,
        gateway_class_name: CLASS_NAME,
        secrets,
        policies: &policies,
    }
    .build(&store);
    build_configuration(&graph, resolver, &policies)
}

fn base(listeners: Vec<Listener>) -> Vec<Resource> {
    vec![
        Resource::GatewayClass(mk_valid_gateway_class()),
        Resource::Gateway(mk_gateway("gateway", None, listeners)),
        Resource::Service(mk_service("coffee", 80)),
        Resource::Service(mk_service("tea", 80)),
    ]
}

fn resolver() -> StaticResolver {
    StaticResolver(
        [(
            (ResourceId::new("test", "coffee"), 80),
            vec![endpoint("10.0.0.1", 8080)],
        )]
        .into_iter()
        .collect(),
    )
}

#[test]
fn invalid_gateway_class_compiles_nothing() {
    let mut resources = base(vec![mk_http_listener("http", None)]);
    resources[0] = Resource::GatewayClass(mk_gateway_class("example.com/other"));
    resources.push(Resource::HttpRoute(mk_route(
        "coffee",
        None,
        &["http"],
        &["cafe.example.com"],
        vec![mk_rule(&["/"], &[("coffee", 80, None)])],
    )));

    let config = compile(resources, &StaticSecrets::default(), &resolver());
    assert_eq!(config, Configuration::default());
}

#[test]
fn resolves_each_upstream_once() {
    let mut resources = base(vec![mk_http_listener("http", None)]);
    resources.push(Resource::HttpRoute(mk_route(
        "cafe",
        None,
        &["http"],
        &["cafe.example.com"],
        vec![
            mk_rule(&["/coffee"], &[("coffee", 80, Some(80)), ("tea", 80, Some(20))]),
            mk_rule(&["/latte"], &[("coffee", 80, None)]),
        ],
    )));

    let config = compile(resources, &StaticSecrets::default(), &resolver());

    let upstreams = config
        .upstreams
        .iter()
        .map(|u| (u.name.as_str(), u.endpoints.len(), u.error.as_deref()))
        .collect::<Vec<_>>();
    assert_eq!(
        upstreams,
        vec![
            ("test_coffee_80", 1, None),
            ("test_tea_80", 0, Some("service test/tea does not exist")),
        ]
    );

    assert_eq!(config.backend_groups.len(), 2);
    assert_eq!(
        config.backend_groups[0].backends,
        vec![
            Backend {
                upstream_name: "test_coffee_80".to_string(),
                weight: 80,
                valid: true,
            },
            Backend {
                upstream_name: "test_tea_80".to_string(),
                weight: 20,
                valid: true,
            },
        ]
    );
    assert!(config.backend_groups[0].needs_split());
    assert!(!config.backend_groups[1].needs_split());
}

#[test]
fn orders_servers_paths_and_matches() {
    let mut resources = base(vec![mk_http_listener("http", None)]);
    resources.push(Resource::HttpRoute(mk_route(
        "newer",
        Some("2024-01-02T00:00:00Z"),
        &["http"],
        &["cafe.example.com"],
        vec![mk_rule(&["/tea", "/coffee"], &[("tea", 80, None)])],
    )));
    resources.push(Resource::HttpRoute(mk_route(
        "older",
        Some("2024-01-01T00:00:00Z"),
        &["http"],
        &["cafe.example.com", "bar.example.com"],
        vec![mk_rule(&["/coffee"], &[("coffee", 80, None)])],
    )));

    let config = compile(resources, &StaticSecrets::default(), &resolver());

    let hostnames = config
        .http_servers
        .iter()
        .map(|s| (s.is_default, s.hostname.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        hostnames,
        vec![
            (true, ""),
            (false, "bar.example.com"),
            (false, "cafe.example.com"),
        ]
    );

    let cafe = &config.http_servers[2];
    let paths = cafe
        .path_rules
        .iter()
        .map(|r| (r.path.as_str(), r.path_type))
        .collect::<Vec<_>>();
    assert_eq!(paths, vec![("/coffee", PathType::Prefix), ("/tea", PathType::Prefix)]);

    let coffee = cafe.path_rules[0]
        .match_rules
        .iter()
        .map(|m| (m.source.id.name.as_str(), m.match_idx))
        .collect::<Vec<_>>();
    assert_eq!(coffee, vec![("older", 0), ("newer", 1)]);
}

#[test]
fn https_listeners_serve_certificates() {
    let resources = base(vec![
        mk_https_listener("https", Some("cafe.example.com"), "cafe-secret"),
        mk_https_listener("https-any", None, "cafe-secret"),
    ])
    .into_iter()
    .chain([Resource::HttpRoute(mk_route(
        "coffee",
        None,
        &["https"],
        &["cafe.example.com"],
        vec![mk_rule(&["/"], &[("coffee", 80, None)])],
    ))]);
    let secrets = StaticSecrets(vec![ResourceId::new("test", "cafe-secret")]);

    let config = compile(resources, &secrets, &resolver());
    assert!(config.http_servers.is_empty());

    let ssl = Some(Ssl {
        certificate_path: "/etc/nginx/secrets/test_cafe-secret".to_string(),
    });
    let servers = config
        .ssl_servers
        .iter()
        .map(|s| (s.is_default, s.hostname.as_str(), s.ssl.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        servers,
        vec![
            (true, "", None),
            (false, "cafe.example.com", ssl.clone()),
            (false, "~^", ssl),
        ]
    );
}

#[test]
fn invalid_filters_answer_with_an_error() {
    let mut rule = mk_rule(&["/"], &[("coffee", 80, None)]);
    rule.filters = Some(vec![HttpRouteFilter::RequestRedirect {
        request_redirect: HttpRequestRedirectFilter {
            status_code: Some(307),
            ..Default::default()
        },
    }]);
    let mut resources = base(vec![mk_http_listener("http", None)]);
    resources.push(Resource::HttpRoute(mk_route(
        "coffee",
        None,
        &["http"],
        &["cafe.example.com"],
        vec![rule, mk_rule(&["/tea"], &[("tea", 80, None)])],
    )));

    let config = compile(resources, &StaticSecrets::default(), &resolver());
    let cafe = &config.http_servers[1];
    assert_eq!(cafe.path_rules[0].path, "/");
    assert_eq!(
        cafe.path_rules[0].match_rules[0].filters,
        Filters {
            invalid: true,
            request_redirect: None,
        }
    );
    assert_eq!(cafe.path_rules[1].match_rules[0].filters, Filters::default());
}

#[test]
fn gateway_policies_apply_to_every_server() {
    let mut resources = base(vec![mk_http_listener("http", None)]);
    resources.push(Resource::HttpRoute(mk_route(
        "coffee",
        None,
        &["http"],
        &["cafe.example.com"],
        vec![mk_rule(&["/"], &[("coffee", 80, None)])],
    )));
    resources.push(Resource::ClientSettingsPolicy(ClientSettingsPolicy {
        metadata: mk_meta("test", "body-size", None, 1),
        spec: ClientSettingsPolicySpec {
            target_ref: LocalPolicyTargetReference {
                group: GATEWAY_API_GROUP.to_string(),
                kind: "Gateway".to_string(),
                name: "gateway".to_string(),
            },
            body: Some(ClientBody {
                max_size: Some("10m".to_string()),
                timeout: None,
            }),
            keep_alive: None,
        },
    }));

    let config = compile(resources, &StaticSecrets::default(), &resolver());
    let cafe = &config.http_servers[1];
    assert_eq!(
        cafe.directives,
        vec![Directive::new("client_max_body_size", ["10m"])]
    );
    assert!(cafe.path_rules[0].match_rules[0].directives.is_empty());
}
