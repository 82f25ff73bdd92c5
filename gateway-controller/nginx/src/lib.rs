//! Renders a compiled [`Configuration`] as nginx `http` context
//! configuration.
//!
//! The output is a pure function of the configuration: upstreams first, then
//! the `split_clients` blocks of weighted backend groups, then servers. Two
//! helper servers listening on unix sockets answer requests that cannot be
//! proxied:
//!
//! - [`NGINX_502_SERVER`] backs upstreams without endpoints.
//! - [`NGINX_500_SERVER`] backs [`INVALID_BACKEND_REF`], the upstream that
//!   invalid backend references are routed to.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod format;
mod servers;
mod split_clients;
mod upstreams;

use self::format::Formatter;
use ngx_gateway_controller_core::Configuration;

pub const NGINX_502_SERVER: &str = "unix:/var/lib/nginx/nginx-502-server.sock";
pub const NGINX_500_SERVER: &str = "unix:/var/lib/nginx/nginx-500-server.sock";
pub const INVALID_BACKEND_REF: &str = "invalid-backend-ref";

pub fn generate(config: &Configuration) -> String {
    let mut out = String::new();
    let mut fmt = Formatter::new(&mut out);
    upstreams::write(&mut fmt, &config.upstreams);
    split_clients::write(&mut fmt, &config.backend_groups);
    servers::write(&mut fmt, &config.http_servers, &config.ssl_servers);

    // Remove the trailing blank line
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngx_gateway_controller_core::{
        http_route::{HttpRouteMatch, PathMatch, PathType},
        Backend, BackendGroup, Endpoint, MatchRule, ObjectRef, PathRule, ResourceId, Upstream,
        VirtualServer,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_configuration() {
        assert_eq!(
            generate(&Configuration::default()),
            "\
upstream invalid-backend-ref {
    random two least_conn;
    zone invalid-backend-ref 512k;
    server unix:/var/lib/nginx/nginx-500-server.sock;
}

server {
    listen unix:/var/lib/nginx/nginx-502-server.sock;
    access_log off;
    return 502;
}

server {
    listen unix:/var/lib/nginx/nginx-500-server.sock;
    access_log off;
    return 500;
}
"
        );
    }

    #[test]
    fn renders_a_route() {
        let group = BackendGroup {
            source: ResourceId::new("test", "coffee"),
            rule_idx: 0,
            backends: vec![
                Backend {
                    upstream_name: "test_coffee_80".to_string(),
                    weight: 1,
                    valid: true,
                },
                Backend {
                    upstream_name: String::new(),
                    weight: 1,
                    valid: false,
                },
            ],
        };
        let config = Configuration {
            http_servers: vec![
                VirtualServer {
                    is_default: true,
                    ..Default::default()
                },
                VirtualServer {
                    hostname: "cafe.example.com".to_string(),
                    path_rules: vec![PathRule {
                        path: "/coffee".to_string(),
                        path_type: PathType::Prefix,
                        match_rules: vec![MatchRule {
                            match_idx: 0,
                            rule_idx: 0,
                            source: ObjectRef {
                                id: ResourceId::new("test", "coffee"),
                                created: None,
                            },
                            route_match: HttpRouteMatch {
                                path: PathMatch::Prefix("/coffee".to_string()),
                                ..Default::default()
                            },
                            filters: Default::default(),
                            backend_group: group.clone(),
                            directives: vec![],
                        }],
                    }],
                    ..Default::default()
                },
            ],
            ssl_servers: vec![],
            upstreams: vec![Upstream {
                name: "test_coffee_80".to_string(),
                endpoints: vec![Endpoint {
                    address: "10.0.0.1".to_string(),
                    port: 8080,
                }],
                error: None,
            }],
            backend_groups: vec![group],
        };

        let expected = "\
upstream test_coffee_80 {
    random two least_conn;
    zone test_coffee_80 512k;
    server 10.0.0.1:8080;
}

upstream invalid-backend-ref {
    random two least_conn;
    zone invalid-backend-ref 512k;
    server unix:/var/lib/nginx/nginx-500-server.sock;
}

split_clients $request_id $test__coffee_rule0 {
    50.00% test_coffee_80;
    50.00% invalid-backend-ref;
}

server {
    listen 80 default_server;
    default_type text/html;
    return 404;
}

server {
    listen 80;
    server_name cafe.example.com;
    location /coffee {
        proxy_http_version 1.1;
        proxy_pass http://$test__coffee_rule0;
    }
    location / {
        return 404;
    }
}

server {
    listen unix:/var/lib/nginx/nginx-502-server.sock;
    access_log off;
    return 502;
}

server {
    listen unix:/var/lib/nginx/nginx-500-server.sock;
    access_log off;
    return 500;
}
";
        assert_eq!(generate(&config), expected);
    }
}
