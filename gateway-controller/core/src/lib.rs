#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod configuration;
pub mod http_route;
mod resource_id;

pub use self::{
    configuration::{
        Backend, BackendGroup, Configuration, Directive, Endpoint, MatchRule, PathRule, Ssl,
        Upstream, VirtualServer,
    },
    resource_id::{ObjectRef, ResourceId},
};

pub const DEFAULT_CONTROLLER_NAME: &str = "gateway.nginx.org/nginx-gateway-controller";

pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;
