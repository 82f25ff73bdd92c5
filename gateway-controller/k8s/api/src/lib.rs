#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod gateway;
pub mod policy;

pub use k8s_openapi::{
    api::{
        core::v1::{Secret, Service, ServicePort, ServiceSpec},
        discovery::v1::{Endpoint, EndpointConditions, EndpointPort, EndpointSlice},
    },
    apimachinery::pkg::{
        apis::meta::v1::{ObjectMeta, Time},
        util::intstr::IntOrString,
    },
    ByteString,
};
pub use kube::{Resource, ResourceExt};

/// The label that links an `EndpointSlice` to the `Service` it was created for.
pub const SERVICE_NAME_LABEL: &str = "kubernetes.io/service-name";

/// The API group shared by all Gateway API resources.
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

#[cfg(test)]
mod tests;
