use crate::Store;
use ngx_gateway_controller_core::{Endpoint, ResourceId};
use ngx_gateway_controller_k8s_api::{
    EndpointSlice, IntOrString, ResourceExt, ServicePort, SERVICE_NAME_LABEL,
};

/// Resolves a Service port to the endpoints serving it.
pub trait ServiceResolver: Send + Sync {
    fn resolve(&self, service: &ResourceId, port: u16) -> Result<Vec<Endpoint>, ResolveError>;
}

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("service {0} does not exist")]
    ServiceNotFound(ResourceId),

    #[error("no matching target port for service {service} port {port}")]
    NoMatchingTargetPort { service: ResourceId, port: u16 },

    #[error("no endpoints found for service {0}")]
    NoEndpoints(ResourceId),

    #[error("no valid endpoints found for service {0}")]
    NoValidEndpoints(ResourceId),
}

/// Resolves endpoints from the Services and EndpointSlices in a [`Store`].
#[derive(Debug)]
pub struct StoreResolver<'s> {
    store: &'s Store,
}

/// The EndpointSlice port a Service port forwards to.
#[derive(Debug, PartialEq, Eq)]
enum TargetPort<'p> {
    Number(u16),
    Named(&'p str),
}

// === impl StoreResolver ===

impl<'s> StoreResolver<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }
}

impl ServiceResolver for StoreResolver<'_> {
    fn resolve(&self, id: &ResourceId, port: u16) -> Result<Vec<Endpoint>, ResolveError> {
        let service = self
            .store
            .services
            .get(id)
            .ok_or_else(|| ResolveError::ServiceNotFound(id.clone()))?;

        let target = service
            .spec
            .iter()
            .flat_map(|spec| spec.ports.iter().flatten())
            .find(|p| p.port == i32::from(port))
            .and_then(target_port)
            .ok_or_else(|| ResolveError::NoMatchingTargetPort {
                service: id.clone(),
                port,
            })?;

        let slices = self
            .store
            .endpoint_slices
            .values()
            .filter(|slice| slice.namespace().as_deref() == Some(id.namespace.as_str()))
            .filter(|slice| slice.labels().get(SERVICE_NAME_LABEL) == Some(&id.name))
            .collect::<Vec<_>>();
        if slices.is_empty() {
            return Err(ResolveError::NoEndpoints(id.clone()));
        }

        let mut endpoints = slices
            .into_iter()
            .flat_map(|slice| slice_endpoints(slice, &target))
            .collect::<Vec<_>>();
        if endpoints.is_empty() {
            return Err(ResolveError::NoValidEndpoints(id.clone()));
        }
        endpoints.sort();
        endpoints.dedup();
        Ok(endpoints)
    }
}

fn target_port(port: &ServicePort) -> Option<TargetPort<'_>> {
    match &port.target_port {
        Some(IntOrString::Int(n)) => u16::try_from(*n)
            .ok()
            .filter(|n| *n != 0)
            .map(TargetPort::Number),
        Some(IntOrString::String(_)) => port.name.as_deref().map(TargetPort::Named),
        None => u16::try_from(port.port).ok().map(TargetPort::Number),
    }
}

/// Ready IPv4 endpoints of a slice that carries the target port.
fn slice_endpoints(slice: &EndpointSlice, target: &TargetPort<'_>) -> Vec<Endpoint> {
    if slice.address_type != "IPv4" {
        return vec![];
    }

    let port = slice.ports.iter().flatten().find_map(|p| {
        let number = p.port.and_then(|n| u16::try_from(n).ok())?;
        let matches = match target {
            TargetPort::Number(n) => number == *n,
            TargetPort::Named(name) => p.name.as_deref() == Some(*name),
        };
        matches.then_some(number)
    });
    let Some(port) = port else {
        return vec![];
    };

    slice
        .endpoints
        .iter()
        .filter(|ep| {
            ep.conditions
                .as_ref()
                .and_then(|c| c.ready)
                .unwrap_or(true)
        })
        .flat_map(|ep| ep.addresses.iter())
        .map(|address| Endpoint {
            address: address.clone(),
            port,
        })
        .collect()
}
