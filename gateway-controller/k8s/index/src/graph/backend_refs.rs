use ahash::AHashMap as HashMap;
use anyhow::{bail, Result};
use ngx_gateway_controller_core::{self as core, ResourceId};
use ngx_gateway_controller_k8s_api::{gateway::HttpBackendRef, Service};
use std::sync::Arc;

const DEFAULT_WEIGHT: u32 = 1;

/// The backends of a single route rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendGroup {
    pub source: ResourceId,
    pub rule_idx: usize,
    pub backends: Vec<BackendRef>,
    /// Why references were invalid.
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendRef {
    /// The name of the upstream serving this backend. Empty when invalid.
    pub name: String,
    pub service: Option<ResourceId>,
    pub port: u16,
    pub weight: u32,
    pub valid: bool,
}

// === impl BackendGroup ===

impl BackendGroup {
    pub(super) fn build(
        source: ResourceId,
        rule_idx: usize,
        refs: &[HttpBackendRef],
        services: &HashMap<ResourceId, Arc<Service>>,
    ) -> Self {
        let mut backends = Vec::with_capacity(refs.len());
        let mut errors = vec![];

        for backend in refs {
            let weight = backend.weight.unwrap_or(DEFAULT_WEIGHT);
            match resolve(backend, &source.namespace, services) {
                Ok((service, port)) => backends.push(BackendRef {
                    name: upstream_name(&service, port),
                    service: Some(service),
                    port,
                    weight,
                    valid: true,
                }),
                // Invalid references keep their weight so that the traffic
                // they would have received fails instead of going elsewhere.
                Err(error) => {
                    errors.push(error.to_string());
                    backends.push(BackendRef {
                        weight,
                        ..Default::default()
                    });
                }
            }
        }

        Self {
            source,
            rule_idx,
            backends,
            errors,
        }
    }

    pub fn to_dataplane(&self) -> core::BackendGroup {
        core::BackendGroup {
            source: self.source.clone(),
            rule_idx: self.rule_idx,
            backends: self
                .backends
                .iter()
                .map(|b| core::Backend {
                    upstream_name: b.name.clone(),
                    weight: b.weight,
                    valid: b.valid,
                })
                .collect(),
        }
    }
}

pub(crate) fn upstream_name(service: &ResourceId, port: u16) -> String {
    format!("{}_{}_{}", service.namespace, service.name, port)
}

fn resolve(
    backend: &HttpBackendRef,
    route_ns: &str,
    services: &HashMap<ResourceId, Arc<Service>>,
) -> Result<(ResourceId, u16)> {
    let kind = backend.kind.as_deref().unwrap_or("Service");
    if kind != "Service" {
        bail!("The kind of the backend ref must be Service, got {kind:?}");
    }
    if let Some(group) = backend.group.as_deref().filter(|g| !g.is_empty() && *g != "core") {
        bail!("The group of the backend ref must be empty, got {group:?}");
    }

    let namespace = backend.namespace.as_deref().unwrap_or(route_ns);
    if namespace != route_ns {
        bail!(
            "Cross-namespace routing is not permitted; the backend ref namespace {namespace} \
             differs from the route namespace {route_ns}"
        );
    }

    let Some(port) = backend.port else {
        bail!("Port must be specified for the Service {}", backend.name);
    };

    let service = ResourceId::new(namespace, backend.name.clone());
    if !services.contains_key(&service) {
        bail!("The Service {service} does not exist");
    }
    Ok((service, port))
}
