use crate::store::{Kind, Resource};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use ngx_gateway_controller_core::ResourceId;
use ngx_gateway_controller_k8s_api::{
    gateway::{Gateway, HttpRoute},
    ResourceExt, SERVICE_NAME_LABEL,
};

/// Tracks which Services and Secrets are referenced by stored routes and
/// Gateways, so that changes to them only dirty the store when they can
/// affect the output.
#[derive(Debug, Default)]
pub(crate) struct RelationshipCapturer {
    route_services: HashMap<ResourceId, HashSet<ResourceId>>,
    service_refs: HashMap<ResourceId, usize>,
    endpoint_slice_owners: HashMap<ResourceId, ResourceId>,
    gateway_secrets: HashMap<ResourceId, HashSet<ResourceId>>,
    secret_refs: HashMap<ResourceId, usize>,
}

// === impl RelationshipCapturer ===

impl RelationshipCapturer {
    pub(crate) fn capture(&mut self, resource: &Resource) {
        match resource {
            Resource::HttpRoute(route) => {
                let id = ResourceId::of(route);
                let services = route_services(route);
                if let Some(prev) = self.route_services.insert(id, services.clone()) {
                    release(&mut self.service_refs, prev);
                }
                retain(&mut self.service_refs, services);
            }
            Resource::Gateway(gateway) => {
                let id = ResourceId::of(gateway);
                let secrets = gateway_secrets(gateway);
                if let Some(prev) = self.gateway_secrets.insert(id, secrets.clone()) {
                    release(&mut self.secret_refs, prev);
                }
                retain(&mut self.secret_refs, secrets);
            }
            Resource::EndpointSlice(slice) => {
                let owner = slice
                    .labels()
                    .get(SERVICE_NAME_LABEL)
                    .map(|name| ResourceId::new(slice.namespace().unwrap_or_default(), name));
                let id = ResourceId::of(slice);
                match owner {
                    Some(owner) => {
                        self.endpoint_slice_owners.insert(id, owner);
                    }
                    None => {
                        self.endpoint_slice_owners.remove(&id);
                    }
                }
            }
            _ => {}
        }
    }

    pub(crate) fn remove(&mut self, kind: Kind, id: &ResourceId) {
        match kind {
            Kind::HttpRoute => {
                if let Some(prev) = self.route_services.remove(id) {
                    release(&mut self.service_refs, prev);
                }
            }
            Kind::Gateway => {
                if let Some(prev) = self.gateway_secrets.remove(id) {
                    release(&mut self.secret_refs, prev);
                }
            }
            Kind::EndpointSlice => {
                self.endpoint_slice_owners.remove(id);
            }
            _ => {}
        }
    }

    /// Whether a stored resource refers to the given resource.
    pub(crate) fn exists(&self, kind: Kind, id: &ResourceId) -> bool {
        match kind {
            Kind::Service => self.service_refs.contains_key(id),
            Kind::EndpointSlice => self
                .endpoint_slice_owners
                .get(id)
                .map_or(false, |svc| self.service_refs.contains_key(svc)),
            Kind::Secret => self.secret_refs.contains_key(id),
            _ => false,
        }
    }
}

fn retain(refs: &mut HashMap<ResourceId, usize>, ids: HashSet<ResourceId>) {
    for id in ids {
        *refs.entry(id).or_default() += 1;
    }
}

fn release(refs: &mut HashMap<ResourceId, usize>, ids: HashSet<ResourceId>) {
    for id in ids {
        if let Some(count) = refs.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                refs.remove(&id);
            }
        }
    }
}

/// Services referenced by a route's backends. Only same-namespace Service
/// references can be resolved, so others are not tracked.
fn route_services(route: &HttpRoute) -> HashSet<ResourceId> {
    let namespace = route.namespace().unwrap_or_default();
    route
        .spec
        .rules
        .iter()
        .flatten()
        .flat_map(|rule| rule.backend_refs.iter().flatten())
        .filter(|backend| backend.kind.as_deref().unwrap_or("Service") == "Service")
        .filter(|backend| backend.namespace.as_deref().unwrap_or(&namespace) == namespace)
        .map(|backend| ResourceId::new(namespace.clone(), backend.name.clone()))
        .collect()
}

fn gateway_secrets(gateway: &Gateway) -> HashSet<ResourceId> {
    let namespace = gateway.namespace().unwrap_or_default();
    gateway
        .spec
        .listeners
        .iter()
        .filter_map(|listener| listener.tls.as_ref())
        .flat_map(|tls| tls.certificate_refs.iter().flatten())
        .map(|secret| {
            ResourceId::new(
                secret.namespace.clone().unwrap_or_else(|| namespace.clone()),
                secret.name.clone(),
            )
        })
        .collect()
}
