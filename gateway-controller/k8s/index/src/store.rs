use ahash::AHashMap as HashMap;
use ngx_gateway_controller_core::ResourceId;
use ngx_gateway_controller_k8s_api::{
    gateway::{Gateway, GatewayClass, HttpRoute},
    policy::ClientSettingsPolicy,
    EndpointSlice, Resource as KubeResource, Secret, Service,
};
use std::{fmt, sync::Arc};

/// The kinds of resources the controller consumes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    GatewayClass,
    Gateway,
    HttpRoute,
    Service,
    EndpointSlice,
    Secret,
    ClientSettingsPolicy,
}

/// A resource submitted to the change processor.
#[derive(Clone, Debug)]
pub enum Resource {
    GatewayClass(GatewayClass),
    Gateway(Gateway),
    HttpRoute(HttpRoute),
    Service(Service),
    EndpointSlice(EndpointSlice),
    Secret(Secret),
    ClientSettingsPolicy(ClientSettingsPolicy),
}

/// The latest known version of each resource, keyed by identity.
///
/// Cluster-scoped resources are keyed with an empty namespace.
#[derive(Debug, Default)]
pub struct Store {
    pub gateway_classes: HashMap<ResourceId, Arc<GatewayClass>>,
    pub gateways: HashMap<ResourceId, Arc<Gateway>>,
    pub http_routes: HashMap<ResourceId, Arc<HttpRoute>>,
    pub services: HashMap<ResourceId, Arc<Service>>,
    pub endpoint_slices: HashMap<ResourceId, Arc<EndpointSlice>>,
    pub client_settings_policies: HashMap<ResourceId, Arc<ClientSettingsPolicy>>,
}

// === impl Kind ===

impl Kind {
    /// Whether changes of this kind are deduplicated by generation.
    ///
    /// Services, EndpointSlices and Secrets don't carry a generation that
    /// reflects their content, so their changes are judged by whether any
    /// stored resource refers to them.
    pub fn tracks_generation(self) -> bool {
        matches!(
            self,
            Self::GatewayClass | Self::Gateway | Self::HttpRoute | Self::ClientSettingsPolicy
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::GatewayClass => "GatewayClass",
            Self::Gateway => "Gateway",
            Self::HttpRoute => "HTTPRoute",
            Self::Service => "Service",
            Self::EndpointSlice => "EndpointSlice",
            Self::Secret => "Secret",
            Self::ClientSettingsPolicy => "ClientSettingsPolicy",
        };
        f.write_str(kind)
    }
}

// === impl Resource ===

impl Resource {
    pub fn kind(&self) -> Kind {
        match self {
            Self::GatewayClass(_) => Kind::GatewayClass,
            Self::Gateway(_) => Kind::Gateway,
            Self::HttpRoute(_) => Kind::HttpRoute,
            Self::Service(_) => Kind::Service,
            Self::EndpointSlice(_) => Kind::EndpointSlice,
            Self::Secret(_) => Kind::Secret,
            Self::ClientSettingsPolicy(_) => Kind::ClientSettingsPolicy,
        }
    }

    pub fn id(&self) -> ResourceId {
        match self {
            Self::GatewayClass(r) => ResourceId::of(r),
            Self::Gateway(r) => ResourceId::of(r),
            Self::HttpRoute(r) => ResourceId::of(r),
            Self::Service(r) => ResourceId::of(r),
            Self::EndpointSlice(r) => ResourceId::of(r),
            Self::Secret(r) => ResourceId::of(r),
            Self::ClientSettingsPolicy(r) => ResourceId::of(r),
        }
    }
}

// === impl Store ===

impl Store {
    /// Stores the resource, returning true if it wasn't stored before or its
    /// generation differs from the stored one.
    ///
    /// Secrets are not kept here.
    pub(crate) fn upsert(&mut self, resource: Resource) -> bool {
        let id = resource.id();
        match resource {
            Resource::GatewayClass(r) => upsert_into(&mut self.gateway_classes, id, r),
            Resource::Gateway(r) => upsert_into(&mut self.gateways, id, r),
            Resource::HttpRoute(r) => upsert_into(&mut self.http_routes, id, r),
            Resource::Service(r) => upsert_into(&mut self.services, id, r),
            Resource::EndpointSlice(r) => upsert_into(&mut self.endpoint_slices, id, r),
            Resource::ClientSettingsPolicy(r) => {
                upsert_into(&mut self.client_settings_policies, id, r)
            }
            Resource::Secret(_) => false,
        }
    }

    /// Removes the resource, returning true if it was stored.
    pub(crate) fn delete(&mut self, kind: Kind, id: &ResourceId) -> bool {
        match kind {
            Kind::GatewayClass => self.gateway_classes.remove(id).is_some(),
            Kind::Gateway => self.gateways.remove(id).is_some(),
            Kind::HttpRoute => self.http_routes.remove(id).is_some(),
            Kind::Service => self.services.remove(id).is_some(),
            Kind::EndpointSlice => self.endpoint_slices.remove(id).is_some(),
            Kind::ClientSettingsPolicy => self.client_settings_policies.remove(id).is_some(),
            Kind::Secret => false,
        }
    }

    pub fn len(&self, kind: Kind) -> usize {
        match kind {
            Kind::GatewayClass => self.gateway_classes.len(),
            Kind::Gateway => self.gateways.len(),
            Kind::HttpRoute => self.http_routes.len(),
            Kind::Service => self.services.len(),
            Kind::EndpointSlice => self.endpoint_slices.len(),
            Kind::ClientSettingsPolicy => self.client_settings_policies.len(),
            Kind::Secret => 0,
        }
    }
}

fn upsert_into<K: KubeResource>(
    index: &mut HashMap<ResourceId, Arc<K>>,
    id: ResourceId,
    resource: K,
) -> bool {
    let generation = resource.meta().generation;
    match index.insert(id, Arc::new(resource)) {
        Some(prev) => prev.meta().generation != generation,
        None => true,
    }
}
