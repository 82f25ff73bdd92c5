use crate::{
    configuration::build_configuration,
    graph::GraphBuilder,
    metrics::ProcessorMetrics,
    policies::{PolicyKind, PolicyRegistry},
    relationship::RelationshipCapturer,
    resolver::{ServiceResolver, StoreResolver},
    secrets::{SecretRequester, SharedSecretStore},
    statuses::{build_statuses, Statuses},
    store::{Kind, Resource, Store},
};
use ngx_gateway_controller_core::{Configuration, ResourceId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Identifies the resources this controller manages and the collaborators
/// used while compiling.
pub struct ProcessorConfig {
    /// Compared against `GatewayClass.spec.controllerName`.
    pub controller_name: String,
    /// The only GatewayClass that may be submitted.
    pub gateway_class_name: String,
    /// When set, the only Gateway that may be submitted.
    pub gateway: Option<ResourceId>,
    pub secret_manager: Arc<dyn SecretRequester>,
    /// Enables intake of Secrets.
    pub secret_store: Option<SharedSecretStore>,
    /// Resolves upstream endpoints. Defaults to the Services and
    /// EndpointSlices in the store.
    pub resolver: Option<Arc<dyn ServiceResolver>>,
    pub policies: PolicyRegistry,
}

/// Captures resource changes and compiles them on demand.
///
/// Intake and compilation share a single lock, so a compile never observes a
/// partially applied change.
pub struct ChangeProcessor {
    config: ProcessorConfig,
    metrics: ProcessorMetrics,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    store: Store,
    capturer: RelationshipCapturer,
    changed: bool,
}

// === impl ChangeProcessor ===

impl ChangeProcessor {
    pub fn new(config: ProcessorConfig, metrics: ProcessorMetrics) -> Self {
        Self {
            config,
            metrics,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Records the latest version of a resource.
    ///
    /// # Panics
    ///
    /// If the resource is a GatewayClass or Gateway other than the ones this
    /// controller manages, or of a kind that is not enabled.
    pub fn capture_upsert_change(&self, resource: Resource) {
        let kind = resource.kind();
        let id = resource.id();
        self.check_accepted(kind, &id);

        let mut inner = self.inner.lock();
        let changed = match resource {
            Resource::Secret(secret) => {
                if let Some(store) = &self.config.secret_store {
                    store.write().upsert(id.clone(), secret);
                }
                inner.capturer.exists(kind, &id)
            }
            resource if kind.tracks_generation() => {
                inner.capturer.capture(&resource);
                inner.store.upsert(resource)
            }
            resource => {
                inner.capturer.capture(&resource);
                inner.store.upsert(resource);
                inner.capturer.exists(kind, &id)
            }
        };
        self.record(&mut inner, kind, &id, "upsert", changed);
    }

    /// Records the deletion of a resource.
    ///
    /// # Panics
    ///
    /// Under the same conditions as [`Self::capture_upsert_change`].
    pub fn capture_delete_change(&self, kind: Kind, id: ResourceId) {
        self.check_accepted(kind, &id);

        let mut inner = self.inner.lock();
        let changed = match kind {
            Kind::Secret => {
                if let Some(store) = &self.config.secret_store {
                    store.write().delete(&id);
                }
                inner.capturer.exists(kind, &id)
            }
            kind if kind.tracks_generation() => {
                inner.capturer.remove(kind, &id);
                inner.store.delete(kind, &id)
            }
            kind => {
                // Whether the resource was referenced must be known before
                // its relationships are forgotten.
                let referenced = inner.capturer.exists(kind, &id);
                inner.capturer.remove(kind, &id);
                inner.store.delete(kind, &id) && referenced
            }
        };
        self.record(&mut inner, kind, &id, "delete", changed);
    }

    /// Rebuilds the configuration and statuses if a captured change may
    /// affect them.
    ///
    /// Returns `false` with empty outputs when nothing changed since the last
    /// call.
    pub fn process(&self) -> (bool, Configuration, Statuses) {
        let mut inner = self.inner.lock();
        if !inner.changed {
            return (false, Configuration::default(), Statuses::default());
        }
        inner.changed = false;

        let graph = GraphBuilder {
            controller_name: &self.config.controller_name,
            gateway_class_name: &self.config.gateway_class_name,
            secrets: &*self.config.secret_manager,
            policies: &self.config.policies,
        }
        .build(&inner.store);

        let store_resolver = StoreResolver::new(&inner.store);
        let resolver: &dyn ServiceResolver = match &self.config.resolver {
            Some(resolver) => &**resolver,
            None => &store_resolver,
        };
        let configuration = build_configuration(&graph, resolver, &self.config.policies);
        let statuses = build_statuses(&graph);

        self.metrics.rebuilt();
        tracing::debug!(
            http_servers = configuration.http_servers.len(),
            ssl_servers = configuration.ssl_servers.len(),
            upstreams = configuration.upstreams.len(),
            "Rebuilt configuration"
        );
        (true, configuration, statuses)
    }

    fn check_accepted(&self, kind: Kind, id: &ResourceId) {
        match kind {
            Kind::GatewayClass if id.name != self.config.gateway_class_name => panic!(
                "GatewayClass {id} does not match the managed GatewayClass {}",
                self.config.gateway_class_name
            ),
            Kind::Gateway => {
                if let Some(gateway) = &self.config.gateway {
                    if id != gateway {
                        panic!("Gateway {id} does not match the managed Gateway {gateway}");
                    }
                }
            }
            Kind::Secret if self.config.secret_store.is_none() => {
                panic!("resource kind {kind} is not supported: {id}")
            }
            Kind::ClientSettingsPolicy
                if !self.config.policies.contains(PolicyKind::ClientSettings) =>
            {
                panic!("resource kind {kind} is not supported: {id}")
            }
            _ => {}
        }
    }

    fn record(
        &self,
        inner: &mut Inner,
        kind: Kind,
        id: &ResourceId,
        op: &'static str,
        changed: bool,
    ) {
        if kind != Kind::Secret {
            self.metrics.set_store_size(kind, inner.store.len(kind));
        }
        if changed {
            tracing::debug!(%kind, namespace = %id.namespace, name = %id.name, op, "Captured change");
            self.metrics.changed(kind, op);
            inner.changed = true;
        } else {
            tracing::trace!(%kind, namespace = %id.namespace, name = %id.name, op, "Ignored change");
            self.metrics.ignored(kind);
        }
    }
}

impl std::fmt::Debug for ChangeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeProcessor")
            .field("controller_name", &self.config.controller_name)
            .field("gateway_class_name", &self.config.gateway_class_name)
            .field("gateway", &self.config.gateway)
            .finish_non_exhaustive()
    }
}
