use super::{listener, Listener, PolicyKey};
use crate::secrets::SecretRequester;
use ahash::AHashMap as HashMap;
use ngx_gateway_controller_core::{ObjectRef, ResourceId};
use ngx_gateway_controller_k8s_api::gateway as k8s;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Gateway {
    pub source: Arc<k8s::Gateway>,
    pub id: ResourceId,
    /// Listeners by name.
    pub listeners: HashMap<String, Listener>,
    /// Policies attached to the Gateway, ordered by precedence.
    pub policies: Vec<PolicyKey>,
}

// === impl Gateway ===

impl Gateway {
    pub(super) fn build(source: Arc<k8s::Gateway>, secrets: &dyn SecretRequester) -> Self {
        Self {
            id: ResourceId::of(source.as_ref()),
            listeners: listener::build_listeners(&source, secrets),
            policies: vec![],
            source,
        }
    }
}

/// Among the Gateways of the managed class, the oldest one wins; ties are
/// broken by namespace and then name. All other Gateways of the class are
/// ignored.
pub(super) fn select_winner<'g>(
    gateways: impl Iterator<Item = &'g Arc<k8s::Gateway>>,
    gateway_class_name: &str,
) -> (
    Option<Arc<k8s::Gateway>>,
    HashMap<ResourceId, Arc<k8s::Gateway>>,
) {
    let mut candidates = gateways
        .filter(|gw| gw.spec.gateway_class_name == gateway_class_name)
        .map(|gw| (ObjectRef::of(gw.as_ref()), gw.clone()))
        .collect::<Vec<_>>();
    candidates.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut candidates = candidates.into_iter();
    let winner = candidates.next().map(|(_, gw)| gw);
    let ignored = candidates.map(|(oref, gw)| (oref.id, gw)).collect();
    (winner, ignored)
}
