use super::Graph;
use crate::{
    conditions::{self, Condition},
    policies::{PolicyKind, PolicyRegistry, PolicySource},
    Store,
};
use ahash::AHashMap as HashMap;
use ngx_gateway_controller_core::ResourceId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyKey {
    pub kind: PolicyKind,
    pub id: ResourceId,
}

/// The resource a policy applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PolicyTarget {
    Gateway(ResourceId),
    HttpRoute(ResourceId),
    Unsupported,
}

#[derive(Clone, Debug)]
pub struct Policy {
    pub source: PolicySource,
    pub target: PolicyTarget,
    pub valid: bool,
    pub conditions: Vec<Condition>,
}

// === impl Policy ===

impl Policy {
    fn invalidate(&mut self, condition: Condition) {
        self.valid = false;
        self.conditions.push(condition);
    }
}

/// Validates every stored policy and attaches the valid ones to their
/// targets.
///
/// Policies are considered oldest first. A policy that sets a field already
/// set by an accepted policy on the same target is rejected as conflicted.
pub(super) fn attach(graph: &mut Graph, store: &Store, registry: &PolicyRegistry) {
    let mut sources = store
        .client_settings_policies
        .values()
        .map(|p| PolicySource::ClientSettings(p.clone()))
        .collect::<Vec<_>>();
    sources.sort_by_key(|source| source.object_ref());

    let mut accepted = HashMap::<PolicyTarget, Vec<PolicySource>>::default();

    for source in sources {
        let handlers = registry.handlers(source.kind());
        let key = PolicyKey {
            kind: source.kind(),
            id: source.id(),
        };
        let target = policy_target(&source);
        let mut policy = Policy {
            source: source.clone(),
            target: target.clone(),
            valid: true,
            conditions: vec![],
        };

        let errors = handlers.validator.validate(&source);
        if !errors.is_empty() {
            policy.invalidate(Condition::not_accepted(
                conditions::REASON_INVALID,
                errors.join("; "),
            ));
        } else if !target_exists(graph, &target) {
            let target_ref = source.target_ref();
            policy.invalidate(Condition::not_accepted(
                conditions::REASON_TARGET_NOT_FOUND,
                format!("The target {} {} is not found", target_ref.kind, target_ref.name),
            ));
        } else {
            let peers = accepted.entry(target.clone()).or_default();
            if peers
                .iter()
                .any(|peer| handlers.validator.conflicts(peer, &source))
            {
                policy.invalidate(Condition::not_accepted(
                    conditions::CONFLICTED,
                    "Conflicts with another policy that targets the same resource",
                ));
            } else {
                peers.push(source);
                match &target {
                    PolicyTarget::Gateway(_) => {
                        if let Some(gateway) = graph.gateway.as_mut() {
                            gateway.policies.push(key.clone());
                        }
                    }
                    PolicyTarget::HttpRoute(id) => {
                        if let Some(route) = graph.routes.get_mut(id) {
                            route.policies.push(key.clone());
                        }
                    }
                    PolicyTarget::Unsupported => {}
                }
            }
        }

        graph.policies.insert(key, policy);
    }
}

fn policy_target(source: &PolicySource) -> PolicyTarget {
    let target = source.target_ref();
    let id = ResourceId::new(source.id().namespace, target.name.clone());
    match target.kind.as_str() {
        "Gateway" => PolicyTarget::Gateway(id),
        "HTTPRoute" => PolicyTarget::HttpRoute(id),
        _ => PolicyTarget::Unsupported,
    }
}

fn target_exists(graph: &Graph, target: &PolicyTarget) -> bool {
    match target {
        PolicyTarget::Gateway(id) => graph.gateway.as_ref().map_or(false, |gw| gw.id == *id),
        PolicyTarget::HttpRoute(id) => graph.routes.contains_key(id),
        PolicyTarget::Unsupported => false,
    }
}
