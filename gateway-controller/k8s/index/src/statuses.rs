//! Status records derived from a [`Graph`].

use crate::{
    conditions::{Condition, REASON_INVALID_PARAMETERS},
    graph::{Graph, Listener},
};
use ngx_gateway_controller_core::ResourceId;
use ngx_gateway_controller_k8s_api::{gateway::Condition as ApiCondition, ResourceExt};
use serde::Serialize;

/// The statuses of every resource in a graph, in a stable order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statuses {
    pub gateway_class: Option<GatewayClassStatus>,
    pub gateway: Option<GatewayStatus>,
    pub ignored_gateways: Vec<ObjectStatus>,
    pub http_routes: Vec<HttpRouteStatus>,
    pub policies: Vec<PolicyStatus>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayClassStatus {
    pub name: String,
    pub observed_generation: Option<i64>,
    pub conditions: Vec<ApiCondition>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub namespace: String,
    pub name: String,
    pub observed_generation: Option<i64>,
    pub conditions: Vec<ApiCondition>,
    /// Listeners ordered by name.
    pub listeners: Vec<ListenerStatus>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerStatus {
    pub name: String,
    pub attached_routes: usize,
    pub conditions: Vec<ApiCondition>,
}

/// The status of a namespaced resource.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStatus {
    pub namespace: String,
    pub name: String,
    pub observed_generation: Option<i64>,
    pub conditions: Vec<ApiCondition>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteStatus {
    pub namespace: String,
    pub name: String,
    pub observed_generation: Option<i64>,
    /// Parent references ordered by Gateway and section name.
    pub parents: Vec<RouteParentStatus>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParentStatus {
    pub gateway_namespace: String,
    pub gateway_name: String,
    pub section_name: String,
    pub conditions: Vec<ApiCondition>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatus {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub observed_generation: Option<i64>,
    pub conditions: Vec<ApiCondition>,
}

pub fn build_statuses(graph: &Graph) -> Statuses {
    let gateway_class = graph.gateway_class.as_ref().map(|gc| {
        let generation = gc.source.metadata.generation;
        let condition = match &gc.error {
            None => Condition::accepted(),
            Some(error) => Condition::not_accepted(REASON_INVALID_PARAMETERS, error.clone()),
        };
        GatewayClassStatus {
            name: gc.source.name_any(),
            observed_generation: generation,
            conditions: vec![condition.into_api(generation)],
        }
    });

    let gateway = graph.gateway.as_ref().map(|gw| {
        let generation = gw.source.metadata.generation;
        let mut listeners = gw
            .listeners
            .values()
            .map(|l| listener_status(l, generation))
            .collect::<Vec<_>>();
        listeners.sort_by(|a, b| a.name.cmp(&b.name));
        GatewayStatus {
            namespace: gw.id.namespace.clone(),
            name: gw.id.name.clone(),
            observed_generation: generation,
            conditions: vec![Condition::accepted().into_api(generation)],
            listeners,
        }
    });

    let mut ignored_gateways = graph
        .ignored_gateways
        .iter()
        .map(|(id, gw)| {
            let generation = gw.metadata.generation;
            object_status(id, generation, vec![Condition::gateway_conflict()])
        })
        .collect::<Vec<_>>();
    ignored_gateways.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

    let mut http_routes = graph
        .routes
        .values()
        .map(|route| {
            let generation = route.source.metadata.generation;
            let mut parents = route
                .valid_parent_refs
                .iter()
                .map(|parent| {
                    // A partially invalid route reports its own acceptance.
                    let conditions = if route.conditions.is_empty() {
                        vec![Condition::accepted()]
                    } else {
                        route.conditions.clone()
                    };
                    (parent, conditions)
                })
                .chain(
                    route
                        .invalid_parent_refs
                        .iter()
                        .map(|(parent, condition)| (parent, vec![condition.clone()])),
                )
                .collect::<Vec<_>>();
            parents.sort_by(|(a, _), (b, _)| a.cmp(b));

            HttpRouteStatus {
                namespace: route.id.namespace.clone(),
                name: route.id.name.clone(),
                observed_generation: generation,
                parents: parents
                    .into_iter()
                    .map(|(parent, conditions)| RouteParentStatus {
                        gateway_namespace: parent.gateway.namespace.clone(),
                        gateway_name: parent.gateway.name.clone(),
                        section_name: parent.section_name.clone(),
                        conditions: into_api(conditions, generation),
                    })
                    .collect(),
            }
        })
        .collect::<Vec<_>>();
    http_routes.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

    let mut policies = graph
        .policies
        .iter()
        .map(|(key, policy)| {
            let generation = policy.source.generation();
            let conditions = if policy.valid {
                vec![Condition::accepted()]
            } else {
                policy.conditions.clone()
            };
            PolicyStatus {
                kind: key.kind.to_string(),
                namespace: key.id.namespace.clone(),
                name: key.id.name.clone(),
                observed_generation: generation,
                conditions: into_api(conditions, generation),
            }
        })
        .collect::<Vec<_>>();
    policies.sort_by(|a, b| {
        (&a.kind, &a.namespace, &a.name).cmp(&(&b.kind, &b.namespace, &b.name))
    });

    Statuses {
        gateway_class,
        gateway,
        ignored_gateways,
        http_routes,
        policies,
    }
}

fn listener_status(listener: &Listener, generation: Option<i64>) -> ListenerStatus {
    let conditions = if listener.valid {
        vec![Condition::accepted(), Condition::resolved_refs()]
    } else {
        listener.conditions.clone()
    };
    ListenerStatus {
        name: listener.name().to_string(),
        attached_routes: listener.routes.len(),
        conditions: into_api(conditions, generation),
    }
}

fn object_status(id: &ResourceId, generation: Option<i64>, conditions: Vec<Condition>) -> ObjectStatus {
    ObjectStatus {
        namespace: id.namespace.clone(),
        name: id.name.clone(),
        observed_generation: generation,
        conditions: into_api(conditions, generation),
    }
}

fn into_api(conditions: Vec<Condition>, generation: Option<i64>) -> Vec<ApiCondition> {
    conditions
        .into_iter()
        .map(|c| c.into_api(generation))
        .collect()
}
