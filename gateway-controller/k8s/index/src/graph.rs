//! The graph of Gateway API resources, with each resource validated and
//! linked to the resources it refers to.

mod backend_refs;
mod gateway;
mod gateway_class;
mod listener;
mod policies;
mod route;


pub use self::{
    backend_refs::{BackendGroup, BackendRef},
    gateway::Gateway,
    gateway_class::GatewayClass,
    listener::{Listener, ListenerProtocol},
    policies::{Policy, PolicyKey, PolicyTarget},
    route::{ParentRef, Route, Rule},
};
use crate::{policies::PolicyRegistry, secrets::SecretRequester, Store};
use ahash::AHashMap as HashMap;
use ngx_gateway_controller_core::ResourceId;
use ngx_gateway_controller_k8s_api::gateway as k8s;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Graph {
    /// The GatewayClass managed by this controller, if it exists.
    pub gateway_class: Option<GatewayClass>,
    /// The winning Gateway of the managed class.
    pub gateway: Option<Gateway>,
    /// Gateways of the managed class that lost to the winner.
    pub ignored_gateways: HashMap<ResourceId, Arc<k8s::Gateway>>,
    /// Routes that reference the winning or an ignored Gateway.
    pub routes: HashMap<ResourceId, Route>,
    pub policies: HashMap<PolicyKey, Policy>,
}

/// Builds a [`Graph`] from the resources in a [`Store`].
pub struct GraphBuilder<'a> {
    pub controller_name: &'a str,
    pub gateway_class_name: &'a str,
    pub secrets: &'a dyn SecretRequester,
    pub policies: &'a PolicyRegistry,
}

// === impl GraphBuilder ===

impl GraphBuilder<'_> {
    pub fn build(&self, store: &Store) -> Graph {
        let gateway_class = store
            .gateway_classes
            .get(&ResourceId::new("", self.gateway_class_name))
            .map(|gc| GatewayClass::build(gc.clone(), self.controller_name));

        let (winner, ignored_gateways) =
            gateway::select_winner(store.gateways.values(), self.gateway_class_name);
        let mut gateway = winner.map(|gw| Gateway::build(gw, self.secrets));

        let routes = route::bind_routes(store, gateway.as_mut(), &ignored_gateways);

        let mut graph = Graph {
            gateway_class,
            gateway,
            ignored_gateways,
            routes,
            policies: HashMap::default(),
        };
        policies::attach(&mut graph, store, self.policies);
        graph
    }
}
