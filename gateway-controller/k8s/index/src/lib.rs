//! Gateway Controller Index
//!
//! The index compiles the cluster's Gateway API resources into data-plane
//! configuration. It holds the latest version of each of the following
//! resources:
//!
//! - The `GatewayClass` managed by this controller. It is valid when its
//!   `controllerName` names this controller.
//! - Each `Gateway` of that class. The oldest one wins and its listeners are
//!   configured; the others are ignored and only reported in statuses.
//! - Each `HTTPRoute`, bound to the winning Gateway's listeners through its
//!   parent references.
//! - The `Service`s and `EndpointSlice`s referenced by routes, used to
//!   resolve upstream endpoints.
//! - The `Secret`s referenced by HTTPS listeners.
//! - `ClientSettingsPolicy` resources attached to Gateways and routes.
//!
//! ```text
//! [ GatewayClass ] <- [ Gateway ] <- [ Listener ] <- [ HTTPRoute ] -> [ Service ] <- [ EndpointSlice ]
//! ```
//!
//! Changes are captured by the [`ChangeProcessor`], which marks its store
//! dirty only when a change can affect the output. Processing a dirty store
//! builds a [`Graph`], from which the [`Configuration`] and [`Statuses`] are
//! derived. Nothing but the store survives between calls.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod conditions;
pub mod configuration;
pub mod graph;
pub mod metrics;
pub mod policies;
mod processor;
mod relationship;
pub mod resolver;
pub mod secrets;
pub mod statuses;
mod store;
mod validation;


pub use self::{
    configuration::build_configuration,
    graph::{Graph, GraphBuilder},
    metrics::ProcessorMetrics,
    processor::{ChangeProcessor, ProcessorConfig},
    resolver::{ResolveError, ServiceResolver, StoreResolver},
    secrets::{SecretDiskMemoryManager, SecretError, SecretRequester, SecretStore, SharedSecretStore},
    statuses::{build_statuses, Statuses},
    store::{Kind, Resource, Store},
};
pub use ngx_gateway_controller_core::Configuration;
