//! Policies attach data-plane settings to Gateways and routes.
//!
//! Each policy kind registers a [`Validator`] and a [`Generator`] with the
//! [`PolicyRegistry`]. The registry is populated at startup by the same code
//! that defines the kinds, so looking up an unregistered kind is a bug.

mod client_settings;

pub use self::client_settings::{ClientSettingsGenerator, ClientSettingsValidator};
use ahash::AHashMap as HashMap;
use ngx_gateway_controller_core::{Directive, ObjectRef, ResourceId};
use ngx_gateway_controller_k8s_api::policy::{ClientSettingsPolicy, LocalPolicyTargetReference};
use std::{fmt, sync::Arc};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyKind {
    ClientSettings,
}

/// A policy resource of any registered kind.
#[derive(Clone, Debug)]
pub enum PolicySource {
    ClientSettings(Arc<ClientSettingsPolicy>),
}

pub trait Validator: Send + Sync {
    /// Returns the reasons the policy is invalid.
    fn validate(&self, policy: &PolicySource) -> Vec<String>;

    /// Whether two policies targeting the same resource configure the same
    /// settings.
    fn conflicts(&self, a: &PolicySource, b: &PolicySource) -> bool;
}

pub trait Generator: Send + Sync {
    fn generate(&self, policy: &PolicySource) -> Vec<Directive>;
}

pub struct PolicyHandlers {
    pub validator: Box<dyn Validator>,
    pub generator: Box<dyn Generator>,
}

#[derive(Default)]
pub struct PolicyRegistry {
    handlers: HashMap<PolicyKind, PolicyHandlers>,
}

// === impl PolicyKind ===

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientSettings => f.write_str("ClientSettingsPolicy"),
        }
    }
}

// === impl PolicySource ===

impl PolicySource {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::ClientSettings(_) => PolicyKind::ClientSettings,
        }
    }

    pub fn id(&self) -> ResourceId {
        match self {
            Self::ClientSettings(p) => ResourceId::of(p.as_ref()),
        }
    }

    pub fn object_ref(&self) -> ObjectRef {
        match self {
            Self::ClientSettings(p) => ObjectRef::of(p.as_ref()),
        }
    }

    pub fn generation(&self) -> Option<i64> {
        match self {
            Self::ClientSettings(p) => p.metadata.generation,
        }
    }

    pub fn target_ref(&self) -> &LocalPolicyTargetReference {
        match self {
            Self::ClientSettings(p) => &p.spec.target_ref,
        }
    }
}

// === impl PolicyRegistry ===

impl PolicyRegistry {
    /// A registry with every policy kind this controller supports.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(
            PolicyKind::ClientSettings,
            ClientSettingsValidator,
            ClientSettingsGenerator,
        );
        registry
    }

    pub fn register(
        &mut self,
        kind: PolicyKind,
        validator: impl Validator + 'static,
        generator: impl Generator + 'static,
    ) {
        self.handlers.insert(
            kind,
            PolicyHandlers {
                validator: Box::new(validator),
                generator: Box::new(generator),
            },
        );
    }

    pub fn contains(&self, kind: PolicyKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// # Panics
    ///
    /// If no handlers are registered for the kind.
    pub fn handlers(&self, kind: PolicyKind) -> &PolicyHandlers {
        match self.handlers.get(&kind) {
            Some(handlers) => handlers,
            None => panic!("no handlers registered for policy kind {kind}"),
        }
    }

    pub fn generate(&self, policy: &PolicySource) -> Vec<Directive> {
        self.handlers(policy.kind()).generator.generate(policy)
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = self.handlers.keys().collect::<Vec<_>>();
        kinds.sort();
        f.debug_struct("PolicyRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
