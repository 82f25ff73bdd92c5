use ngx_gateway_controller_k8s_api::{ResourceExt, Time};
use std::{cmp::Ordering, fmt};

/// Identifies a namespaced resource.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

/// Identifies a resource along with its creation time. Older resources take
/// precedence: the oldest Gateway wins, and matches of older routes are
/// evaluated first when several routes share a host and path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ObjectRef {
    pub id: ResourceId,
    pub created: Option<Time>,
}

// === impl ResourceId ===

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Builds the identity of a namespaced resource. Cluster-scoped resources
    /// get an empty namespace.
    pub fn of<K: ResourceExt>(resource: &K) -> Self {
        Self::new(resource.namespace().unwrap_or_default(), resource.name_any())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            return write!(f, "{}", self.name);
        }
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// === impl ObjectRef ===

impl ObjectRef {
    pub fn of<K: ResourceExt>(resource: &K) -> Self {
        Self {
            id: ResourceId::of(resource),
            created: resource.creation_timestamp(),
        }
    }
}

impl PartialOrd for ObjectRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by creation timestamp, then namespace, then name.
impl Ord for ObjectRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created
            .cmp(&other.created)
            .then_with(|| self.id.cmp(&other.id))
    }
}
