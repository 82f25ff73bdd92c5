use ahash::AHashMap as HashMap;
use ngx_gateway_controller_core::ResourceId;
use ngx_gateway_controller_k8s_api::Secret;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";
pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

pub type SharedSecretStore = Arc<RwLock<SecretStore>>;

/// Resolves the TLS secret referenced by an HTTPS listener to the path the
/// data plane reads it from.
pub trait SecretRequester: Send + Sync {
    fn request(&self, id: &ResourceId) -> Result<String, SecretError>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret {0} does not exist")]
    NotFound(ResourceId),

    #[error("secret {0} is not valid; must be of type kubernetes.io/tls")]
    NotTls(ResourceId),

    #[error("secret {id} is not valid; {key} is missing or empty")]
    MissingData { id: ResourceId, key: &'static str },
}

/// Holds the latest version of each Secret.
#[derive(Debug, Default)]
pub struct SecretStore {
    secrets: HashMap<ResourceId, Arc<Secret>>,
}

/// Hands out disk paths for requested secrets and remembers the requests, so
/// that the requested secrets can be written out when the configuration is
/// applied.
#[derive(Debug)]
pub struct SecretDiskMemoryManager {
    dir: String,
    store: SharedSecretStore,
    requested: Mutex<HashMap<ResourceId, RequestedSecret>>,
}

/// A valid TLS secret that was requested, with the path it is served from.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestedSecret {
    pub id: ResourceId,
    pub path: String,
    pub secret: Arc<Secret>,
}

// === impl SecretStore ===

impl SecretStore {
    pub fn shared() -> SharedSecretStore {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn upsert(&mut self, id: ResourceId, secret: Secret) {
        self.secrets.insert(id, Arc::new(secret));
    }

    pub fn delete(&mut self, id: &ResourceId) -> bool {
        self.secrets.remove(id).is_some()
    }

    pub fn get(&self, id: &ResourceId) -> Option<Arc<Secret>> {
        self.secrets.get(id).cloned()
    }
}

// === impl SecretDiskMemoryManager ===

impl SecretDiskMemoryManager {
    pub fn new(dir: impl Into<String>, store: SharedSecretStore) -> Self {
        Self {
            dir: dir.into(),
            store,
            requested: Mutex::new(HashMap::default()),
        }
    }

    /// Returns the secrets requested since the last call, sorted by identity.
    pub fn take_requested(&self) -> Vec<RequestedSecret> {
        let mut requested = self
            .requested
            .lock()
            .drain()
            .map(|(_, secret)| secret)
            .collect::<Vec<_>>();
        requested.sort_by(|a, b| a.id.cmp(&b.id));
        requested
    }

    fn path(&self, id: &ResourceId) -> String {
        format!(
            "{}/{}_{}",
            self.dir.trim_end_matches('/'),
            id.namespace,
            id.name
        )
    }
}

impl SecretRequester for SecretDiskMemoryManager {
    fn request(&self, id: &ResourceId) -> Result<String, SecretError> {
        let secret = self
            .store
            .read()
            .get(id)
            .ok_or_else(|| SecretError::NotFound(id.clone()))?;
        validate_tls(id, &secret)?;

        let path = self.path(id);
        self.requested.lock().insert(
            id.clone(),
            RequestedSecret {
                id: id.clone(),
                path: path.clone(),
                secret,
            },
        );
        Ok(path)
    }
}

fn validate_tls(id: &ResourceId, secret: &Secret) -> Result<(), SecretError> {
    if secret.type_.as_deref() != Some(TLS_SECRET_TYPE) {
        return Err(SecretError::NotTls(id.clone()));
    }
    for key in [TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY] {
        let present = secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .map_or(false, |value| !value.0.is_empty());
        if !present {
            return Err(SecretError::MissingData {
                id: id.clone(),
                key,
            });
        }
    }
    Ok(())
}
