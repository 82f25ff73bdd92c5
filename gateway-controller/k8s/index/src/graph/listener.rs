use crate::{conditions::Condition, secrets::SecretRequester, validation};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use ngx_gateway_controller_core::{ResourceId, HTTPS_PORT, HTTP_PORT};
use ngx_gateway_controller_k8s_api::{
    gateway::{self as k8s, TLS_MODE_TERMINATE},
    ResourceExt,
};
use std::collections::hash_map::Entry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenerProtocol {
    Http,
    Https,
    Unsupported(String),
}

#[derive(Clone, Debug)]
pub struct Listener {
    pub source: k8s::Listener,
    pub protocol: ListenerProtocol,
    pub valid: bool,
    /// Reasons the listener is invalid.
    pub conditions: Vec<Condition>,
    /// Routes validly bound to this listener.
    pub routes: HashSet<ResourceId>,
    /// Hostnames of the bound routes accepted by this listener.
    pub accepted_hostnames: HashSet<String>,
    /// Where the data plane reads the listener's certificate. HTTPS only.
    pub secret_path: Option<String>,
}

// === impl ListenerProtocol ===

impl From<&str> for ListenerProtocol {
    fn from(protocol: &str) -> Self {
        match protocol {
            "HTTP" => Self::Http,
            "HTTPS" => Self::Https,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

// === impl Listener ===

impl Listener {
    fn new(source: k8s::Listener) -> Self {
        Self {
            protocol: ListenerProtocol::from(source.protocol.as_str()),
            source,
            valid: true,
            conditions: vec![],
            routes: HashSet::default(),
            accepted_hostnames: HashSet::default(),
            secret_path: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    /// The listener hostname; empty when it accepts any hostname.
    pub fn hostname(&self) -> &str {
        self.source.hostname.as_deref().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.source.port
    }

    fn invalidate(&mut self, condition: Condition) {
        self.valid = false;
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
    }

    fn validate_hostname(&mut self) {
        let hostname = self.hostname();
        if hostname.is_empty() {
            return;
        }
        if let Err(error) = validation::hostname(hostname) {
            self.invalidate(Condition::listener_unsupported_value(format!(
                "Invalid hostname: {error}"
            )));
        }
    }

    fn validate_http(&mut self) {
        if self.port() != HTTP_PORT {
            let message = format!(
                "Port {} is not supported for HTTP, use {HTTP_PORT}",
                self.port()
            );
            self.invalidate(Condition::listener_port_unavailable(message));
        }
        self.validate_hostname();
    }

    fn validate_https(&mut self, gateway_ns: &str, secrets: &dyn SecretRequester) {
        if self.port() != HTTPS_PORT {
            let message = format!(
                "Port {} is not supported for HTTPS, use {HTTPS_PORT}",
                self.port()
            );
            self.invalidate(Condition::listener_port_unavailable(message));
        }
        self.validate_hostname();

        let secret = match self.certificate_ref(gateway_ns) {
            Ok(secret) => secret,
            Err(condition) => {
                self.invalidate(condition);
                return;
            }
        };
        if !self.valid {
            return;
        }

        match secrets.request(&secret) {
            Ok(path) => self.secret_path = Some(path),
            Err(error) => self.invalidate(Condition::listener_invalid_certificate_ref(format!(
                "Failed to get the certificate {secret}: {error}"
            ))),
        }
    }

    /// The Secret holding the listener's certificate.
    fn certificate_ref(&self, gateway_ns: &str) -> Result<ResourceId, Condition> {
        let tls = self.source.tls.as_ref().ok_or_else(|| {
            Condition::listener_unsupported_value("tls must be defined for an HTTPS listener")
        })?;

        let mode = tls.mode.as_deref().unwrap_or(TLS_MODE_TERMINATE);
        if mode != TLS_MODE_TERMINATE {
            return Err(Condition::listener_unsupported_value(format!(
                "tls.mode {mode:?} is not supported, use {TLS_MODE_TERMINATE:?}"
            )));
        }

        let refs = tls.certificate_refs.as_deref().unwrap_or_default();
        let [cert] = refs else {
            return Err(Condition::listener_invalid_certificate_ref(format!(
                "Only 1 certificateRef is supported, got {}",
                refs.len()
            )));
        };

        let kind = cert.kind.as_deref().unwrap_or("Secret");
        if kind != "Secret" {
            return Err(Condition::listener_invalid_certificate_ref(format!(
                "Kind must be Secret, got {kind:?}"
            )));
        }
        if let Some(group) = cert.group.as_deref().filter(|g| !g.is_empty()) {
            return Err(Condition::listener_invalid_certificate_ref(format!(
                "Group must be empty, got {group:?}"
            )));
        }
        let namespace = cert.namespace.as_deref().unwrap_or(gateway_ns);
        if namespace != gateway_ns {
            return Err(Condition::listener_invalid_certificate_ref(
                "Referenced Secret must belong to the same namespace as the Gateway",
            ));
        }

        Ok(ResourceId::new(namespace, cert.name.clone()))
    }
}

/// Builds and validates the listeners of a Gateway.
///
/// Listeners on the same port must use distinct hostnames. When a listener
/// reuses the hostname of an earlier one, both become invalid.
pub(super) fn build_listeners(
    gateway: &k8s::Gateway,
    secrets: &dyn SecretRequester,
) -> HashMap<String, Listener> {
    let namespace = gateway.namespace().unwrap_or_default();
    let has_addresses = gateway
        .spec
        .addresses
        .as_ref()
        .map_or(false, |addrs| !addrs.is_empty());

    let mut listeners = HashMap::<String, Listener>::default();
    let mut hostnames = HashMap::<(u16, String), String>::default();

    for source in &gateway.spec.listeners {
        let mut listener = Listener::new(source.clone());
        if has_addresses {
            listener.invalidate(Condition::listener_unsupported_address());
        }

        match listener.protocol.clone() {
            ListenerProtocol::Http => listener.validate_http(),
            ListenerProtocol::Https => listener.validate_https(&namespace, secrets),
            ListenerProtocol::Unsupported(protocol) => {
                listener.invalidate(Condition::listener_unsupported_protocol(format!(
                    "Protocol {protocol:?} is not supported, use \"HTTP\" or \"HTTPS\""
                )));
            }
        }

        let hostname = listener.hostname().to_string();
        match hostnames.entry((listener.port(), hostname.clone())) {
            Entry::Occupied(holder) => {
                let message = format!(
                    "Multiple listeners for the same port use the same hostname {hostname:?}; \
                     ensure only one listener uses that hostname"
                );
                if let Some(held) = listeners.get_mut(holder.get()) {
                    held.invalidate(Condition::listener_hostname_conflict(message.clone()));
                    held.secret_path = None;
                }
                listener.invalidate(Condition::listener_hostname_conflict(message));
                listener.secret_path = None;
            }
            Entry::Vacant(entry) => {
                entry.insert(source.name.clone());
            }
        }

        listeners.insert(source.name.clone(), listener);
    }

    listeners
}
