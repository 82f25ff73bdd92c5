//! Status conditions, using the Gateway API vocabulary.

use ngx_gateway_controller_k8s_api::gateway as api;

pub const ACCEPTED: &str = "Accepted";
pub const CONFLICTED: &str = "Conflicted";
pub const RESOLVED_REFS: &str = "ResolvedRefs";

pub const REASON_ACCEPTED: &str = "Accepted";
pub const REASON_INVALID_PARAMETERS: &str = "InvalidParameters";
pub const REASON_GATEWAY_CONFLICT: &str = "GatewayConflict";
pub const REASON_UNSUPPORTED_ADDRESS: &str = "UnsupportedAddress";
pub const REASON_UNSUPPORTED_PROTOCOL: &str = "UnsupportedProtocol";
pub const REASON_PORT_UNAVAILABLE: &str = "PortUnavailable";
pub const REASON_UNSUPPORTED_VALUE: &str = "UnsupportedValue";
pub const REASON_HOSTNAME_CONFLICT: &str = "HostnameConflict";
pub const REASON_INVALID_CERTIFICATE_REF: &str = "InvalidCertificateRef";
pub const REASON_RESOLVED_REFS: &str = "ResolvedRefs";
pub const REASON_NO_MATCHING_PARENT: &str = "NoMatchingParent";
pub const REASON_NOT_ALLOWED_BY_LISTENERS: &str = "NotAllowedByListeners";
pub const REASON_NO_MATCHING_LISTENER_HOSTNAME: &str = "NoMatchingListenerHostname";
pub const REASON_GATEWAY_IGNORED: &str = "GatewayIgnored";
pub const REASON_PARTIALLY_INVALID: &str = "PartiallyInvalid";
pub const REASON_INVALID: &str = "Invalid";
pub const REASON_TARGET_NOT_FOUND: &str = "TargetNotFound";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub type_: &'static str,
    pub status: bool,
    pub reason: &'static str,
    pub message: String,
}

// === impl Condition ===

impl Condition {
    pub fn new(
        type_: &'static str,
        status: bool,
        reason: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_,
            status,
            reason,
            message: message.into(),
        }
    }

    pub fn accepted() -> Self {
        Self::new(ACCEPTED, true, REASON_ACCEPTED, "The resource is accepted")
    }

    pub fn not_accepted(reason: &'static str, message: impl Into<String>) -> Self {
        Self::new(ACCEPTED, false, reason, message)
    }

    pub fn gateway_conflict() -> Self {
        Self::not_accepted(
            REASON_GATEWAY_CONFLICT,
            "The resource is ignored due to a conflicting Gateway resource",
        )
    }

    pub fn listener_unsupported_protocol(message: impl Into<String>) -> Self {
        Self::not_accepted(REASON_UNSUPPORTED_PROTOCOL, message)
    }

    pub fn listener_port_unavailable(message: impl Into<String>) -> Self {
        Self::not_accepted(REASON_PORT_UNAVAILABLE, message)
    }

    pub fn listener_unsupported_value(message: impl Into<String>) -> Self {
        Self::not_accepted(REASON_UNSUPPORTED_VALUE, message)
    }

    pub fn listener_unsupported_address() -> Self {
        Self::not_accepted(
            REASON_UNSUPPORTED_ADDRESS,
            "Specifying Gateway addresses is not supported",
        )
    }

    pub fn listener_hostname_conflict(message: impl Into<String>) -> Self {
        Self::new(CONFLICTED, true, REASON_HOSTNAME_CONFLICT, message)
    }

    pub fn listener_invalid_certificate_ref(message: impl Into<String>) -> Self {
        Self::new(RESOLVED_REFS, false, REASON_INVALID_CERTIFICATE_REF, message)
    }

    pub fn resolved_refs() -> Self {
        Self::new(RESOLVED_REFS, true, REASON_RESOLVED_REFS, "All references are resolved")
    }

    pub fn route_no_matching_parent(section_name: &str) -> Self {
        Self::not_accepted(
            REASON_NO_MATCHING_PARENT,
            format!("Listener {section_name:?} is not found"),
        )
    }

    pub fn route_invalid_listener() -> Self {
        Self::not_accepted(REASON_NOT_ALLOWED_BY_LISTENERS, "Listener is invalid")
    }

    pub fn route_no_matching_listener_hostname() -> Self {
        Self::not_accepted(
            REASON_NO_MATCHING_LISTENER_HOSTNAME,
            "Listener hostname does not match the route hostnames",
        )
    }

    pub fn route_gateway_ignored() -> Self {
        Self::not_accepted(REASON_GATEWAY_IGNORED, "The Gateway is ignored by the controller")
    }

    pub fn route_unsupported_value(message: impl Into<String>) -> Self {
        Self::not_accepted(REASON_UNSUPPORTED_VALUE, message)
    }

    pub fn route_partially_invalid(message: impl Into<String>) -> Self {
        Self::new(ACCEPTED, true, REASON_PARTIALLY_INVALID, message)
    }

    pub fn into_api(self, observed_generation: Option<i64>) -> api::Condition {
        api::Condition {
            type_: self.type_.to_string(),
            status: if self.status { "True" } else { "False" }.to_string(),
            reason: self.reason.to_string(),
            message: self.message,
            observed_generation,
        }
    }
}
