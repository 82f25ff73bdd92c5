use ngx_gateway_controller_k8s_api::gateway as k8s;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct GatewayClass {
    pub source: Arc<k8s::GatewayClass>,
    pub valid: bool,
    pub error: Option<String>,
}

// === impl GatewayClass ===

impl GatewayClass {
    /// A GatewayClass is valid only when it names this controller.
    pub(super) fn build(source: Arc<k8s::GatewayClass>, controller_name: &str) -> Self {
        let error = (source.spec.controller_name != controller_name).then(|| {
            format!(
                "Spec.ControllerName must be {controller_name} got {}",
                source.spec.controller_name
            )
        });
        Self {
            valid: error.is_none(),
            error,
            source,
        }
    }
}
