use super::LocalPolicyTargetReference;

/// ClientSettingsPolicy configures the connection between the client and the
/// data plane for the targeted Gateway or HTTPRoute.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    kube::CustomResource,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
)]
#[kube(
    group = "gateway.nginx.org",
    version = "v1alpha1",
    kind = "ClientSettingsPolicy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettingsPolicySpec {
    pub target_ref: LocalPolicyTargetReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ClientBody>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<ClientKeepAlive>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientBody {
    /// Maximum allowed size of the client request body, e.g. `10m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<String>,

    /// Timeout for reading the client request body, e.g. `30s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientKeepAlive {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<ClientKeepAliveTimeout>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientKeepAliveTimeout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}
