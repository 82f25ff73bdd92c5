mod client_settings;

pub use self::client_settings::*;

/// The API group of this controller's policy resources.
pub const POLICY_API_GROUP: &str = "gateway.nginx.org";

/// Identifies an API object within the policy's namespace.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub struct LocalPolicyTargetReference {
    pub group: String,
    pub kind: String,
    pub name: String,
}
