use crate::index::Resource;
use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Deserialize};
use std::{fs, path::Path};
use tracing::debug;

/// Reads the resources of a multi-document YAML manifest.
pub(crate) fn read(path: &Path) -> Result<Vec<Resource>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    parse(&text)
}

/// Parses each document into a resource the processor consumes. Empty
/// documents and kinds the processor does not consume are skipped.
pub(crate) fn parse(text: &str) -> Result<Vec<Resource>> {
    let mut resources = vec![];
    for (idx, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .with_context(|| format!("document {idx} is not valid YAML"))?;
        if value.is_null() {
            continue;
        }

        let kind = match value.get("kind").and_then(serde_yaml::Value::as_str) {
            Some(kind) => kind.to_string(),
            None => bail!("document {idx} has no kind"),
        };
        let resource = match kind.as_str() {
            "GatewayClass" => Resource::GatewayClass(decode(idx, &kind, value)?),
            "Gateway" => Resource::Gateway(decode(idx, &kind, value)?),
            "HTTPRoute" => Resource::HttpRoute(decode(idx, &kind, value)?),
            "Service" => Resource::Service(decode(idx, &kind, value)?),
            "EndpointSlice" => Resource::EndpointSlice(decode(idx, &kind, value)?),
            "Secret" => Resource::Secret(decode(idx, &kind, value)?),
            "ClientSettingsPolicy" => Resource::ClientSettingsPolicy(decode(idx, &kind, value)?),
            _ => {
                debug!(%kind, document = idx, "Skipping unsupported kind");
                continue;
            }
        };
        resources.push(resource);
    }
    Ok(resources)
}

fn decode<T: DeserializeOwned>(idx: usize, kind: &str, value: serde_yaml::Value) -> Result<T> {
    serde_yaml::from_value(value).with_context(|| format!("document {idx} is not a valid {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Kind;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_supported_kinds() {
        let text = r#"
apiVersion: gateway.networking.k8s.io/v1beta1
kind: GatewayClass
metadata:
  name: nginx
spec:
  controllerName: gateway.nginx.org/nginx-gateway-controller
---
apiVersion: gateway.networking.k8s.io/v1beta1
kind: Gateway
metadata:
  name: gateway
  namespace: default
spec:
  gatewayClassName: nginx
  listeners:
    - name: http
      port: 80
      protocol: HTTP
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: unrelated
  namespace: default
---
apiVersion: gateway.networking.k8s.io/v1beta1
kind: HTTPRoute
metadata:
  name: coffee
  namespace: default
spec:
  parentRefs:
    - name: gateway
  hostnames:
    - cafe.example.com
  rules:
    - matches:
        - path:
            type: PathPrefix
            value: /coffee
      backendRefs:
        - name: coffee
          port: 80
---
apiVersion: v1
kind: Service
metadata:
  name: coffee
  namespace: default
spec:
  ports:
    - port: 80
      targetPort: 8080
"#;
        let resources = parse(text).expect("manifest must parse");
        let found = resources
            .iter()
            .map(|r| (r.kind(), r.id().to_string()))
            .collect::<Vec<_>>();
        assert_eq!(
            found,
            vec![
                (Kind::GatewayClass, "nginx".to_string()),
                (Kind::Gateway, "default/gateway".to_string()),
                (Kind::HttpRoute, "default/coffee".to_string()),
                (Kind::Service, "default/coffee".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_documents_without_kind() {
        let error = parse("metadata:\n  name: nameless\n").expect_err("kind is required");
        assert_eq!(error.to_string(), "document 0 has no kind");
    }

    #[test]
    fn reports_malformed_resources() {
        let text = "apiVersion: gateway.networking.k8s.io/v1beta1\nkind: Gateway\nmetadata:\n  name: gateway\nspec:\n  listeners: []\n";
        let error = parse(text).expect_err("gatewayClassName is required");
        assert_eq!(error.to_string(), "document 0 is not a valid Gateway");
    }
}
