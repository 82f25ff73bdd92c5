use crate::{gateway::*, policy::*};
use pretty_assertions::assert_eq;

#[test]
fn parses_httproute() {
    let route: HttpRoute = serde_yaml::from_str(
        r#"
apiVersion: gateway.networking.k8s.io/v1beta1
kind: HTTPRoute
metadata:
  namespace: default
  name: coffee
spec:
  parentRefs:
  - name: gateway
    sectionName: http
  hostnames: ["cafe.example.com"]
  rules:
  - matches:
    - path:
        type: PathPrefix
        value: /coffee
      method: GET
      headers:
      - type: Exact
        name: version
        value: v2
    filters:
    - type: RequestRedirect
      requestRedirect:
        scheme: https
        statusCode: 301
    backendRefs:
    - name: coffee
      port: 80
      weight: 3
"#,
    )
    .expect("route must parse");

    let parent = &route.spec.parent_refs.as_ref().unwrap()[0];
    assert_eq!(parent.section_name.as_deref(), Some("http"));
    assert_eq!(parent.namespace, None);

    let rule = &route.spec.rules.as_ref().unwrap()[0];
    let m = &rule.matches.as_ref().unwrap()[0];
    assert_eq!(
        m.path,
        Some(HttpPathMatch::PathPrefix {
            value: "/coffee".to_string()
        })
    );
    assert_eq!(m.method.as_deref(), Some("GET"));
    assert_eq!(
        rule.filters,
        Some(vec![HttpRouteFilter::RequestRedirect {
            request_redirect: HttpRequestRedirectFilter {
                scheme: Some("https".to_string()),
                status_code: Some(301),
                ..Default::default()
            }
        }])
    );
    let backend = &rule.backend_refs.as_ref().unwrap()[0];
    assert_eq!(backend.port, Some(80));
    assert_eq!(backend.weight, Some(3));
    assert_eq!(backend.kind, None);
}

#[test]
fn parses_gateway_listeners() {
    let gw: Gateway = serde_yaml::from_str(
        r#"
apiVersion: gateway.networking.k8s.io/v1beta1
kind: Gateway
metadata:
  namespace: nginx-gateway
  name: gateway
spec:
  gatewayClassName: nginx
  listeners:
  - name: https
    port: 443
    protocol: HTTPS
    hostname: cafe.example.com
    tls:
      mode: Terminate
      certificateRefs:
      - kind: Secret
        name: cafe-secret
"#,
    )
    .expect("gateway must parse");

    let listener = &gw.spec.listeners[0];
    assert_eq!(listener.port, 443);
    assert_eq!(listener.hostname.as_deref(), Some("cafe.example.com"));
    let tls = listener.tls.as_ref().unwrap();
    assert_eq!(tls.mode.as_deref(), Some(TLS_MODE_TERMINATE));
    assert_eq!(tls.certificate_refs.as_ref().unwrap()[0].name, "cafe-secret");
}

#[test]
fn parses_client_settings_policy() {
    let policy: ClientSettingsPolicy = serde_yaml::from_str(
        r#"
apiVersion: gateway.nginx.org/v1alpha1
kind: ClientSettingsPolicy
metadata:
  namespace: default
  name: settings
spec:
  targetRef:
    group: gateway.networking.k8s.io
    kind: Gateway
    name: gateway
  body:
    maxSize: 10m
  keepAlive:
    requests: 100
    timeout:
      server: 30s
      header: 20s
"#,
    )
    .expect("policy must parse");

    assert_eq!(policy.spec.target_ref.kind, "Gateway");
    assert_eq!(
        policy.spec.body,
        Some(ClientBody {
            max_size: Some("10m".to_string()),
            timeout: None,
        })
    );
    let keep_alive = policy.spec.keep_alive.unwrap();
    assert_eq!(keep_alive.requests, Some(100));
    assert_eq!(
        keep_alive.timeout.unwrap().header.as_deref(),
        Some("20s")
    );
}
