use super::{Generator, PolicySource, Validator};
use crate::validation;
use ngx_gateway_controller_core::Directive;
use ngx_gateway_controller_k8s_api::{
    policy::{ClientBody, ClientKeepAlive, ClientKeepAliveTimeout, ClientSettingsPolicySpec},
    GATEWAY_API_GROUP,
};

#[derive(Copy, Clone, Debug, Default)]
pub struct ClientSettingsValidator;

#[derive(Copy, Clone, Debug, Default)]
pub struct ClientSettingsGenerator;

// === impl ClientSettingsValidator ===

impl Validator for ClientSettingsValidator {
    fn validate(&self, policy: &PolicySource) -> Vec<String> {
        let PolicySource::ClientSettings(policy) = policy;
        let spec = &policy.spec;
        let mut errors = vec![];

        let target = &spec.target_ref;
        if target.group != GATEWAY_API_GROUP {
            errors.push(format!(
                "spec.targetRef.group: {:?} is not supported, use {GATEWAY_API_GROUP:?}",
                target.group
            ));
        }
        if !matches!(target.kind.as_str(), "Gateway" | "HTTPRoute") {
            errors.push(format!(
                "spec.targetRef.kind: {:?} is not supported, use \"Gateway\" or \"HTTPRoute\"",
                target.kind
            ));
        }

        if let Some(body) = &spec.body {
            if let Some(size) = &body.max_size {
                push_err(&mut errors, "spec.body.maxSize", validation::size(size));
            }
            if let Some(timeout) = &body.timeout {
                push_err(&mut errors, "spec.body.timeout", validation::duration(timeout));
            }
        }

        if let Some(keep_alive) = &spec.keep_alive {
            if let Some(time) = &keep_alive.time {
                push_err(&mut errors, "spec.keepAlive.time", validation::duration(time));
            }
            if let Some(timeout) = &keep_alive.timeout {
                if let Some(server) = &timeout.server {
                    push_err(
                        &mut errors,
                        "spec.keepAlive.timeout.server",
                        validation::duration(server),
                    );
                }
                if let Some(header) = &timeout.header {
                    push_err(
                        &mut errors,
                        "spec.keepAlive.timeout.header",
                        validation::duration(header),
                    );
                    if timeout.server.is_none() {
                        errors.push(
                            "spec.keepAlive.timeout: header cannot be set without server"
                                .to_string(),
                        );
                    }
                }
            }
        }

        errors
    }

    fn conflicts(&self, a: &PolicySource, b: &PolicySource) -> bool {
        let (PolicySource::ClientSettings(a), PolicySource::ClientSettings(b)) = (a, b);
        let (a, b) = (&a.spec, &b.spec);

        let body = |spec: &ClientSettingsPolicySpec| spec.body.clone().unwrap_or_default();
        let keep_alive =
            |spec: &ClientSettingsPolicySpec| spec.keep_alive.clone().unwrap_or_default();
        let (a_body, b_body) = (body(a), body(b));
        let (a_ka, b_ka) = (keep_alive(a), keep_alive(b));

        both(&a_body.max_size, &b_body.max_size)
            || both(&a_body.timeout, &b_body.timeout)
            || both(&a_ka.requests, &b_ka.requests)
            || both(&a_ka.time, &b_ka.time)
            || both(&a_ka.timeout, &b_ka.timeout)
    }
}

fn push_err(errors: &mut Vec<String>, field: &str, result: anyhow::Result<()>) {
    if let Err(error) = result {
        errors.push(format!("{field}: {error}"));
    }
}

fn both<T>(a: &Option<T>, b: &Option<T>) -> bool {
    a.is_some() && b.is_some()
}

// === impl ClientSettingsGenerator ===

impl Generator for ClientSettingsGenerator {
    fn generate(&self, policy: &PolicySource) -> Vec<Directive> {
        let PolicySource::ClientSettings(policy) = policy;
        let mut directives = vec![];

        if let Some(ClientBody { max_size, timeout }) = &policy.spec.body {
            if let Some(size) = max_size {
                directives.push(Directive::new("client_max_body_size", [size]));
            }
            if let Some(timeout) = timeout {
                directives.push(Directive::new("client_body_timeout", [timeout]));
            }
        }

        if let Some(ClientKeepAlive {
            requests,
            time,
            timeout,
        }) = &policy.spec.keep_alive
        {
            if let Some(requests) = requests {
                directives.push(Directive::new("keepalive_requests", [requests.to_string()]));
            }
            if let Some(time) = time {
                directives.push(Directive::new("keepalive_time", [time]));
            }
            if let Some(ClientKeepAliveTimeout {
                server: Some(server),
                header,
            }) = timeout
            {
                let params = Some(server).into_iter().chain(header.as_ref());
                directives.push(Directive::new("keepalive_timeout", params));
            }
        }

        directives
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngx_gateway_controller_k8s_api::{
        policy::{ClientSettingsPolicy, LocalPolicyTargetReference},
        ObjectMeta,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn policy(spec: ClientSettingsPolicySpec) -> PolicySource {
        PolicySource::ClientSettings(Arc::new(ClientSettingsPolicy {
            metadata: ObjectMeta {
                namespace: Some("test".to_string()),
                name: Some("settings".to_string()),
                ..Default::default()
            },
            spec,
        }))
    }

    fn target(kind: &str) -> LocalPolicyTargetReference {
        LocalPolicyTargetReference {
            group: GATEWAY_API_GROUP.to_string(),
            kind: kind.to_string(),
            name: "gateway".to_string(),
        }
    }

    #[test]
    fn generates_directives() {
        let policy = policy(ClientSettingsPolicySpec {
            target_ref: target("Gateway"),
            body: Some(ClientBody {
                max_size: Some("10m".to_string()),
                timeout: Some("30s".to_string()),
            }),
            keep_alive: Some(ClientKeepAlive {
                requests: Some(100),
                time: Some("1h".to_string()),
                timeout: Some(ClientKeepAliveTimeout {
                    server: Some("30s".to_string()),
                    header: Some("20s".to_string()),
                }),
            }),
        });

        assert!(ClientSettingsValidator.validate(&policy).is_empty());
        assert_eq!(
            ClientSettingsGenerator.generate(&policy),
            vec![
                Directive::new("client_max_body_size", ["10m"]),
                Directive::new("client_body_timeout", ["30s"]),
                Directive::new("keepalive_requests", ["100"]),
                Directive::new("keepalive_time", ["1h"]),
                Directive::new("keepalive_timeout", ["30s", "20s"]),
            ]
        );
    }

    #[test]
    fn rejects_invalid_fields() {
        let policy = policy(ClientSettingsPolicySpec {
            target_ref: target("Service"),
            body: Some(ClientBody {
                max_size: Some("10 MB".to_string()),
                timeout: None,
            }),
            keep_alive: Some(ClientKeepAlive {
                timeout: Some(ClientKeepAliveTimeout {
                    server: None,
                    header: Some("20s".to_string()),
                }),
                ..Default::default()
            }),
        });

        let errors = ClientSettingsValidator.validate(&policy);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].starts_with("spec.targetRef.kind"));
        assert!(errors[1].starts_with("spec.body.maxSize"));
        assert!(errors[2].contains("header cannot be set without server"));
    }

    #[test]
    fn conflicts_on_shared_fields() {
        let body = policy(ClientSettingsPolicySpec {
            target_ref: target("Gateway"),
            body: Some(ClientBody {
                max_size: Some("1m".to_string()),
                timeout: None,
            }),
            keep_alive: None,
        });
        let other_body = policy(ClientSettingsPolicySpec {
            target_ref: target("Gateway"),
            body: Some(ClientBody {
                max_size: Some("2m".to_string()),
                timeout: None,
            }),
            keep_alive: None,
        });
        let keep_alive = policy(ClientSettingsPolicySpec {
            target_ref: target("Gateway"),
            body: None,
            keep_alive: Some(ClientKeepAlive {
                requests: Some(10),
                ..Default::default()
            }),
        });

        assert!(ClientSettingsValidator.conflicts(&body, &other_body));
        assert!(!ClientSettingsValidator.conflicts(&body, &keep_alive));
    }
}
