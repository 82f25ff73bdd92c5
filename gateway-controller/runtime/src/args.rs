use crate::{
    core::{ResourceId, DEFAULT_CONTROLLER_NAME},
    index::{
        policies::PolicyRegistry, ChangeProcessor, ProcessorConfig, ProcessorMetrics, Resource,
        SecretDiskMemoryManager, SecretStore,
    },
    k8s::ResourceExt,
    manifest, nginx,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use prometheus_client::registry::Registry;
use std::{fs, path::PathBuf, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(
    name = "ngx-gateway-controller",
    about = "Compiles Gateway API resources into nginx configuration"
)]
pub struct Args {
    #[clap(long, default_value = "ngx_gateway=info,warn", env = "NGX_GATEWAY_LOG")]
    log_level: String,

    #[clap(long, value_enum, default_value = "plain")]
    log_format: LogFormat,

    /// Compared against `spec.controllerName` of the managed GatewayClass.
    #[clap(
        long,
        default_value = DEFAULT_CONTROLLER_NAME,
        env = "NGX_GATEWAY_CONTROLLER_NAME"
    )]
    controller_name: String,

    #[clap(long, default_value = "nginx")]
    gateway_class_name: String,

    /// Restricts the controller to a single Gateway, as `namespace/name`.
    #[clap(long)]
    gateway: Option<GatewayRef>,

    /// Directory in which TLS secrets are served from.
    #[clap(long, default_value = "/etc/nginx/secrets")]
    secrets_dir: String,

    /// A multi-document YAML manifest of the resources to compile.
    #[clap(long)]
    manifest: PathBuf,

    /// Writes the nginx configuration to this file instead of stdout.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Prints the computed statuses as JSON to stderr.
    #[clap(long)]
    statuses: bool,

    /// Writes the processor metrics in the OpenMetrics text format.
    #[clap(long)]
    metrics: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Clone, Debug)]
struct GatewayRef(ResourceId);

// === impl Args ===

impl Args {
    #[inline]
    pub fn parse_and_run() -> Result<()> {
        Self::parse().run()
    }

    pub fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            controller_name,
            gateway_class_name,
            gateway,
            secrets_dir,
            manifest,
            output,
            statuses,
            metrics,
        } = self;
        let gateway = gateway.map(|GatewayRef(id)| id);

        init_logging(&log_level, log_format)?;

        let resources = manifest::read(&manifest)?;
        info!(manifest = %manifest.display(), resources = resources.len(), "Loaded manifest");

        let mut prom = <Registry>::default();
        let processor_metrics =
            ProcessorMetrics::register(prom.sub_registry_with_prefix("ngx_gateway"));

        let secret_store = SecretStore::shared();
        let secret_manager = Arc::new(SecretDiskMemoryManager::new(
            secrets_dir,
            secret_store.clone(),
        ));
        let processor = ChangeProcessor::new(
            ProcessorConfig {
                controller_name,
                gateway_class_name: gateway_class_name.clone(),
                gateway: gateway.clone(),
                secret_manager: secret_manager.clone(),
                secret_store: Some(secret_store),
                resolver: None,
                policies: PolicyRegistry::with_defaults(),
            },
            processor_metrics,
        );

        for resource in resources {
            if !is_managed(&resource, &gateway_class_name, gateway.as_ref()) {
                debug!(kind = %resource.kind(), id = %resource.id(), "Skipping unmanaged resource");
                continue;
            }
            processor.capture_upsert_change(resource);
        }

        let (changed, configuration, computed) = processor.process();
        if !changed {
            info!("No resources to compile");
        }
        for secret in secret_manager.take_requested() {
            info!(secret = %secret.id, path = %secret.path, "Secret requested");
        }

        let text = nginx::generate(&configuration);
        match output {
            Some(path) => fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => print!("{text}"),
        }

        if statuses {
            let json = serde_json::to_string_pretty(&computed)?;
            eprintln!("{json}");
        }

        if let Some(path) = metrics {
            let mut encoded = String::new();
            prometheus_client::encoding::text::encode(&mut encoded, &prom)?;
            fs::write(&path, encoded)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        Ok(())
    }
}

/// Only the managed GatewayClass, and the selected Gateway when one is set,
/// may be submitted to the processor. Everything else is filtered out the way
/// a field-selected watch would.
fn is_managed(resource: &Resource, class_name: &str, gateway: Option<&ResourceId>) -> bool {
    match (resource, gateway) {
        (Resource::GatewayClass(class), _) => class.name_any() == class_name,
        (Resource::Gateway(gw), Some(id)) => ResourceId::of(gw) == *id,
        _ => true,
    }
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level).context("invalid log level")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow!(error))
}

// === impl GatewayRef ===

impl std::str::FromStr for GatewayRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self(ResourceId::new(ns, name)))
            }
            _ => bail!("gateway must be formatted as namespace/name: {s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::{
        gateway::{GatewayClass, GatewayClassSpec},
        ObjectMeta,
    };

    #[test]
    fn parses_gateway_refs() {
        let GatewayRef(id) = "default/gateway".parse().expect("must parse");
        assert_eq!(id, ResourceId::new("default", "gateway"));

        for invalid in ["gateway", "/gateway", "default/", "a/b/c"] {
            assert!(invalid.parse::<GatewayRef>().is_err(), "{invalid}");
        }
    }

    #[test]
    fn parses_defaults() {
        let args = Args::try_parse_from(["ngx-gateway-controller", "--manifest", "cafe.yaml"])
            .expect("must parse");
        assert_eq!(args.gateway_class_name, "nginx");
        assert_eq!(args.secrets_dir, "/etc/nginx/secrets");
        assert_eq!(args.log_format, LogFormat::Plain);
        assert!(args.gateway.is_none());
        assert!(!args.statuses);
    }

    #[test]
    fn filters_unmanaged_classes() {
        let class = |name: &str| {
            Resource::GatewayClass(GatewayClass::new(
                name,
                GatewayClassSpec {
                    controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
                    ..Default::default()
                },
            ))
        };
        assert!(is_managed(&class("nginx"), "nginx", None));
        assert!(!is_managed(&class("other"), "nginx", None));
    }

    #[test]
    fn filters_unselected_gateways() {
        let gateway = |ns: &str| {
            Resource::Gateway(crate::k8s::gateway::Gateway {
                metadata: ObjectMeta {
                    namespace: Some(ns.to_string()),
                    name: Some("gateway".to_string()),
                    ..Default::default()
                },
                spec: Default::default(),
            })
        };
        let selected = ResourceId::new("default", "gateway");
        assert!(is_managed(&gateway("default"), "nginx", Some(&selected)));
        assert!(!is_managed(&gateway("other"), "nginx", Some(&selected)));
        assert!(is_managed(&gateway("other"), "nginx", None));
    }
}
