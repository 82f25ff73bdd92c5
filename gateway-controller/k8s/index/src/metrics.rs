use crate::store::Kind;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

/// Metrics describing the change processor's store and its rebuilds.
#[derive(Clone, Debug, Default)]
pub struct ProcessorMetrics {
    changes: Family<ChangeLabels, Counter>,
    ignored_changes: Family<KindLabels, Counter>,
    rebuilds: Counter,
    store_size: Family<KindLabels, Gauge>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ChangeLabels {
    kind: String,
    op: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabels {
    kind: String,
}

// === impl ProcessorMetrics ===

impl ProcessorMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let metrics = Self::default();
        prom.register(
            "processor_changes",
            "Count of changes that marked the store as changed",
            metrics.changes.clone(),
        );
        prom.register(
            "processor_ignored_changes",
            "Count of changes that could not affect the configuration",
            metrics.ignored_changes.clone(),
        );
        prom.register(
            "processor_rebuilds",
            "Count of graph rebuilds",
            metrics.rebuilds.clone(),
        );
        prom.register(
            "store_size",
            "Gauge of the number of resources in the store",
            metrics.store_size.clone(),
        );
        metrics
    }

    pub(crate) fn changed(&self, kind: Kind, op: &'static str) {
        self.changes
            .get_or_create(&ChangeLabels {
                kind: kind.to_string(),
                op,
            })
            .inc();
    }

    pub(crate) fn ignored(&self, kind: Kind) {
        self.ignored_changes
            .get_or_create(&KindLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    pub(crate) fn rebuilt(&self) {
        self.rebuilds.inc();
    }

    pub(crate) fn set_store_size(&self, kind: Kind, size: usize) {
        self.store_size
            .get_or_create(&KindLabels {
                kind: kind.to_string(),
            })
            .set(size as i64);
    }
}
