//! Prometheus metrics for the substrate runtime, registered once by the
//! embedder (the `sim` crate) and updated from [`crate::runtime::SimpleRuntime`].

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CommandKindLabel {
    pub kind: String,
}

/// The substrate's observable counters/histograms. Cheap to clone: every
/// handle is an `Arc` internally, matching `prometheus_client`'s own model.
#[derive(Clone)]
pub struct SubstrateMetrics {
    pub commands_emitted_total: Family<CommandKindLabel, Counter>,
    pub commands_applied_total: Family<CommandKindLabel, Counter>,
    pub sync_barriers_total: Counter,
    pub step_errors_total: Counter,
    pub step_duration_seconds: Histogram,
}

impl Default for SubstrateMetrics {
    fn default() -> Self {
        Self {
            commands_emitted_total: Default::default(),
            commands_applied_total: Default::default(),
            sync_barriers_total: Default::default(),
            step_errors_total: Default::default(),
            step_duration_seconds: Histogram::new(
                [0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0].into_iter(),
            ),
        }
    }
}

impl SubstrateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "substrate_commands_emitted",
            "CEP commands emitted by the command builder, by kind",
            self.commands_emitted_total.clone(),
        );
        registry.register(
            "substrate_commands_applied",
            "CEP commands folded into a weight by the command applier, by kind",
            self.commands_applied_total.clone(),
        );
        registry.register(
            "substrate_sync_barriers",
            "Sync barriers posted across all actors and mailboxes",
            self.sync_barriers_total.clone(),
        );
        registry.register(
            "substrate_step_errors",
            "Steps that aborted with an error",
            self.step_errors_total.clone(),
        );
        registry.register(
            "substrate_step_duration_seconds",
            "Wall-clock duration of SimpleRuntime::step",
            self.step_duration_seconds.clone(),
        );
    }

    pub fn observe_command_emitted(&self, kind: &str) {
        self.commands_emitted_total
            .get_or_create(&CommandKindLabel { kind: kind.to_string() })
            .inc();
    }

    pub fn observe_command_applied(&self, kind: &str) {
        self.commands_applied_total
            .get_or_create(&CommandKindLabel { kind: kind.to_string() })
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observing_commands_increments_the_right_label() {
        let metrics = SubstrateMetrics::new();
        metrics.observe_command_emitted("set_weight");
        metrics.observe_command_emitted("set_weight");
        metrics.observe_command_emitted("set_abcn");

        let count = metrics
            .commands_emitted_total
            .get_or_create(&CommandKindLabel { kind: "set_weight".to_string() })
            .get();
        assert_eq!(count, 2);
    }
}
