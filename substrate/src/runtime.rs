//! `SimpleRuntime`: owns the CPP, the CEP chain, and the per-weight actor/
//! relay/mailbox pools; drives one computation step at a time.

use crate::actor::{self, CepActorHandle, InitPayload};
use crate::command::apply_cep_command;
use crate::mailbox::SubstrateCommandMailbox;
use crate::metrics::SubstrateMetrics;
#[cfg_attr(not(test), allow(unused_imports))]
use crate::registry::{Cep, CepRegistry, Cpp, CppRegistry};
use crate::relay::CepFaninRelay;
use protogonos_types::{CepCommand, Parameters, Pid, Spec, SubstrateError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One (weight, CEP) cell's wiring: the actor owning its `CepProcess`, the
/// per-fan-in-pid relays feeding it, and the scoped envelope identities
/// emitted commands are validated against.
struct CepCell {
    actor: CepActorHandle,
    relays: HashMap<Pid, CepFaninRelay>,
    fanin_pids: Vec<Pid>,
    scoped_id: Pid,
    scoped_substrate_pid: Pid,
}

/// The outcome of forwarding one step's fan-in into a `CepCell`.
enum CepStepOutcome {
    NoCommand,
    Command(CepCommand),
    /// The CEP name wasn't part of the reference command surface; fall back
    /// to the registered custom CEP's `apply(current, delta, params)`.
    EscapeHatch,
}

/// Wires a CPP, an ordered CEP chain, and per-weight actor/relay/mailbox
/// pools over a weight vector, applying commands with saturation.
pub struct SimpleRuntime {
    cpp: Arc<dyn Cpp>,
    cep_chain: Vec<String>,
    cep_registry: Arc<CepRegistry>,
    params: Parameters,
    global_fanin_pids: Vec<Pid>,
    weights: Vec<f64>,
    backup: Option<Vec<f64>>,
    cells: Vec<Vec<CepCell>>,
    mailboxes: Vec<SubstrateCommandMailbox>,
    terminated: bool,
    metrics: Option<Arc<SubstrateMetrics>>,
}

impl SimpleRuntime {
    /// Builds a runtime with the default CPP registry and an empty custom
    /// CEP registry (the reference command surface only).
    pub async fn new(spec: Spec, weight_count: usize) -> Result<Self, SubstrateError> {
        Self::with_registries(
            spec,
            weight_count,
            &CppRegistry::with_defaults(),
            Arc::new(CepRegistry::new()),
        )
        .await
    }

    /// Builds a runtime against caller-supplied CPP/CEP registries, so tests
    /// and embedders can register custom plug-ins before construction.
    pub async fn with_registries(
        spec: Spec,
        weight_count: usize,
        cpp_registry: &CppRegistry,
        cep_registry: Arc<CepRegistry>,
    ) -> Result<Self, SubstrateError> {
        let cpp = cpp_registry.resolve(&spec.cpp_name)?;
        let cep_chain = spec.cep_chain();
        let global_fanin_pids = spec.fanin_pids();
        let substrate_pid_base = Pid::new("substrate");

        let mut cells = Vec::with_capacity(weight_count);
        let mut mailboxes = Vec::with_capacity(weight_count);

        for weight_index in 0..weight_count {
            let scoped_substrate_pid = substrate_pid_base.scoped(weight_index);
            let mailbox = SubstrateCommandMailbox::spawn(scoped_substrate_pid.clone());

            let mut weight_cells = Vec::with_capacity(cep_chain.len());
            for (cep_index, cep_name) in cep_chain.iter().enumerate() {
                let base_id = Pid::new(format!("cep_{}", cep_index + 1));
                let scoped_id = base_id.scoped(weight_index);
                let fanin_pids = spec.fanin_pids_for(cep_index, cep_name);

                let actor = actor::spawn(scoped_id.clone());
                actor
                    .init(
                        scoped_substrate_pid.clone(),
                        InitPayload::Fields {
                            id: scoped_id.clone(),
                            cortex_pid: None,
                            substrate_pid: scoped_substrate_pid.clone(),
                            cep_name: cep_name.clone(),
                            params: spec.parameters.clone(),
                            fanin_pids: fanin_pids.clone(),
                        },
                    )
                    .await?;

                let mut relays = HashMap::with_capacity(fanin_pids.len());
                for pid in &fanin_pids {
                    let relay = CepFaninRelay::spawn(pid.clone(), actor.forward_sink());
                    relays.insert(pid.clone(), relay);
                }

                weight_cells.push(CepCell {
                    actor,
                    relays,
                    fanin_pids,
                    scoped_id,
                    scoped_substrate_pid: scoped_substrate_pid.clone(),
                });
            }
            cells.push(weight_cells);
            mailboxes.push(mailbox);
        }

        debug!(weights = weight_count, ceps = cep_chain.len(), "substrate runtime wired");

        Ok(Self {
            cpp,
            cep_chain,
            cep_registry,
            params: spec.parameters,
            global_fanin_pids,
            weights: vec![0.0; weight_count],
            backup: None,
            cells,
            mailboxes,
            terminated: false,
            metrics: None,
        })
    }

    /// Attaches a metrics handle; subsequent `step` calls record counters
    /// and the step-duration histogram against it.
    pub fn with_metrics(mut self, metrics: Arc<SubstrateMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn terminated(&self) -> bool {
        self.terminated
    }

    pub fn backup(&mut self) {
        self.backup = Some(self.weights.clone());
    }

    pub fn restore(&mut self) -> Result<(), SubstrateError> {
        let backup = self.backup.clone().ok_or(SubstrateError::NoSubstrateBackup)?;
        debug_assert_eq!(backup.len(), self.weights.len());
        self.weights = backup;
        Ok(())
    }

    pub fn reset(&mut self) {
        for w in self.weights.iter_mut() {
            *w = 0.0;
        }
    }

    /// Idempotent: marks the runtime terminated, terminates every actor and
    /// relay exactly once, and terminates every mailbox.
    pub async fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        for weight_cells in &self.cells {
            for cell in weight_cells {
                let _ = cell.actor.terminate_from(cell.scoped_substrate_pid.clone()).await;
                for relay in cell.relays.values() {
                    relay.terminate().await;
                }
            }
        }
        for mailbox in &self.mailboxes {
            mailbox.terminate().await;
        }
        debug!("substrate runtime terminated");
    }

    /// Runs one computation step: computes the CPP's control signal,
    /// forwards it through each weight's CEP chain, applies the resulting
    /// commands with saturation, and returns a copy of the weight vector.
    ///
    /// The first error encountered aborts the step; weight updates already
    /// applied for prior weight indices are retained (no rollback).
    pub async fn step(
        &mut self,
        inputs: &[f64],
        named_fanin: Option<&HashMap<Pid, f64>>,
    ) -> Result<Vec<f64>, SubstrateError> {
        self.step_with_cancellation(inputs, named_fanin, None).await
    }

    /// As [`step`](Self::step), but honours a cooperative cancellation token
    /// checked at entry and again after the CPP compute — the two points
    /// `spec.md` calls out as cancellation-observing.
    pub async fn step_with_cancellation(
        &mut self,
        inputs: &[f64],
        named_fanin: Option<&HashMap<Pid, f64>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<f64>, SubstrateError> {
        if self.terminated {
            return Err(SubstrateError::SubstrateRuntimeTerminated);
        }
        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(SubstrateError::Cancelled);
        }

        let started_at = Instant::now();
        let result = self.step_inner(inputs, named_fanin, cancel).await;
        if let Some(metrics) = &self.metrics {
            metrics.step_duration_seconds.observe(started_at.elapsed().as_secs_f64());
            if result.is_err() {
                metrics.step_errors_total.inc();
            }
        }
        result
    }

    async fn step_inner(
        &mut self,
        inputs: &[f64],
        named_fanin: Option<&HashMap<Pid, f64>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<f64>, SubstrateError> {
        let delta = self.cpp.compute(inputs, &self.params);
        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(SubstrateError::Cancelled);
        }
        let signal = self.resolve_control_signal(inputs, delta, named_fanin);
        let cep_names = self.cep_chain.clone();

        for weight_index in 0..self.weights.len() {
            let mut next = self.weights[weight_index];
            for cep_index in 0..cep_names.len() {
                let cep_name = &cep_names[cep_index];
                let cell = &mut self.cells[weight_index][cep_index];
                let outcome = forward_cell(cell, &signal).await?;

                next = match outcome {
                    CepStepOutcome::NoCommand => next,
                    CepStepOutcome::EscapeHatch => {
                        let cep = self.cep_registry.resolve(cep_name)?;
                        cep.apply(next, delta, &self.params)
                    }
                    CepStepOutcome::Command(command) => {
                        if command.from_pid != cell.scoped_id {
                            return Err(SubstrateError::UnexpectedCepCommandSender {
                                expected: cell.scoped_id.clone(),
                                got: command.from_pid,
                            });
                        }
                        if command.to_pid != cell.scoped_substrate_pid {
                            return Err(SubstrateError::UnexpectedCepCommandTarget {
                                expected: cell.scoped_substrate_pid.clone(),
                                got: command.to_pid,
                            });
                        }
                        if let Some(metrics) = &self.metrics {
                            metrics.observe_command_emitted(command.kind.as_str());
                        }

                        let mailbox = &mut self.mailboxes[weight_index];
                        mailbox.post(command)?;
                        let sync_id = mailbox.post_sync();
                        mailbox.await_sync(sync_id).await?;
                        if let Some(metrics) = &self.metrics {
                            metrics.sync_barriers_total.inc();
                        }
                        let drained = mailbox.drain().await?;

                        let mut folded = next;
                        for queued in &drained {
                            folded = apply_cep_command(folded, queued, &self.params)?;
                            if let Some(metrics) = &self.metrics {
                                metrics.observe_command_applied(queued.kind.as_str());
                            }
                        }
                        folded
                    }
                };
            }
            self.weights[weight_index] = next;
        }

        Ok(self.weights.clone())
    }

    /// Computes the control-signal vector used for CEP fan-in, keyed by
    /// fan-in pid, always including the CPP's own scalar output under the
    /// synthetic `"cpp"` pid.
    fn resolve_control_signal(
        &self,
        inputs: &[f64],
        delta: f64,
        named_fanin: Option<&HashMap<Pid, f64>>,
    ) -> HashMap<Pid, f64> {
        let mut map = HashMap::new();
        map.insert(Pid::new("cpp"), delta);

        if let Some(named) = named_fanin {
            if self.global_fanin_pids.iter().all(|pid| named.contains_key(pid)) {
                for pid in &self.global_fanin_pids {
                    map.insert(pid.clone(), named[pid]);
                }
                return map;
            }
        }

        if let Some(vector) = self.cpp.compute_vector(inputs, &self.params) {
            if !vector.is_empty() {
                for (pid, value) in self.global_fanin_pids.iter().zip(vector) {
                    map.insert(pid.clone(), value);
                }
                return map;
            }
        }

        let all_abcn = !self.cep_chain.is_empty()
            && self.cep_chain.iter().all(|name| name == "set_abcn");
        if all_abcn && inputs.len() == self.global_fanin_pids.len() && self.global_fanin_pids.len() > 1
        {
            for (pid, value) in self.global_fanin_pids.iter().zip(inputs) {
                map.insert(pid.clone(), *value);
            }
        }

        map
    }
}

/// Forwards one step's projected fan-in values into a cell's relays, waits
/// for the actor to settle via a sync barrier, and reads back whatever
/// outcome is ready.
async fn forward_cell(
    cell: &mut CepCell,
    signal: &HashMap<Pid, f64>,
) -> Result<CepStepOutcome, SubstrateError> {
    for pid in &cell.fanin_pids {
        let value = signal.get(pid).copied().ok_or_else(|| {
            SubstrateError::InvalidCepOutputWidth {
                cep_name: cell.scoped_id.to_string(),
                expected: "fan-in value for every configured pid",
                got: 0,
            }
        })?;
        let relay = cell
            .relays
            .get(pid)
            .ok_or_else(|| SubstrateError::MissingCepFaninRelay { pid: pid.clone() })?;
        relay.post(value).await?;
    }

    let sync_id = cell.actor.post_sync();
    cell.actor.await_sync(sync_id).await?;

    if let Some(err) = cell.actor.next_error() {
        return match err {
            SubstrateError::UnsupportedCepCommand { .. } => Ok(CepStepOutcome::EscapeHatch),
            other => Err(other),
        };
    }

    Ok(match cell.actor.next_command() {
        Some(command) => CepStepOutcome::Command(command),
        None => CepStepOutcome::NoCommand,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(cpp_name: &str, cep_name: &str, params: Parameters) -> Spec {
        Spec {
            cpp_name: cpp_name.to_string(),
            cep_name: Some(cep_name.to_string()),
            parameters: params,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn s1_scalar_iterative_accumulation() {
        let params = Parameters::new().with("scale", 0.5);
        let mut runtime = SimpleRuntime::new(spec("set_weight", "delta_weight", params), 3)
            .await
            .unwrap();

        let weights = runtime.step(&[1.0, 3.0], None).await.unwrap();
        assert_eq!(weights, vec![0.5, 0.5, 0.5]);

        let weights = runtime.step(&[2.0, 2.0], None).await.unwrap();
        assert_eq!(weights, vec![1.0, 1.0, 1.0]);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_step_before_any_weight_moves() {
        let mut runtime = SimpleRuntime::new(spec("set_weight", "delta_weight", Parameters::new()), 1)
            .await
            .unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let err = runtime
            .step_with_cancellation(&[1.0], None, Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, SubstrateError::Cancelled));
        assert_eq!(runtime.weights(), vec![0.0].as_slice());
    }

    #[tokio::test]
    async fn s2_set_weight_is_idempotent() {
        let mut runtime = SimpleRuntime::new(spec("set_weight", "set_weight", Parameters::new()), 1)
            .await
            .unwrap();

        assert_eq!(runtime.step(&[1.0], None).await.unwrap(), vec![1.0]);
        assert_eq!(runtime.step(&[1.0], None).await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn s3_saturates_at_reference_limit() {
        let params = Parameters::new().with("scale", 10.0);
        let mut runtime = SimpleRuntime::new(spec("set_weight", "delta_weight", params), 1)
            .await
            .unwrap();

        assert_eq!(runtime.step(&[1.0], None).await.unwrap(), vec![crate::kernels::WEIGHT_LIMIT]);
        assert_eq!(runtime.step(&[1.0], None).await.unwrap(), vec![crate::kernels::WEIGHT_LIMIT]);
    }

    #[tokio::test]
    async fn s4_abcn_with_explicit_coefficients() {
        let params = Parameters::new()
            .with("a", 0.2)
            .with("b", 0.5)
            .with("c", -0.1)
            .with("n", 0.8);
        let mut runtime = SimpleRuntime::new(spec("set_weight", "set_abcn", params), 1)
            .await
            .unwrap();

        let first = runtime.step(&[1.0], None).await.unwrap();
        assert!((first[0] - 0.4).abs() < 1e-9);
        let second = runtime.step(&[1.0], None).await.unwrap();
        assert!((second[0] - 0.832).abs() < 1e-9);
    }

    #[tokio::test]
    async fn s6_per_weight_command_isolation() {
        let mut runtime =
            SimpleRuntime::new(spec("set_weight", "delta_weight", Parameters::new()), 2)
                .await
                .unwrap();
        let weights = runtime.step(&[1.0], None).await.unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(runtime.cells[0][0].scoped_id, Pid::new("cep_1_w1"));
        assert_eq!(runtime.cells[1][0].scoped_id, Pid::new("cep_1_w2"));
        assert_eq!(
            runtime.cells[0][0].scoped_substrate_pid,
            Pid::new("substrate_w1")
        );
        assert_eq!(
            runtime.cells[1][0].scoped_substrate_pid,
            Pid::new("substrate_w2")
        );
    }

    #[tokio::test]
    async fn backup_restore_round_trip() {
        let mut runtime =
            SimpleRuntime::new(spec("set_weight", "delta_weight", Parameters::new()), 1)
                .await
                .unwrap();
        runtime.step(&[1.0], None).await.unwrap();
        runtime.backup();
        let after_first = runtime.weights().to_vec();

        runtime.step(&[0.9], None).await.unwrap();
        runtime.step(&[0.9], None).await.unwrap();
        runtime.restore().unwrap();

        assert_eq!(runtime.weights(), after_first.as_slice());
    }

    #[tokio::test]
    async fn restore_without_backup_errors() {
        let mut runtime =
            SimpleRuntime::new(spec("set_weight", "delta_weight", Parameters::new()), 1)
                .await
                .unwrap();
        let err = runtime.restore().unwrap_err();
        assert!(matches!(err, SubstrateError::NoSubstrateBackup));
    }

    #[tokio::test]
    async fn terminate_is_idempotent_and_blocks_further_steps() {
        let mut runtime =
            SimpleRuntime::new(spec("set_weight", "delta_weight", Parameters::new()), 1)
                .await
                .unwrap();
        runtime.terminate().await;
        runtime.terminate().await;
        let err = runtime.step(&[1.0], None).await.unwrap_err();
        assert!(matches!(err, SubstrateError::SubstrateRuntimeTerminated));
    }

    #[tokio::test]
    async fn custom_cep_escape_hatch_is_used_for_unknown_names() {
        struct DoubleCep;
        impl Cep for DoubleCep {
            fn name(&self) -> &str {
                "double"
            }
            fn apply(&self, current: f64, delta: f64, _params: &Parameters) -> f64 {
                current + delta * 2.0
            }
        }

        let cep_registry = Arc::new(CepRegistry::new());
        cep_registry.register(Arc::new(DoubleCep)).unwrap();

        let mut runtime = SimpleRuntime::with_registries(
            spec("set_weight", "double", Parameters::new()),
            1,
            &CppRegistry::with_defaults(),
            cep_registry,
        )
        .await
        .unwrap();

        let weights = runtime.step(&[2.0], None).await.unwrap();
        assert_eq!(weights, vec![4.0]);
    }
}
