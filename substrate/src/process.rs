//! `CepProcess`: the selective-receive fan-in state machine at the heart of
//! a CEP. Deliberately a plain, non-async state machine — `CepActor` is the
//! concurrency wrapper around it.

use crate::command::build_cep_command;
use protogonos_types::{CepCommand, Parameters, Pid, SubstrateError};

/// A message a `CepProcess` can handle. Mirrors the two variants a
/// `CepActor` delegates to the process once initialised.
#[derive(Clone, Debug)]
pub enum ProcessMessage {
    Forward { from_pid: Pid, input: f64 },
    Terminate { from_pid: Pid },
}

/// The result of handling one message: a command is present and `ready` is
/// `true` only when a full fan-in cycle just completed.
#[derive(Clone, Debug, Default)]
pub struct CepOutcome {
    pub command: Option<CepCommand>,
    pub ready: bool,
}

impl CepOutcome {
    fn not_ready() -> Self {
        Self::default()
    }

    fn ready(command: CepCommand) -> Self {
        Self {
            command: Some(command),
            ready: true,
        }
    }
}

/// Ordered/selective fan-in accumulation, command construction, and
/// termination gating for one CEP instance.
pub struct CepProcess {
    pub id: Pid,
    pub terminate_pid: Option<Pid>,
    pub cep_name: String,
    pub params: Parameters,
    pub fanin_pids: Vec<Pid>,
    pub cortex_pid: Option<Pid>,
    pub substrate_pid: Pid,
    accumulator: Vec<f64>,
    pending: Vec<(Pid, f64)>,
    expected_idx: usize,
    terminated: bool,
}

impl CepProcess {
    pub fn new(
        id: Pid,
        terminate_pid: Option<Pid>,
        cortex_pid: Option<Pid>,
        substrate_pid: Pid,
        cep_name: String,
        params: Parameters,
        fanin_pids: Vec<Pid>,
    ) -> Self {
        assert!(
            !fanin_pids.is_empty(),
            "cep process {id} constructed with an empty fan-in pid list"
        );
        Self {
            id,
            terminate_pid,
            cep_name,
            params,
            fanin_pids,
            cortex_pid,
            substrate_pid,
            accumulator: Vec::new(),
            pending: Vec::new(),
            expected_idx: 0,
            terminated: false,
        }
    }

    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Direct-call terminate, sender-checked against `terminate_pid`: a
    /// non-owner caller gets `UnexpectedCepTerminateSender` back rather than
    /// the silent drop the mailbox-delivered `Terminate` applies.
    pub fn terminate_from(&mut self, from_pid: Pid) -> Result<(), SubstrateError> {
        if let Some(owner) = &self.terminate_pid {
            if *owner != from_pid {
                return Err(SubstrateError::UnexpectedCepTerminateSender { from: from_pid });
            }
        }
        self.terminated = true;
        Ok(())
    }

    pub fn handle(&mut self, message: ProcessMessage) -> Result<CepOutcome, SubstrateError> {
        match message {
            ProcessMessage::Forward { from_pid, input } => self.forward(from_pid, input),
            ProcessMessage::Terminate { from_pid } => {
                self.handle_terminate(from_pid);
                Ok(CepOutcome::not_ready())
            }
        }
    }

    fn handle_terminate(&mut self, from_pid: Pid) {
        if let Some(owner) = &self.terminate_pid {
            if *owner != from_pid {
                // Selective-receive semantics: a Terminate from a non-owner
                // is silently ignored, never an error, on the mailbox path.
                return;
            }
        }
        self.terminated = true;
    }

    fn forward(&mut self, from_pid: Pid, input: f64) -> Result<CepOutcome, SubstrateError> {
        if self.terminated {
            return Err(SubstrateError::CepProcessTerminated);
        }
        if !self.fanin_pids.contains(&from_pid) {
            return Err(SubstrateError::UnexpectedCepForwardSender { from: from_pid });
        }
        self.pending.push((from_pid, input));
        loop {
            let expected = self.fanin_pids[self.expected_idx].clone();
            let Some(pos) = self.pending.iter().position(|(pid, _)| *pid == expected) else {
                return Ok(CepOutcome::not_ready());
            };
            let (_, value) = self.pending.remove(pos);
            // Prepend to restore arrival order at O(1) per message; the
            // accumulator is reversed once, on cycle completion.
            self.accumulator.insert(0, value);
            self.expected_idx += 1;

            if self.expected_idx == self.fanin_pids.len() {
                self.accumulator.reverse();
                let output = std::mem::take(&mut self.accumulator);
                self.expected_idx = 0;
                let (kind, signal) = build_cep_command(&self.cep_name, &output, &self.params)?;
                let command = CepCommand {
                    from_pid: self.id.clone(),
                    to_pid: self.substrate_pid.clone(),
                    kind,
                    signal,
                };
                return Ok(CepOutcome::ready(command));
            }
        }
    }
}
