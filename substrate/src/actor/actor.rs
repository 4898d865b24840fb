//! The `CepActor` message loop: a single long-lived task wrapping one
//! `CepProcess`.

use super::ingress::{ActorMessage, CepActorHandle, InitPayload, Reply};
use crate::process::{CepOutcome, CepProcess, ProcessMessage};
use protogonos_types::{CepCommand, Pid, SubstrateError};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Spawns a `CepActor` and returns the handle the runtime uses to drive it.
/// The process itself isn't constructed until the first successful `Init`.
pub fn spawn(name: Pid) -> CepActorHandle {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let (errbox_tx, errbox_rx) = mpsc::unbounded_channel();
    let (syncbox_tx, syncbox_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = watch::channel(false);

    tokio::spawn(run(name, inbox_rx, outbox_tx, errbox_tx, syncbox_tx, done_tx));

    CepActorHandle::new(inbox_tx, outbox_rx, errbox_rx, syncbox_rx, done_rx)
}

struct Loop {
    name: Pid,
    initialised: bool,
    process: Option<CepProcess>,
    init_owner_pid: Option<Pid>,
    pending: Vec<ActorMessage>,
    outbox: mpsc::UnboundedSender<CepCommand>,
    errbox: mpsc::UnboundedSender<SubstrateError>,
}

fn respond<T>(reply: Option<Reply<T>>, result: Result<T, SubstrateError>) {
    if let Some(tx) = reply {
        let _ = tx.send(result);
    }
}

impl Loop {
    fn terminated(&self) -> bool {
        self.process.as_ref().map(|p| p.terminated()).unwrap_or(false)
    }

    fn dispatch(&mut self, message: ActorMessage) {
        match message {
            ActorMessage::Init {
                from_pid,
                payload,
                reply,
            } => self.handle_init(from_pid, payload, reply),
            ActorMessage::Forward {
                from_pid,
                input,
                reply,
            } => self.handle_forward(from_pid, input, reply),
            ActorMessage::Terminate { from_pid, reply } => self.handle_terminate(from_pid, reply),
            ActorMessage::Sync { .. } => {
                unreachable!("Sync is drained before reaching dispatch")
            }
        }
    }

    fn handle_init(&mut self, from_pid: Pid, payload: InitPayload, reply: Option<Reply<()>>) {
        if self.initialised {
            respond(reply, Err(SubstrateError::CepActorAlreadyInitialised));
            return;
        }
        if let Some(owner) = &self.init_owner_pid {
            if *owner != from_pid {
                if reply.is_some() {
                    respond(
                        reply,
                        Err(SubstrateError::UnexpectedCepInitSender { from: from_pid }),
                    );
                }
                // Asynchronous post from the wrong sender: silently dropped.
                return;
            }
        }
        let process = match payload {
            InitPayload::Process(process) => *process,
            InitPayload::Fields {
                id,
                cortex_pid,
                substrate_pid,
                cep_name,
                params,
                fanin_pids,
            } => CepProcess::new(
                id,
                Some(from_pid.clone()),
                cortex_pid,
                substrate_pid,
                cep_name,
                params,
                fanin_pids,
            ),
        };
        debug!(actor = %self.name, owner = %from_pid, "cep actor initialised");
        self.init_owner_pid = Some(from_pid);
        self.process = Some(process);
        self.initialised = true;
        respond(reply, Ok(()));
        self.drain_pending();
    }

    fn handle_forward(&mut self, from_pid: Pid, input: f64, reply: Option<Reply<CepOutcome>>) {
        if !self.initialised {
            if reply.is_some() {
                respond(reply, Err(SubstrateError::CepActorUninitialised));
            } else {
                self.pending.push(ActorMessage::Forward {
                    from_pid,
                    input,
                    reply,
                });
            }
            return;
        }
        let outcome = self
            .process
            .as_mut()
            .expect("initialised")
            .handle(ProcessMessage::Forward { from_pid, input });
        self.route_outcome(&outcome);
        respond(reply, outcome);
    }

    fn handle_terminate(&mut self, from_pid: Pid, reply: Option<Reply<()>>) {
        if !self.initialised {
            if reply.is_some() {
                respond(reply, Err(SubstrateError::CepActorUninitialised));
            } else {
                self.pending.push(ActorMessage::Terminate { from_pid, reply });
            }
            return;
        }
        let process = self.process.as_mut().expect("initialised");
        let was_terminated = process.terminated();
        let _ = process.handle(ProcessMessage::Terminate { from_pid: from_pid.clone() });
        if !was_terminated && process.terminated() {
            debug!(actor = %self.name, "cep actor terminated");
        }
        respond(reply, Ok(()));
    }

    fn route_outcome(&self, outcome: &Result<CepOutcome, SubstrateError>) {
        match outcome {
            Ok(ready) => {
                if let Some(command) = &ready.command {
                    let _ = self.outbox.send(command.clone());
                }
            }
            Err(err) => {
                let _ = self.errbox.send(err.clone());
            }
        }
    }

    fn drain_pending(&mut self) {
        for message in std::mem::take(&mut self.pending) {
            self.dispatch(message);
        }
    }
}

async fn run(
    name: Pid,
    mut inbox: mpsc::UnboundedReceiver<ActorMessage>,
    outbox: mpsc::UnboundedSender<CepCommand>,
    errbox: mpsc::UnboundedSender<SubstrateError>,
    syncbox: mpsc::UnboundedSender<u64>,
    done: watch::Sender<bool>,
) {
    let mut state = Loop {
        name: name.clone(),
        initialised: false,
        process: None,
        init_owner_pid: None,
        pending: Vec::new(),
        outbox,
        errbox,
    };

    while let Some(message) = inbox.recv().await {
        if let ActorMessage::Sync { sync_id } = message {
            let _ = syncbox.send(sync_id);
            continue;
        }
        state.dispatch(message);
        if state.terminated() {
            break;
        }
    }

    debug!(actor = %name, "cep actor loop exiting");
    let _ = done.send(true);
}
