//! Message types and the caller-facing handle for a `CepActor`, split out
//! from the loop itself (`actor.rs`) so the message enum can be read
//! without the loop's control flow.

use crate::process::{CepOutcome, CepProcess};
use protogonos_types::{CepCommand, Parameters, Pid, SubstrateError};
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot, watch};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SubstrateError>>;

/// How to construct the `CepProcess` an `Init` message installs: either a
/// fully-built process (e.g. restored from elsewhere), or the raw fields
/// the actor assembles into one itself.
pub enum InitPayload {
    Process(Box<CepProcess>),
    Fields {
        id: Pid,
        cortex_pid: Option<Pid>,
        substrate_pid: Pid,
        cep_name: String,
        params: Parameters,
        fanin_pids: Vec<Pid>,
    },
}

/// Internal wire format for the actor's single inbox. `reply` distinguishes
/// a synchronous `Call` (replied to inline) from an asynchronous `post`
/// (outcome delivered via outbox/errbox instead, or dropped for `Init`).
pub(crate) enum ActorMessage {
    Init {
        from_pid: Pid,
        payload: InitPayload,
        reply: Option<Reply<()>>,
    },
    Forward {
        from_pid: Pid,
        input: f64,
        reply: Option<Reply<CepOutcome>>,
    },
    Terminate {
        from_pid: Pid,
        reply: Option<Reply<()>>,
    },
    Sync {
        sync_id: u64,
    },
}

/// Caller-facing handle to a spawned `CepActor`. Not `Clone`: the runtime
/// exclusively owns its actors and is the sole reader of the outbox/errbox/
/// syncbox, per the ownership model.
pub struct CepActorHandle {
    inbox: mpsc::UnboundedSender<ActorMessage>,
    outbox: mpsc::UnboundedReceiver<CepCommand>,
    errbox: mpsc::UnboundedReceiver<SubstrateError>,
    syncbox: mpsc::UnboundedReceiver<u64>,
    done: watch::Receiver<bool>,
    next_sync_id: u64,
    pending_syncs: HashSet<u64>,
}

impl CepActorHandle {
    pub(crate) fn new(
        inbox: mpsc::UnboundedSender<ActorMessage>,
        outbox: mpsc::UnboundedReceiver<CepCommand>,
        errbox: mpsc::UnboundedReceiver<SubstrateError>,
        syncbox: mpsc::UnboundedReceiver<u64>,
        done: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inbox,
            outbox,
            errbox,
            syncbox,
            done,
            next_sync_id: 0,
            pending_syncs: HashSet::new(),
        }
    }

    /// Synchronous `Call`: initialises the process and waits for the
    /// actor's acknowledgement.
    pub async fn init(&self, from_pid: Pid, payload: InitPayload) -> Result<(), SubstrateError> {
        let (reply, rx) = oneshot::channel();
        self.send(ActorMessage::Init {
            from_pid,
            payload,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| SubstrateError::CepActorTerminated)?
    }

    /// Synchronous `Call`: forwards one fan-in input and waits for the
    /// process's outcome. Used directly by tests and by callers that don't
    /// go through a `CepFaninRelay`.
    pub async fn forward_call(
        &self,
        from_pid: Pid,
        input: f64,
    ) -> Result<CepOutcome, SubstrateError> {
        let (reply, rx) = oneshot::channel();
        self.send(ActorMessage::Forward {
            from_pid,
            input,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| SubstrateError::CepActorTerminated)?
    }

    /// Asynchronous post: returns once the actor has accepted the message.
    /// The outcome (ready command, or error) is delivered via
    /// [`next_command`](Self::next_command)/[`next_error`](Self::next_error).
    /// This is what `CepFaninRelay::post` calls.
    pub fn forward_post(&self, from_pid: Pid, input: f64) -> Result<(), SubstrateError> {
        self.send(ActorMessage::Forward {
            from_pid,
            input,
            reply: None,
        })
    }

    /// Synchronous `Call`: terminates the process (if `from_pid` is the
    /// owning pid) and waits for the actor loop to fully exit. Idempotent:
    /// calling twice never blocks and never errors the second time.
    pub async fn terminate_from(&self, from_pid: Pid) -> Result<(), SubstrateError> {
        if *self.done.borrow() {
            return Ok(());
        }
        let (reply, rx) = oneshot::channel();
        if self
            .send(ActorMessage::Terminate {
                from_pid,
                reply: Some(reply),
            })
            .is_err()
        {
            return Ok(()); // loop already gone: terminate is idempotent
        }
        if let Ok(result) = rx.await {
            result?;
        }
        self.wait_done().await;
        Ok(())
    }

    async fn wait_done(&self) {
        let mut done = self.done.clone();
        while !*done.borrow() {
            if done.changed().await.is_err() {
                return;
            }
        }
    }

    /// Allocates the next sync id and posts the barrier marker into the
    /// inbox, in FIFO order with every message posted before it.
    pub fn post_sync(&mut self) -> u64 {
        let id = self.next_sync_id;
        self.next_sync_id += 1;
        let _ = self.send(ActorMessage::Sync { sync_id: id });
        id
    }

    /// Blocks until the barrier for `sync_id` has drained, proving every
    /// message posted before the matching `post_sync` call has been
    /// processed. Sync ids observed out of order are remembered so a later
    /// `await_sync` for them resolves immediately.
    pub async fn await_sync(&mut self, sync_id: u64) -> Result<(), SubstrateError> {
        if self.pending_syncs.remove(&sync_id) {
            return Ok(());
        }
        loop {
            match self.syncbox.recv().await {
                Some(id) if id == sync_id => return Ok(()),
                Some(id) => {
                    self.pending_syncs.insert(id);
                }
                None => return Err(SubstrateError::CepActorTerminated),
            }
        }
    }

    /// Non-blocking peek. Returns `None` (the "no command ready" sentinel)
    /// rather than erroring when the outbox is currently empty.
    pub fn next_command(&mut self) -> Option<CepCommand> {
        self.outbox.try_recv().ok()
    }

    /// Non-blocking peek. Returns `None` (the "no error ready" sentinel)
    /// rather than erroring when the errbox is currently empty.
    pub fn next_error(&mut self) -> Option<SubstrateError> {
        self.errbox.try_recv().ok()
    }

    fn send(&self, message: ActorMessage) -> Result<(), SubstrateError> {
        self.inbox
            .send(message)
            .map_err(|_| SubstrateError::CepActorTerminated)
    }

    /// A clonable, non-owning handle that can only post `Forward` messages.
    /// This is what a `CepFaninRelay` holds onto instead of the full handle.
    pub fn forward_sink(&self) -> CepForwardSink {
        CepForwardSink {
            inbox: self.inbox.clone(),
        }
    }
}

/// A restricted, `Clone`-able view of a `CepActorHandle` that can only post
/// `Forward` messages. Held by a `CepFaninRelay`.
#[derive(Clone)]
pub struct CepForwardSink {
    inbox: mpsc::UnboundedSender<ActorMessage>,
}

impl CepForwardSink {
    pub fn post(&self, from_pid: Pid, input: f64) -> Result<(), SubstrateError> {
        self.inbox
            .send(ActorMessage::Forward {
                from_pid,
                input,
                reply: None,
            })
            .map_err(|_| SubstrateError::CepActorTerminated)
    }
}
