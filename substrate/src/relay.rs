//! `CepFaninRelay`: a per-sender asynchronous feeder bound to a `CepActor`.
//!
//! A relay holds a non-owning handle into its bound actor (a clone of the
//! actor's forward sink, not the actor itself) so terminating a relay never
//! terminates the actor it feeds, and the runtime alone drives both
//! lifetimes.

use crate::actor::CepForwardSink;
use protogonos_types::{Pid, SubstrateError};
use tokio::sync::{mpsc, oneshot, watch};

enum RelayRequest {
    Post {
        input: f64,
        reply: oneshot::Sender<()>,
    },
    Terminate {
        reply: oneshot::Sender<()>,
    },
}

/// One feeder task per (weight, CEP, fan-in pid).
pub struct CepFaninRelay {
    sender_pid: Pid,
    requests: mpsc::UnboundedSender<RelayRequest>,
    done: watch::Receiver<bool>,
}

impl CepFaninRelay {
    pub fn spawn(sender_pid: Pid, sink: CepForwardSink) -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = watch::channel(false);
        tokio::spawn(run(sender_pid.clone(), sink, requests_rx, done_tx));
        Self {
            sender_pid,
            requests: requests_tx,
            done: done_rx,
        }
    }

    pub fn sender_pid(&self) -> &Pid {
        &self.sender_pid
    }

    /// Ships a `Forward{from_pid=sender_pid, input}` into the bound actor
    /// and returns once the actor has accepted it.
    pub async fn post(&self, input: f64) -> Result<(), SubstrateError> {
        if *self.done.borrow() {
            return Err(SubstrateError::CepFaninRelayTerminated);
        }
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(RelayRequest::Post { input, reply })
            .map_err(|_| SubstrateError::CepFaninRelayTerminated)?;
        rx.await.map_err(|_| SubstrateError::CepFaninRelayTerminated)
    }

    pub async fn terminate(&self) {
        if *self.done.borrow() {
            return;
        }
        let (reply, rx) = oneshot::channel();
        if self
            .requests
            .send(RelayRequest::Terminate { reply })
            .is_err()
        {
            return;
        }
        let _ = rx.await;
        let mut done = self.done.clone();
        while !*done.borrow() {
            if done.changed().await.is_err() {
                return;
            }
        }
    }
}

async fn run(
    sender_pid: Pid,
    sink: CepForwardSink,
    mut requests: mpsc::UnboundedReceiver<RelayRequest>,
    done: watch::Sender<bool>,
) {
    while let Some(request) = requests.recv().await {
        match request {
            RelayRequest::Post { input, reply } => {
                // Best-effort: if the bound actor is already gone, the
                // forward is simply dropped; the runtime discovers the
                // actor's absence through its own error/command polling.
                let _ = sink.post(sender_pid.clone(), input);
                let _ = reply.send(());
            }
            RelayRequest::Terminate { reply } => {
                let _ = reply.send(());
                break;
            }
        }
    }
    let _ = done.send(true);
}
