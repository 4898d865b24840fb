//! `SubstrateCommandMailbox`: the per-weight FIFO sink that accepts
//! validated commands, supports sync barriers, and drains in post order.

use protogonos_types::{CepCommand, Pid, SubstrateError};
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

enum MailboxMessage {
    Post { command: CepCommand },
    Sync { sync_id: u64 },
    Drain { reply: oneshot::Sender<Vec<CepCommand>> },
    Terminate { reply: oneshot::Sender<()> },
}

pub struct SubstrateCommandMailbox {
    id: Pid,
    inbox: mpsc::UnboundedSender<MailboxMessage>,
    syncbox: mpsc::UnboundedReceiver<u64>,
    done: watch::Receiver<bool>,
    next_sync_id: u64,
    pending_syncs: HashSet<u64>,
}

impl SubstrateCommandMailbox {
    pub fn spawn(id: Pid) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (syncbox_tx, syncbox_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = watch::channel(false);
        tokio::spawn(run(id.clone(), inbox_rx, syncbox_tx, done_tx));
        Self {
            id,
            inbox: inbox_tx,
            syncbox: syncbox_rx,
            done: done_rx,
            next_sync_id: 0,
            pending_syncs: HashSet::new(),
        }
    }

    pub fn id(&self) -> &Pid {
        &self.id
    }

    /// Accepts a command addressed to this mailbox. Rejects anything whose
    /// `to_pid` doesn't match — the one piece of validation the mailbox
    /// itself enforces, on top of the envelope checks the runtime performs
    /// before calling this.
    pub fn post(&self, command: CepCommand) -> Result<(), SubstrateError> {
        if *self.done.borrow() {
            return Err(SubstrateError::SubstrateMailboxTerminated);
        }
        if command.to_pid != self.id {
            return Err(SubstrateError::UnexpectedCepCommandTarget {
                expected: self.id.clone(),
                got: command.to_pid.clone(),
            });
        }
        self.inbox
            .send(MailboxMessage::Post { command })
            .map_err(|_| SubstrateError::SubstrateMailboxTerminated)
    }

    pub fn post_sync(&mut self) -> u64 {
        let id = self.next_sync_id;
        self.next_sync_id += 1;
        let _ = self.inbox.send(MailboxMessage::Sync { sync_id: id });
        id
    }

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
                None => return Err(SubstrateError::SubstrateMailboxTerminated),
            }
        }
    }

    /// Returns every queued command, in post order, and empties the queue.
    pub async fn drain(&self) -> Result<Vec<CepCommand>, SubstrateError> {
        if *self.done.borrow() {
            return Err(SubstrateError::SubstrateMailboxTerminated);
        }
        let (reply, rx) = oneshot::channel();
        self.inbox
            .send(MailboxMessage::Drain { reply })
            .map_err(|_| SubstrateError::SubstrateMailboxTerminated)?;
        rx.await.map_err(|_| SubstrateError::SubstrateMailboxTerminated)
    }

    /// Terminates the mailbox. Does not flush queued commands first — per
    /// the chosen contract, after `terminate` no further work is observable.
    pub async fn terminate(&self) {
        if *self.done.borrow() {
            return;
        }
        let (reply, rx) = oneshot::channel();
        if self
            .inbox
            .send(MailboxMessage::Terminate { reply })
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
    id: Pid,
    mut inbox: mpsc::UnboundedReceiver<MailboxMessage>,
    syncbox: mpsc::UnboundedSender<u64>,
    done: watch::Sender<bool>,
) {
    let mut queue: Vec<CepCommand> = Vec::new();
    while let Some(message) = inbox.recv().await {
        match message {
            MailboxMessage::Post { command } => queue.push(command),
            MailboxMessage::Sync { sync_id } => {
                let _ = syncbox.send(sync_id);
            }
            MailboxMessage::Drain { reply } => {
                let _ = reply.send(std::mem::take(&mut queue));
            }
            MailboxMessage::Terminate { reply } => {
                let _ = reply.send(());
                break;
            }
        }
    }
    debug!(mailbox = %id, "substrate mailbox loop exiting");
    let _ = done.send(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use protogonos_types::CepCommandKind;

    fn command(to: &str) -> CepCommand {
        CepCommand {
            from_pid: Pid::new("p"),
            to_pid: Pid::new(to),
            kind: CepCommandKind::SetWeight,
            signal: vec![1.0],
        }
    }

    #[tokio::test]
    async fn rejects_misaddressed_command() {
        let mailbox = SubstrateCommandMailbox::spawn(Pid::new("w1"));
        let err = mailbox.post(command("w2")).unwrap_err();
        assert!(matches!(err, SubstrateError::UnexpectedCepCommandTarget { .. }));
    }

    #[tokio::test]
    async fn drains_in_post_order() {
        let mut mailbox = SubstrateCommandMailbox::spawn(Pid::new("w1"));
        for _ in 0..3 {
            mailbox.post(command("w1")).unwrap();
        }
        let sync_id = mailbox.post_sync();
        mailbox.await_sync(sync_id).await.unwrap();
        let drained = mailbox.drain().await.unwrap();
        assert_eq!(drained.len(), 3);
    }

    #[tokio::test]
    async fn terminate_is_idempotent() {
        let mailbox = SubstrateCommandMailbox::spawn(Pid::new("w1"));
        mailbox.terminate().await;
        mailbox.terminate().await;
        let err = mailbox.post(command("w1")).unwrap_err();
        assert!(matches!(err, SubstrateError::SubstrateMailboxTerminated));
    }
}
