//! `CepActor`: the concurrent mailbox wrapper around a `CepProcess`.

mod actor;
mod ingress;

pub use actor::spawn;
pub use ingress::{CepActorHandle, CepForwardSink, InitPayload};
